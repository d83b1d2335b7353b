//! HTTP route wiring.

mod router;

pub use router::create_router;
