//! Grouping of active stories by author for the story tray.
//!
//! Input rows arrive most-recent-first; groups therefore come out ordered
//! by each author's latest story. The actor's own group is always moved
//! to the front, and stories within a group are presented oldest-first
//! (viewing order).

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::posts::handlers::AuthorView;
use crate::stories::db::StoryRow;

#[derive(Debug, Clone, Serialize)]
pub struct StoryView {
    pub id: Uuid,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_viewed: bool,
    pub viewers_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryGroup {
    pub user: AuthorView,
    pub stories: Vec<StoryView>,
    pub has_unviewed: bool,
}

/// Group stories by author, actor's group first, others by most recent
/// story descending.
pub fn group_by_author(rows: Vec<StoryRow>, actor: Uuid) -> Vec<StoryGroup> {
    let mut groups: Vec<StoryGroup> = Vec::new();

    for row in rows {
        let story = StoryView {
            id: row.id,
            image: row.image,
            created_at: row.created_at,
            expires_at: row.expires_at,
            is_viewed: row.is_viewed,
            viewers_count: row.viewers_count,
        };

        match groups.iter_mut().find(|g| g.user.id == row.user_id) {
            Some(group) => {
                group.has_unviewed |= !story.is_viewed;
                group.stories.push(story);
            }
            None => groups.push(StoryGroup {
                user: AuthorView {
                    id: row.user_id,
                    username: row.author_username,
                    name: row.author_name,
                    avatar: row.author_avatar,
                    verified: row.author_verified,
                },
                has_unviewed: !story.is_viewed,
                stories: vec![story],
            }),
        }
    }

    // Rows were newest-first; flip each group into viewing order.
    for group in &mut groups {
        group.stories.reverse();
    }

    if let Some(own) = groups.iter().position(|g| g.user.id == actor) {
        if own > 0 {
            let group = groups.remove(own);
            groups.insert(0, group);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn row(user: Uuid, username: &str, age_minutes: i64, viewed: bool) -> StoryRow {
        let created = Utc::now() - Duration::minutes(age_minutes);
        StoryRow {
            id: Uuid::new_v4(),
            user_id: user,
            image: "/uploads/s.jpg".into(),
            created_at: created,
            expires_at: created + Duration::hours(24),
            author_username: username.into(),
            author_name: username.into(),
            author_avatar: String::new(),
            author_verified: false,
            viewers_count: 0,
            is_viewed: viewed,
        }
    }

    /// Newest-first, matching what the query produces.
    fn sorted(mut rows: Vec<StoryRow>) -> Vec<StoryRow> {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    #[test]
    fn groups_ordered_by_latest_story() {
        let (actor, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = sorted(vec![
            row(a, "ada", 90, true),
            row(b, "bob", 10, true),
            row(a, "ada", 60, true),
        ]);

        let groups = group_by_author(rows, actor);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].user.username, "bob");
        assert_eq!(groups[1].user.username, "ada");
        assert_eq!(groups[1].stories.len(), 2);
    }

    #[test]
    fn actor_group_always_first_despite_recency() {
        let (actor, other) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = sorted(vec![
            row(other, "bob", 5, false),
            row(actor, "me", 300, true),
        ]);

        let groups = group_by_author(rows, actor);

        assert_eq!(groups[0].user.id, actor);
        assert_eq!(groups[1].user.username, "bob");
    }

    #[test]
    fn has_unviewed_set_when_any_story_unseen() {
        let (actor, a) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = sorted(vec![row(a, "ada", 60, true), row(a, "ada", 30, false)]);

        let groups = group_by_author(rows, actor);

        assert_eq!(groups.len(), 1);
        assert!(groups[0].has_unviewed);
    }

    #[test]
    fn fully_viewed_group_has_no_unviewed_flag() {
        let (actor, a) = (Uuid::new_v4(), Uuid::new_v4());
        let groups = group_by_author(sorted(vec![row(a, "ada", 10, true)]), actor);
        assert!(!groups[0].has_unviewed);
    }

    #[test]
    fn stories_within_group_in_viewing_order() {
        let (actor, a) = (Uuid::new_v4(), Uuid::new_v4());
        let old = row(a, "ada", 120, true);
        let new = row(a, "ada", 10, false);
        let old_id = old.id;
        let new_id = new.id;

        let groups = group_by_author(sorted(vec![new, old]), actor);

        assert_eq!(groups[0].stories[0].id, old_id);
        assert_eq!(groups[0].stories[1].id, new_id);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_author(Vec::new(), Uuid::new_v4()).is_empty());
    }
}
