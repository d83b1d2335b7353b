//! Integration tests against a live Postgres.
//!
//! These are ignored by default so the suite runs without infrastructure;
//! point `DATABASE_URL` at a disposable database and run
//! `cargo test -- --ignored` to exercise them. Rows are created under
//! random identities, so repeated runs do not collide.

use sqlx::PgPool;
use uuid::Uuid;

use photogram::posts::db as posts_db;
use photogram::stories::db as stories_db;
use photogram::users::db as users_db;

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for these tests");
    let pool = PgPool::connect(&url).await.expect("connect to test database");
    sqlx::migrate!().run(&pool).await.expect("run migrations");
    pool
}

async fn make_user(pool: &PgPool) -> Uuid {
    let tag = Uuid::new_v4().simple().to_string();
    let username = format!("t{}", &tag[..20]);
    let user = users_db::create_user(
        pool,
        &username,
        &format!("{username}@example.test"),
        "not-a-real-hash",
        "Test User",
        "https://i.pravatar.cc/150",
    )
    .await
    .expect("create user");
    user.id
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn toggle_like_is_its_own_inverse() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let liker = make_user(&pool).await;
    let post_id = posts_db::create_post(&pool, author, "/uploads/p.jpg", "hello", "")
        .await
        .expect("create post");

    let (liked, count) = posts_db::toggle_like(&pool, post_id, liker).await.unwrap();
    assert!(liked);
    assert_eq!(count, 1);

    let (liked, count) = posts_db::toggle_like(&pool, post_id, liker).await.unwrap();
    assert!(!liked);
    assert_eq!(count, 0);

    // The flag a later read reports comes from the same set.
    let row = posts_db::find_post(&pool, post_id, Some(liker))
        .await
        .unwrap()
        .expect("post exists");
    assert!(!row.is_liked);
    assert_eq!(row.likes_count, 0);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn double_follow_conflicts_and_unfollow_is_idempotent() {
    let pool = test_pool().await;
    let follower = make_user(&pool).await;
    let followed = make_user(&pool).await;

    assert!(users_db::follow(&pool, follower, followed).await.unwrap());
    assert!(!users_db::follow(&pool, follower, followed).await.unwrap());

    let counts = users_db::follow_counts(&pool, followed).await.unwrap();
    assert_eq!(counts.followers, 1);

    users_db::unfollow(&pool, follower, followed).await.unwrap();
    users_db::unfollow(&pool, follower, followed).await.unwrap();

    let counts = users_db::follow_counts(&pool, followed).await.unwrap();
    assert_eq!(counts.followers, 0);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn deleting_a_post_removes_every_comment() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let commenter = make_user(&pool).await;
    let post_id = posts_db::create_post(&pool, author, "/uploads/p.jpg", "", "")
        .await
        .expect("create post");

    for text in ["one", "two", "three"] {
        posts_db::insert_comment(&pool, commenter, post_id, text)
            .await
            .expect("insert comment");
    }
    assert_eq!(
        posts_db::comments_for_post(&pool, post_id).await.unwrap().len(),
        3
    );

    posts_db::delete_post(&pool, post_id).await.unwrap();

    assert!(posts_db::find_post(&pool, post_id, None).await.unwrap().is_none());
    let remaining =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn expired_story_is_invisible_before_the_sweep() {
    let pool = test_pool().await;
    let author = make_user(&pool).await;
    let story_id = stories_db::create_story(&pool, author, "/uploads/s.jpg")
        .await
        .expect("create story");

    assert!(stories_db::find_active(&pool, story_id, author)
        .await
        .unwrap()
        .is_some());

    // Age the story past its lifetime without sweeping.
    sqlx::query("UPDATE stories SET expires_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(story_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(stories_db::find_active(&pool, story_id, author)
        .await
        .unwrap()
        .is_none());
    let active = stories_db::active_for_actor(&pool, author).await.unwrap();
    assert!(active.iter().all(|s| s.id != story_id));

    // The sweep physically removes it.
    stories_db::delete_expired(&pool).await.unwrap();
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stories WHERE id = $1")
        .bind(story_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(exists, 0);
}
