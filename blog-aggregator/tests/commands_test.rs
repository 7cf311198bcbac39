mod common;

use blog_aggregator::commands::{self, Session};
use blog_aggregator::{Config, NewPost};
use chrono::{TimeZone, Utc};
use common::*;
use std::env;
use std::time::Duration;
use uuid::Uuid;

fn temp_config() -> Config {
    let path = env::temp_dir().join(format!("gatorconfig-{}.json", Uuid::new_v4()));
    Config::new("postgres://localhost/gator", path)
}

async fn logged_in(store: &MemoryFeedStore, name: &str) -> (Config, Session) {
    let mut config = temp_config();
    commands::register(store, &mut config, name).await.unwrap();
    let session = Session::resolve(store, &config).await.unwrap();
    (config, session)
}

#[tokio::test]
async fn register_sets_current_user_and_rejects_duplicates() {
    init_tracing();
    let store = MemoryFeedStore::new();
    let mut config = temp_config();

    let user = commands::register(&store, &mut config, "kahya").await.unwrap();
    assert_eq!(config.current_user_name.as_deref(), Some("kahya"));
    assert_eq!(Config::read_from(config.path()).unwrap().current_user_name.as_deref(), Some("kahya"));

    let err = commands::register(&store, &mut config, "kahya").await.unwrap_err();
    assert!(matches!(err, AggregatorError::DuplicateUser { .. }));

    let session = Session::resolve(&store, &config).await.unwrap();
    assert_eq!(session.user, user);

    std::fs::remove_file(config.path()).ok();
}

#[tokio::test]
async fn session_requires_known_logged_in_user() {
    let store = MemoryFeedStore::new();
    let mut config = temp_config();

    let err = Session::resolve(&store, &config).await.unwrap_err();
    assert!(matches!(err, AggregatorError::NotLoggedIn));

    config.current_user_name = Some("ghost".to_string());
    let err = Session::resolve(&store, &config).await.unwrap_err();
    assert!(matches!(err, AggregatorError::UserNotFound { .. }));

    let err = commands::login(&store, &mut config, "ghost").await.unwrap_err();
    assert!(matches!(err, AggregatorError::UserNotFound { .. }));
}

#[tokio::test]
async fn add_feed_follows_it_and_duplicates_are_rejected() {
    let store = MemoryFeedStore::new();
    let (config, session) = logged_in(&store, "kahya").await;

    let (feed, follow) = commands::add_feed(&store, &session, "Boot.dev", "https://blog.boot.dev/index.xml")
        .await
        .unwrap();
    assert_eq!(follow.feed_id, feed.id);
    assert_eq!(follow.user_id, session.user.id);
    assert_eq!(feed.last_fetched_at, None);

    let follows = commands::following(&store, &session).await.unwrap();
    assert_eq!(follows.len(), 1);
    assert_eq!(follows[0].feed_name, "Boot.dev");

    let err = commands::add_feed(&store, &session, "Again", "https://blog.boot.dev/index.xml")
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::DuplicateFeedUrl { .. }));

    let err = commands::follow(&store, &session, "https://blog.boot.dev/index.xml")
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::DuplicateFollow { .. }));
    assert_eq!(commands::following(&store, &session).await.unwrap().len(), 1);

    let err = commands::add_feed(&store, &session, "Bad", "ftp://example.com/rss")
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::InvalidArgument(_)));

    std::fs::remove_file(config.path()).ok();
}

#[tokio::test]
async fn follow_unfollow_and_feed_listing() {
    let store = MemoryFeedStore::new();
    let (owner_config, owner) = logged_in(&store, "owner").await;
    let (reader_config, reader) = logged_in(&store, "reader").await;

    let (feed, _) = commands::add_feed(&store, &owner, "HN", "https://news.ycombinator.com/rss")
        .await
        .unwrap();

    let listing = commands::feeds(&store).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].user_name, "owner");

    let followed = commands::follow(&store, &reader, &feed.url).await.unwrap();
    assert_eq!(followed.id, feed.id);

    commands::unfollow(&store, &reader, &feed.url).await.unwrap();
    assert!(commands::following(&store, &reader).await.unwrap().is_empty());
    assert_eq!(commands::following(&store, &owner).await.unwrap().len(), 1);

    let err = commands::unfollow(&store, &reader, &feed.url).await.unwrap_err();
    assert!(matches!(err, AggregatorError::NotFollowing { .. }));

    let err = commands::follow(&store, &reader, "https://nowhere.example.com/rss")
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::FeedNotFound { .. }));

    std::fs::remove_file(owner_config.path()).ok();
    std::fs::remove_file(reader_config.path()).ok();
}

#[tokio::test]
async fn browse_shows_followed_posts_newest_first() {
    let store = MemoryFeedStore::new();
    let (config, session) = logged_in(&store, "kahya").await;

    let (followed, _) = commands::add_feed(&store, &session, "Mine", "https://mine.example.com/rss")
        .await
        .unwrap();
    let other_user = store.create_user("someone-else").await.unwrap();
    let unfollowed = store
        .create_feed("Theirs", "https://theirs.example.com/rss", other_user.id)
        .await
        .unwrap();

    let post = |feed_id, url: &str, day: Option<u32>| NewPost {
        feed_id,
        title: url.to_string(),
        url: url.to_string(),
        description: None,
        published_at: day.map(|d| Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap()),
    };
    store.create_post(post(followed.id, "https://mine.example.com/old", Some(1))).await.unwrap();
    store.create_post(post(followed.id, "https://mine.example.com/undated", None)).await.unwrap();
    store.create_post(post(followed.id, "https://mine.example.com/new", Some(20))).await.unwrap();
    store.create_post(post(unfollowed.id, "https://theirs.example.com/x", Some(25))).await.unwrap();

    let posts = commands::browse(&store, &session, 10).await.unwrap();
    let urls: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        [
            "https://mine.example.com/new",
            "https://mine.example.com/old",
            "https://mine.example.com/undated",
        ]
    );
    assert!(posts.iter().all(|p| p.feed_name == "Mine"));

    let limited = commands::browse(&store, &session, 2).await.unwrap();
    assert_eq!(limited.len(), 2);

    let err = commands::browse(&store, &session, 0).await.unwrap_err();
    assert!(matches!(err, AggregatorError::InvalidArgument(_)));

    std::fs::remove_file(config.path()).ok();
}

#[tokio::test]
async fn reset_removes_everything() {
    let store = MemoryFeedStore::new();
    let (config, session) = logged_in(&store, "kahya").await;
    commands::add_feed(&store, &session, "Mine", "https://mine.example.com/rss")
        .await
        .unwrap();

    commands::reset(&store).await.unwrap();

    assert!(commands::users(&store).await.unwrap().is_empty());
    assert!(commands::feeds(&store).await.unwrap().is_empty());
    assert!(store.get_next_feed_to_fetch().await.unwrap().is_none());

    std::fs::remove_file(config.path()).ok();
}

#[tokio::test]
async fn login_trims_the_name_like_register() {
    let store = MemoryFeedStore::new();
    let mut config = temp_config();

    commands::register(&store, &mut config, " bob ").await.unwrap();
    config.current_user_name = None;

    let user = commands::login(&store, &mut config, " bob").await.unwrap();
    assert_eq!(user.name, "bob");
    assert_eq!(config.current_user_name.as_deref(), Some("bob"));

    let err = commands::login(&store, &mut config, "   ").await.unwrap_err();
    assert!(matches!(err, AggregatorError::InvalidArgument(_)));

    std::fs::remove_file(config.path()).ok();
}

#[tokio::test]
async fn failed_add_feed_leaves_nothing_behind() {
    let store = MemoryFeedStore::new();
    let (config, session) = logged_in(&store, "kahya").await;

    // The session outlives its user.
    store.reset().await.unwrap();
    let err = commands::add_feed(&store, &session, "Mine", "https://mine.example.com/rss")
        .await
        .unwrap_err();
    assert!(matches!(err, AggregatorError::InvalidArgument(_)));
    assert!(commands::feeds(&store).await.unwrap().is_empty());
    assert!(commands::following(&store, &session).await.unwrap().is_empty());

    // The URL is still free for the next attempt.
    let mut config = config;
    commands::register(&store, &mut config, "kahya").await.unwrap();
    let session = Session::resolve(&store, &config).await.unwrap();
    let (feed, follow) = commands::add_feed(&store, &session, "Mine", "https://mine.example.com/rss")
        .await
        .unwrap();
    assert_eq!(follow.feed_id, feed.id);

    std::fs::remove_file(config.path()).ok();
}

#[tokio::test]
async fn browse_breaks_publication_ties_by_most_recently_stored() {
    let store = MemoryFeedStore::new();
    let (config, session) = logged_in(&store, "kahya").await;
    let (feed, _) = commands::add_feed(&store, &session, "Mine", "https://mine.example.com/rss")
        .await
        .unwrap();

    let published_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    for url in ["https://mine.example.com/first", "https://mine.example.com/second"] {
        store
            .create_post(NewPost {
                feed_id: feed.id,
                title: url.to_string(),
                url: url.to_string(),
                description: None,
                published_at,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let posts = commands::browse(&store, &session, 10).await.unwrap();
    let urls: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        ["https://mine.example.com/second", "https://mine.example.com/first"]
    );

    std::fs::remove_file(config.path()).ok();
}
