use crate::types::{
    Feed, FeedFollow, FeedListing, FollowListing, NewPost, ParsedFeed, Post, PostListing, Result,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistent records for users, feeds, follows and posts.
///
/// Uniqueness is enforced here and nowhere else: user names, feed URLs,
/// `(user, feed)` follow pairs and post URLs. Violations come back as the
/// matching `Duplicate*` error so callers can decide whether a conflict is
/// benign (ingestion) or a command failure (explicit user action).
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn create_user(&self, name: &str) -> Result<User>;

    async fn get_user(&self, name: &str) -> Result<User>;

    async fn list_users(&self) -> Result<Vec<User>>;

    /// Deletes every user; feeds, follows and posts go with them.
    async fn reset(&self) -> Result<()>;

    async fn create_feed(&self, name: &str, url: &str, owner_id: Uuid) -> Result<Feed>;

    /// Creates the feed and its owner's follow together; on failure
    /// neither row exists.
    async fn create_feed_with_follow(
        &self,
        name: &str,
        url: &str,
        owner_id: Uuid,
    ) -> Result<(Feed, FeedFollow)>;

    async fn get_feeds(&self) -> Result<Vec<FeedListing>>;

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed>;

    async fn create_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow>;

    async fn get_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FollowListing>>;

    async fn delete_feed_follow(&self, user_id: Uuid, feed_url: &str) -> Result<()>;

    async fn mark_feed_fetched(&self, feed_id: Uuid, fetched_at: DateTime<Utc>) -> Result<()>;

    /// The feed with the oldest `last_fetched_at`. Feeds never fetched come
    /// first; ties fall back to creation order.
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Posts from the feeds the user follows, newest publication first.
    async fn get_posts_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<PostListing>>;
}

/// Something that turns a feed URL into a parsed document.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed>;
}
