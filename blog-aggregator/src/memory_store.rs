use crate::traits::FeedStore;
use crate::types::{
    AggregatorError, Feed, FeedFollow, FeedListing, FollowListing, NewPost, Post, PostListing,
    Result, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    feeds: Vec<Feed>,
    follows: Vec<FeedFollow>,
    posts: Vec<Post>,
}

/// `FeedStore` kept entirely in process memory.
///
/// Rows are kept in insertion order, which stands in for creation order
/// wherever the PostgreSQL store breaks ties on `created_at`.
#[derive(Default)]
pub struct MemoryFeedStore {
    tables: RwLock<Tables>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn post_count(&self) -> usize {
        self.tables.read().await.posts.len()
    }

    pub async fn posts_for_feed(&self, feed_id: Uuid) -> Vec<Post> {
        let tables = self.tables.read().await;
        tables
            .posts
            .iter()
            .filter(|p| p.feed_id == feed_id)
            .cloned()
            .collect()
    }

    pub async fn get_feed(&self, feed_id: Uuid) -> Option<Feed> {
        let tables = self.tables.read().await;
        tables.feeds.iter().find(|f| f.id == feed_id).cloned()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn create_user(&self, name: &str) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.name == name) {
            return Err(AggregatorError::DuplicateUser { name: name.to_string() });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.name == name)
            .cloned()
            .ok_or_else(|| AggregatorError::UserNotFound { name: name.to_string() })
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn reset(&self) -> Result<()> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }

    async fn create_feed(&self, name: &str, url: &str, owner_id: Uuid) -> Result<Feed> {
        let mut tables = self.tables.write().await;
        insert_feed(&mut tables, name, url, owner_id)
    }

    async fn create_feed_with_follow(
        &self,
        name: &str,
        url: &str,
        owner_id: Uuid,
    ) -> Result<(Feed, FeedFollow)> {
        // Both rows are written under one lock, and the follow cannot
        // conflict on a feed that did not exist a moment ago.
        let mut tables = self.tables.write().await;
        let feed = insert_feed(&mut tables, name, url, owner_id)?;

        let now = Utc::now();
        let follow = FeedFollow {
            id: Uuid::new_v4(),
            user_id: owner_id,
            feed_id: feed.id,
            created_at: now,
            updated_at: now,
        };
        tables.follows.push(follow.clone());
        Ok((feed, follow))
    }

    async fn get_feeds(&self) -> Result<Vec<FeedListing>> {
        let tables = self.tables.read().await;
        Ok(tables
            .feeds
            .iter()
            .map(|f| FeedListing {
                id: f.id,
                name: f.name.clone(),
                url: f.url.clone(),
                user_name: user_name(&tables, f.user_id),
            })
            .collect())
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        let tables = self.tables.read().await;
        tables
            .feeds
            .iter()
            .find(|f| f.url == url)
            .cloned()
            .ok_or_else(|| AggregatorError::FeedNotFound { url: url.to_string() })
    }

    async fn create_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        let mut tables = self.tables.write().await;
        let feed_url = tables
            .feeds
            .iter()
            .find(|f| f.id == feed_id)
            .map(|f| f.url.clone())
            .ok_or_else(|| AggregatorError::InvalidArgument(format!("unknown feed id {}", feed_id)))?;

        if tables
            .follows
            .iter()
            .any(|ff| ff.user_id == user_id && ff.feed_id == feed_id)
        {
            return Err(AggregatorError::DuplicateFollow { feed_url });
        }

        let now = Utc::now();
        let follow = FeedFollow {
            id: Uuid::new_v4(),
            user_id,
            feed_id,
            created_at: now,
            updated_at: now,
        };
        tables.follows.push(follow.clone());
        Ok(follow)
    }

    async fn get_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FollowListing>> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|ff| ff.user_id == user_id)
            .filter_map(|ff| {
                let feed = tables.feeds.iter().find(|f| f.id == ff.feed_id)?;
                Some(FollowListing {
                    id: ff.id,
                    feed_id: feed.id,
                    feed_name: feed.name.clone(),
                    feed_url: feed.url.clone(),
                    user_name: user_name(&tables, ff.user_id),
                    created_at: ff.created_at,
                })
            })
            .collect())
    }

    async fn delete_feed_follow(&self, user_id: Uuid, feed_url: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let feed_id = tables
            .feeds
            .iter()
            .find(|f| f.url == feed_url)
            .map(|f| f.id)
            .ok_or_else(|| AggregatorError::FeedNotFound { url: feed_url.to_string() })?;

        let before = tables.follows.len();
        tables
            .follows
            .retain(|ff| !(ff.user_id == user_id && ff.feed_id == feed_id));

        if tables.follows.len() == before {
            return Err(AggregatorError::NotFollowing { url: feed_url.to_string() });
        }
        Ok(())
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, fetched_at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let feed = tables
            .feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or_else(|| AggregatorError::FeedNotFound { url: feed_id.to_string() })?;

        feed.last_fetched_at = Some(fetched_at);
        feed.updated_at = fetched_at;
        Ok(())
    }

    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let tables = self.tables.read().await;
        // `None` sorts before any `Some`, and `min_by_key` keeps the first
        // of equal keys, so never-fetched feeds win in insertion order.
        Ok(tables
            .feeds
            .iter()
            .min_by_key(|f| f.last_fetched_at)
            .cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if tables.posts.iter().any(|p| p.url == post.url) {
            return Err(AggregatorError::DuplicatePostUrl { url: post.url });
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            feed_id: post.feed_id,
            title: post.title,
            url: post.url,
            description: post.description,
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn get_posts_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<PostListing>> {
        let tables = self.tables.read().await;
        let followed: Vec<Uuid> = tables
            .follows
            .iter()
            .filter(|ff| ff.user_id == user_id)
            .map(|ff| ff.feed_id)
            .collect();

        let mut posts: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| followed.contains(&p.feed_id))
            .collect();
        // Newest first, undated posts last, then most recently stored.
        posts.sort_by_key(|p| {
            (
                p.published_at.is_none(),
                Reverse(p.published_at),
                Reverse(p.created_at),
            )
        });

        Ok(posts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|p| PostListing {
                id: p.id,
                title: p.title.clone(),
                url: p.url.clone(),
                description: p.description.clone(),
                published_at: p.published_at,
                feed_name: tables
                    .feeds
                    .iter()
                    .find(|f| f.id == p.feed_id)
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

fn insert_feed(tables: &mut Tables, name: &str, url: &str, owner_id: Uuid) -> Result<Feed> {
    if tables.feeds.iter().any(|f| f.url == url) {
        return Err(AggregatorError::DuplicateFeedUrl { url: url.to_string() });
    }
    if !tables.users.iter().any(|u| u.id == owner_id) {
        return Err(AggregatorError::InvalidArgument(format!(
            "unknown user id {}",
            owner_id
        )));
    }

    let now = Utc::now();
    let feed = Feed {
        id: Uuid::new_v4(),
        name: name.to_string(),
        url: url.to_string(),
        user_id: owner_id,
        created_at: now,
        updated_at: now,
        last_fetched_at: None,
    };
    tables.feeds.push(feed.clone());
    Ok(feed)
}

fn user_name(tables: &Tables, user_id: Uuid) -> String {
    tables
        .users
        .iter()
        .find(|u| u.id == user_id)
        .map(|u| u.name.clone())
        .unwrap_or_default()
}
