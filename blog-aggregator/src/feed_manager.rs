use crate::traits::FeedStore;
use crate::types::{
    AggregatorError, Feed, FeedFollow, FeedListing, FollowListing, NewPost, Post, PostListing,
    Result, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, Pool, Postgres};
use tracing::{debug, info};
use uuid::Uuid;

/// PostgreSQL-backed `FeedStore`.
pub struct FeedManager {
    db: Pool<Postgres>,
}

impl FeedManager {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        debug!("Database schema is up to date");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

async fn insert_feed<'e, E>(executor: E, name: &str, url: &str, owner_id: Uuid) -> Result<Feed>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();

    sqlx::query_as::<_, Feed>(
        r#"
        INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, url, user_id, created_at, updated_at, last_fetched_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(name)
    .bind(url)
    .bind(owner_id)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AggregatorError::DuplicateFeedUrl { url: url.to_string() }
        } else {
            e.into()
        }
    })
}

async fn insert_follow<'e, E>(
    executor: E,
    user_id: Uuid,
    feed_id: Uuid,
) -> std::result::Result<FeedFollow, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();

    sqlx::query_as::<_, FeedFollow>(
        r#"
        INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, feed_id, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(feed_id)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl FeedStore for FeedManager {
    async fn create_user(&self, name: &str) -> Result<User> {
        let now = Utc::now();

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, created_at, updated_at, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AggregatorError::DuplicateUser { name: name.to_string() }
            } else {
                e.into()
            }
        })
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AggregatorError::UserNotFound { name: name.to_string() })
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn reset(&self) -> Result<()> {
        let result = sqlx::query("DELETE FROM users").execute(&self.db).await?;
        info!("Deleted {} users", result.rows_affected());
        Ok(())
    }

    async fn create_feed(&self, name: &str, url: &str, owner_id: Uuid) -> Result<Feed> {
        let feed = insert_feed(&self.db, name, url, owner_id).await?;
        info!("Added new feed: {} with ID: {}", url, feed.id);
        Ok(feed)
    }

    async fn create_feed_with_follow(
        &self,
        name: &str,
        url: &str,
        owner_id: Uuid,
    ) -> Result<(Feed, FeedFollow)> {
        let mut tx = self.db.begin().await?;

        let feed = insert_feed(&mut *tx, name, url, owner_id).await?;
        let follow = insert_follow(&mut *tx, owner_id, feed.id).await?;

        tx.commit().await?;
        info!("Added new feed: {} with ID: {}", url, feed.id);
        Ok((feed, follow))
    }

    async fn get_feeds(&self) -> Result<Vec<FeedListing>> {
        let feeds = sqlx::query_as::<_, FeedListing>(
            r#"
            SELECT feeds.id, feeds.name, feeds.url, users.name AS user_name
            FROM feeds
            JOIN users ON users.id = feeds.user_id
            ORDER BY feeds.created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(feeds)
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at, last_fetched_at
            FROM feeds
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AggregatorError::FeedNotFound { url: url.to_string() })
    }

    async fn create_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        let result = insert_follow(&self.db, user_id, feed_id).await;

        match result {
            Ok(follow) => Ok(follow),
            Err(e) if is_unique_violation(&e) => {
                let feed_url = sqlx::query_scalar::<_, String>("SELECT url FROM feeds WHERE id = $1")
                    .bind(feed_id)
                    .fetch_optional(&self.db)
                    .await?
                    .unwrap_or_else(|| feed_id.to_string());
                Err(AggregatorError::DuplicateFollow { feed_url })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FollowListing>> {
        let follows = sqlx::query_as::<_, FollowListing>(
            r#"
            SELECT feed_follows.id, feed_follows.feed_id, feeds.name AS feed_name,
                   feeds.url AS feed_url, users.name AS user_name, feed_follows.created_at
            FROM feed_follows
            JOIN feeds ON feeds.id = feed_follows.feed_id
            JOIN users ON users.id = feed_follows.user_id
            WHERE feed_follows.user_id = $1
            ORDER BY feed_follows.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(follows)
    }

    async fn delete_feed_follow(&self, user_id: Uuid, feed_url: &str) -> Result<()> {
        let feed = self.get_feed_by_url(feed_url).await?;

        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed.id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AggregatorError::NotFollowing { url: feed_url.to_string() });
        }
        Ok(())
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, fetched_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE feeds SET last_fetched_at = $1, updated_at = $1 WHERE id = $2",
        )
        .bind(fetched_at)
        .bind(feed_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AggregatorError::FeedNotFound { url: feed_id.to_string() });
        }
        debug!("Marked feed {} fetched at {}", feed_id, fetched_at);
        Ok(())
    }

    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at, last_fetched_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.db)
        .await?;
        Ok(feed)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let now = Utc::now();

        // A conflicting URL inserts nothing and returns no row.
        let stored = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, url, description, published_at, feed_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (url) DO NOTHING
            RETURNING id, feed_id, title, url, description, published_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .fetch_optional(&self.db)
        .await?;

        stored.ok_or(AggregatorError::DuplicatePostUrl { url: post.url })
    }

    async fn get_posts_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<PostListing>> {
        let posts = sqlx::query_as::<_, PostListing>(
            r#"
            SELECT posts.id, posts.title, posts.url, posts.description, posts.published_at,
                   feeds.name AS feed_name
            FROM posts
            JOIN feed_follows ON feed_follows.feed_id = posts.feed_id
            JOIN feeds ON feeds.id = posts.feed_id
            WHERE feed_follows.user_id = $1
            ORDER BY posts.published_at DESC NULLS LAST, posts.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(posts)
    }
}
