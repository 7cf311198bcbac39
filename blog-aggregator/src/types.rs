use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post candidate produced by the normalizer, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub feed_id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Feed row joined with the name of the user who added it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedListing {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub user_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowListing {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub feed_name: String,
    pub feed_url: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostListing {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_name: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "blog-aggregator/0.1".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    pub items: Vec<ParsedItem>,
}

/// One `<item>` as it appeared in the document. Every field is raw text.
#[derive(Debug, Clone, Default)]
pub struct ParsedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
}

/// Outcome of one ingestion cycle for one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub feed_id: Uuid,
    pub feed_name: String,
    pub channel_title: String,
    pub items_found: usize,
    pub posts_created: usize,
    pub duplicates: usize,
    pub skipped_items: usize,
    pub failures: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("a feed with URL {url} already exists")]
    DuplicateFeedUrl { url: String },

    #[error("already following {feed_url}")]
    DuplicateFollow { feed_url: String },

    #[error("user {name} already exists")]
    DuplicateUser { name: String },

    #[error("a post with URL {url} already exists")]
    DuplicatePostUrl { url: String },

    #[error("no feed found for {url}")]
    FeedNotFound { url: String },

    #[error("couldn't find user: {name}")]
    UserNotFound { name: String },

    #[error("not following {url}")]
    NotFollowing { url: String },

    #[error("not logged in, run `register` or `login` first")]
    NotLoggedIn,

    #[error("invalid duration: {0}")]
    InvalidInterval(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AggregatorError {
    /// Uniqueness conflicts the ingestion cycle absorbs silently.
    pub fn is_duplicate_post(&self) -> bool {
        matches!(self, AggregatorError::DuplicatePostUrl { .. })
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
