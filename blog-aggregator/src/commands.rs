//! One handler per CLI command. Handlers return what they did; printing is
//! left to the `print_*` helpers so the binary decides what goes to stdout.

use crate::config::Config;
use crate::traits::FeedStore;
use crate::types::{
    AggregatorError, Feed, FeedFollow, FeedListing, FollowListing, PostListing, Result, User,
};
use tracing::info;
use url::Url;

pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// The logged-in user for the duration of one command.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
}

impl Session {
    /// Looks up the config's current user in the store.
    pub async fn resolve(store: &dyn FeedStore, config: &Config) -> Result<Self> {
        let name = config
            .current_user_name
            .as_deref()
            .ok_or(AggregatorError::NotLoggedIn)?;
        let user = store.get_user(name).await?;
        Ok(Self { user })
    }
}

pub async fn register(store: &dyn FeedStore, config: &mut Config, name: &str) -> Result<User> {
    let name = required("name", name)?;
    let user = store.create_user(name).await?;
    config.set_user(&user.name)?;
    info!("Registered user {}", user.name);
    Ok(user)
}

pub async fn login(store: &dyn FeedStore, config: &mut Config, name: &str) -> Result<User> {
    let name = required("name", name)?;
    let user = store.get_user(name).await?;
    config.set_user(&user.name)?;
    Ok(user)
}

pub async fn reset(store: &dyn FeedStore) -> Result<()> {
    store.reset().await
}

pub async fn users(store: &dyn FeedStore) -> Result<Vec<User>> {
    store.list_users().await
}

/// Creates the feed and has its creator follow it.
pub async fn add_feed(
    store: &dyn FeedStore,
    session: &Session,
    name: &str,
    url: &str,
) -> Result<(Feed, FeedFollow)> {
    let name = required("name", name)?;
    let url = validate_feed_url(url)?;

    store
        .create_feed_with_follow(name, &url, session.user.id)
        .await
}

pub async fn feeds(store: &dyn FeedStore) -> Result<Vec<FeedListing>> {
    store.get_feeds().await
}

pub async fn follow(store: &dyn FeedStore, session: &Session, url: &str) -> Result<Feed> {
    let feed = store.get_feed_by_url(url.trim()).await?;
    store.create_feed_follow(session.user.id, feed.id).await?;
    Ok(feed)
}

pub async fn following(store: &dyn FeedStore, session: &Session) -> Result<Vec<FollowListing>> {
    store.get_feed_follows_for_user(session.user.id).await
}

pub async fn unfollow(store: &dyn FeedStore, session: &Session, url: &str) -> Result<()> {
    store.delete_feed_follow(session.user.id, url.trim()).await
}

pub async fn browse(store: &dyn FeedStore, session: &Session, limit: i64) -> Result<Vec<PostListing>> {
    if limit <= 0 {
        return Err(AggregatorError::InvalidArgument(format!(
            "invalid limit: {}",
            limit
        )));
    }
    store.get_posts_for_user(session.user.id, limit).await
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AggregatorError::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(value)
}

/// Only absolute http(s) URLs with a host are accepted.
pub fn validate_feed_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim())?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
        return Err(AggregatorError::InvalidArgument(format!(
            "feed URL must be http(s): {}",
            url
        )));
    }
    Ok(url.trim().to_string())
}

pub fn print_user(user: &User) {
    println!(" * ID:      {}", user.id);
    println!(" * Name:    {}", user.name);
}

pub fn print_users(users: &[User], current: Option<&str>) {
    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
}

pub fn print_feed(feed: &Feed) {
    println!("* ID:            {}", feed.id);
    println!("* Created:       {}", feed.created_at);
    println!("* Updated:       {}", feed.updated_at);
    println!("* Name:          {}", feed.name);
    println!("* URL:           {}", feed.url);
    println!("* UserID:        {}", feed.user_id);
    match feed.last_fetched_at {
        Some(at) => println!("* LastFetchedAt: {}", at),
        None => println!("* LastFetchedAt: never"),
    }
}

pub fn print_feed_listing(feeds: &[FeedListing]) {
    for feed in feeds {
        println!("* {}", feed.name);
        println!("  URL:      {}", feed.url);
        println!("  Added by: {}", feed.user_name);
    }
}

pub fn print_following(user: &User, follows: &[FollowListing]) {
    println!("User: {}", user.name);
    println!("Following:");
    for follow in follows {
        println!("* {} ({})", follow.feed_name, follow.feed_url);
    }
}

pub fn print_posts(user: &User, posts: &[PostListing]) {
    println!("Found {} posts for user {}:", posts.len(), user.name);
    for post in posts {
        let published = post
            .published_at
            .map(|at| at.format("%a %b %-d").to_string())
            .unwrap_or_else(|| "undated".to_string());
        println!("{} from {}", published, post.feed_name);
        println!("--- {} ---", post.title);
        println!("    {}", post.description.as_deref().unwrap_or(""));
        println!("Link: {}", post.url);
        println!("=====================================");
    }
}
