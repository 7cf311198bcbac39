#![allow(dead_code)]

pub use blog_aggregator::{
    AggregatorError, Feed, FeedFollow, FeedListing, FeedParser, FeedSource, FeedStore,
    FollowListing, MemoryFeedStore, NewPost, ParsedFeed, Post, PostListing, Result,
    RssAggregator, User,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// One `<item>` for `rss_document`.
pub struct TestItem<'a> {
    pub title: &'a str,
    pub link: Option<&'a str>,
    pub pub_date: Option<&'a str>,
}

pub fn item<'a>(title: &'a str, link: &'a str) -> TestItem<'a> {
    TestItem {
        title,
        link: Some(link),
        pub_date: Some("Mon, 02 Jan 2006 15:04:05 -0700"),
    }
}

pub fn rss_document(title: &str, items: &[TestItem]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel>\
         <title>{}</title><link>https://example.com/</link><description>Test feed</description>",
        title
    );
    for item in items {
        xml.push_str("<item>");
        xml.push_str(&format!("<title>{}</title>", item.title));
        if let Some(link) = item.link {
            xml.push_str(&format!("<link>{}</link>", link));
        }
        xml.push_str("<description>Body</description>");
        if let Some(pub_date) = item.pub_date {
            xml.push_str(&format!("<pubDate>{}</pubDate>", pub_date));
        }
        xml.push_str("</item>");
    }
    xml.push_str("</channel></rss>");
    xml
}

/// `FeedSource` serving canned documents by URL. URLs without a document
/// fail the way an unreachable host would.
#[derive(Default)]
pub struct StubSource {
    documents: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, document: String) {
        self.documents.lock().unwrap().insert(url.to_string(), document);
    }

    pub fn take_down(&self, url: &str) {
        self.documents.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for StubSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        self.calls.lock().unwrap().push(url.to_string());

        let document = self.documents.lock().unwrap().get(url).cloned();
        match document {
            Some(document) => FeedParser::parse(document.as_bytes()),
            None => Err(AggregatorError::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryFeedStore>,
    pub source: Arc<StubSource>,
    pub aggregator: Arc<RssAggregator>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let store = Arc::new(MemoryFeedStore::new());
        let source = Arc::new(StubSource::new());
        let aggregator = Arc::new(RssAggregator::new(store.clone(), source.clone()));
        Self {
            store,
            source,
            aggregator,
        }
    }

    pub async fn user(&self, name: &str) -> User {
        self.store.create_user(name).await.unwrap()
    }

    pub async fn feed(&self, owner: &User, name: &str, url: &str) -> Feed {
        self.store.create_feed(name, url, owner.id).await.unwrap()
    }
}

/// `MemoryFeedStore` whose `create_post` fails with a storage error for
/// chosen URLs, the way a dropped database connection would.
#[derive(Default)]
pub struct FailingPostStore {
    pub inner: MemoryFeedStore,
    failing_urls: Mutex<HashSet<String>>,
}

impl FailingPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_post(&self, url: &str) {
        self.failing_urls.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl FeedStore for FailingPostStore {
    async fn create_user(&self, name: &str) -> Result<User> {
        self.inner.create_user(name).await
    }

    async fn get_user(&self, name: &str) -> Result<User> {
        self.inner.get_user(name).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users().await
    }

    async fn reset(&self) -> Result<()> {
        self.inner.reset().await
    }

    async fn create_feed(&self, name: &str, url: &str, owner_id: Uuid) -> Result<Feed> {
        self.inner.create_feed(name, url, owner_id).await
    }

    async fn create_feed_with_follow(
        &self,
        name: &str,
        url: &str,
        owner_id: Uuid,
    ) -> Result<(Feed, FeedFollow)> {
        self.inner.create_feed_with_follow(name, url, owner_id).await
    }

    async fn get_feeds(&self) -> Result<Vec<FeedListing>> {
        self.inner.get_feeds().await
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        self.inner.get_feed_by_url(url).await
    }

    async fn create_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<FeedFollow> {
        self.inner.create_feed_follow(user_id, feed_id).await
    }

    async fn get_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FollowListing>> {
        self.inner.get_feed_follows_for_user(user_id).await
    }

    async fn delete_feed_follow(&self, user_id: Uuid, feed_url: &str) -> Result<()> {
        self.inner.delete_feed_follow(user_id, feed_url).await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, fetched_at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_feed_fetched(feed_id, fetched_at).await
    }

    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        self.inner.get_next_feed_to_fetch().await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        if self.failing_urls.lock().unwrap().contains(&post.url) {
            return Err(AggregatorError::Storage(sqlx::Error::PoolTimedOut));
        }
        self.inner.create_post(post).await
    }

    async fn get_posts_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<PostListing>> {
        self.inner.get_posts_for_user(user_id, limit).await
    }
}
