use crate::normalizer::normalize_item;
use crate::traits::{FeedSource, FeedStore};
use crate::types::{Feed, IngestReport, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Runs ingestion cycles: fetch a feed, normalize its items, store new posts.
pub struct RssAggregator {
    store: Arc<dyn FeedStore>,
    source: Arc<dyn FeedSource>,
}

impl RssAggregator {
    pub fn new(store: Arc<dyn FeedStore>, source: Arc<dyn FeedSource>) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &Arc<dyn FeedStore> {
        &self.store
    }

    /// One ingestion cycle for `feed`.
    ///
    /// A fetch or parse failure is returned before anything is written, so
    /// the feed keeps its old `last_fetched_at`. Once the document is in
    /// hand the marker is advanced first, then each item is stored on its
    /// own; a duplicate URL is skipped quietly and any other storage error
    /// is logged and counted without stopping the remaining items.
    pub async fn ingest_feed(&self, feed: &Feed) -> Result<IngestReport> {
        let parsed = match self.source.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping feed {} ({}): {}", feed.name, feed.url, e);
                return Err(e);
            }
        };

        self.store.mark_feed_fetched(feed.id, Utc::now()).await?;

        info!(
            "Feed {}: channel {:?} has {} items",
            feed.name,
            parsed.title,
            parsed.items.len()
        );

        let mut report = IngestReport {
            feed_id: feed.id,
            feed_name: feed.name.clone(),
            channel_title: parsed.title.clone(),
            items_found: parsed.items.len(),
            posts_created: 0,
            duplicates: 0,
            skipped_items: 0,
            failures: 0,
        };

        for item in &parsed.items {
            let Some(candidate) = normalize_item(feed.id, item) else {
                debug!("Dropping item without link: {:?}", item.title);
                report.skipped_items += 1;
                continue;
            };

            match self.store.create_post(candidate).await {
                Ok(post) => {
                    info!("Found post: {}", post.title);
                    report.posts_created += 1;
                }
                Err(e) if e.is_duplicate_post() => {
                    report.duplicates += 1;
                }
                Err(e) => {
                    error!("Couldn't store item from feed {}: {}", feed.name, e);
                    report.failures += 1;
                }
            }
        }

        info!(
            "Feed {}: found {} items, stored {} new posts ({} already known, {} skipped, {} failed)",
            feed.name,
            report.items_found,
            report.posts_created,
            report.duplicates,
            report.skipped_items,
            report.failures
        );

        Ok(report)
    }
}
