pub mod types;
pub mod traits;
pub mod config;
pub mod feed_manager;
pub mod memory_store;
pub mod fetcher;
pub mod parser;
pub mod normalizer;
pub mod aggregator;
pub mod scheduler;
pub mod commands;

pub use types::*;
pub use traits::{FeedSource, FeedStore};
pub use config::Config;
pub use feed_manager::FeedManager;
pub use memory_store::MemoryFeedStore;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use aggregator::RssAggregator;
pub use scheduler::{parse_interval, Poller};
