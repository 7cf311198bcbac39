use crate::aggregator::RssAggregator;
use crate::types::{AggregatorError, IngestReport, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Parses a duration written the way `agg` takes it: one or more
/// number/unit pairs such as `30s`, `1m`, `1h30m` or `1.5h`.
///
/// Recognised units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. The
/// result must be positive.
pub fn parse_interval(value: &str) -> Result<Duration> {
    let invalid = || AggregatorError::InvalidInterval(value.to_string());

    let mut rest = value.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_end == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        total_nanos += number * nanos_per_unit;
        rest = &rest[unit_end..];
    }

    if total_nanos < 1.0 || !total_nanos.is_finite() {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Drives the aggregator on a fixed wall-clock interval, one feed per tick.
pub struct Poller {
    aggregator: Arc<RssAggregator>,
    interval: Duration,
}

impl Poller {
    pub fn new(aggregator: Arc<RssAggregator>, interval: Duration) -> Self {
        Self { aggregator, interval }
    }

    /// Picks the stalest feed and ingests it. `None` when there are no feeds.
    pub async fn tick(&self) -> Result<Option<IngestReport>> {
        let Some(feed) = self.aggregator.store().get_next_feed_to_fetch().await? else {
            debug!("No feeds to fetch");
            return Ok(None);
        };

        info!("Fetching feed {} ({})", feed.name, feed.url);
        self.aggregator.ingest_feed(&feed).await.map(Some)
    }

    /// Polls forever. The first tick fires immediately; ticks missed while a
    /// slow cycle was running are skipped rather than replayed.
    pub async fn run(&self) {
        info!("Collecting feeds every {:?}...", self.interval);

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            // Fetch and parse failures are already reported by the cycle.
            if let Err(e) = self.tick().await {
                match e {
                    AggregatorError::Fetch { .. } | AggregatorError::Parse(_) => {}
                    other => error!("Poll cycle failed: {}", other),
                }
            }
        }
    }
}
