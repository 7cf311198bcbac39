use crate::types::{AggregatorError, ParsedFeed, ParsedItem, Result};
use rss::Channel;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct FeedParser;

impl FeedParser {
    /// Parses an RSS 2.0 document. Items keep their document order and their
    /// fields are left as raw text; interpretation belongs to the normalizer.
    pub fn parse(content: &[u8]) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let content = Self::strip_preamble(content)?;
        let channel = Channel::read_from(content)
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let items = channel
            .items()
            .iter()
            .map(|item| ParsedItem {
                title: item.title().map(str::to_string),
                link: item.link().map(str::to_string),
                description: item.description().map(str::to_string),
                pub_date: item.pub_date().map(str::to_string),
            })
            .collect::<Vec<_>>();

        debug!("Parsed channel {:?} with {} items", channel.title(), items.len());

        Ok(ParsedFeed {
            title: channel.title().to_string(),
            description: channel.description().to_string(),
            items,
        })
    }

    /// Drops a byte-order mark and leading whitespace, which some servers
    /// emit ahead of the XML declaration.
    fn strip_preamble(content: &[u8]) -> Result<&[u8]> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let start = content
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .ok_or_else(|| AggregatorError::Parse("Empty feed document".to_string()))?;
        Ok(&content[start..])
    }
}
