//! Line-oriented feed parser.
//!
//! Recognises only the narrow field subset Mastodon and Misskey emit for
//! `<item>` blocks: the post link and an attached media reference. Every
//! other line is skipped.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::app::{FedimageError, Result};
use crate::domain::{CreatorKey, MediaItem};

const ITEM_OPEN: &str = "<item>";
const ITEM_CLOSE: &str = "</item>";

static CDATA_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([A-Za-z_][\w:.\-]*)(?:\s[^>]*)?><!\[CDATA\[(.*)\]\]></[^>]+>$")
        .expect("valid CDATA field pattern")
});

static PLAIN_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([A-Za-z_][\w:.\-]*)(?:\s[^>]*)?>(.*)</[^>]+>$")
        .expect("valid plain field pattern")
});

static ENCLOSURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<enclosure\s(?:[^>]*\s)?url="([^"]*)"[^>]*/?>$"#)
        .expect("valid enclosure pattern")
});

static MEDIA_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<media:content\s(?:[^>]*\s)?url="([^"]*)"[^>]*>$"#)
        .expect("valid media:content pattern")
});

/// What to do with an item that has media but no `link`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionPolicy {
    /// Stop parsing at the item and report [`FedimageError::MissingAttribution`]
    /// in [`ParsedFeed::error`]. Items closed before it are kept.
    #[default]
    Strict,
    /// Drop the item and report its media URL in [`ParsedFeed::unattributed`].
    Lenient,
}

#[derive(Debug, Default)]
pub struct ParsedFeed {
    /// Items in document order, up to the point parsing stopped
    pub items: Vec<MediaItem>,
    /// Media URLs dropped for lack of a source link (lenient mode only)
    pub unattributed: Vec<String>,
    /// Why parsing stopped early, if it did
    pub error: Option<FedimageError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Link(String),
    MediaUrl(String),
    Other,
}

/// Fields accumulated for the `<item>` currently open.
#[derive(Debug, Default)]
struct PendingItem {
    link: Option<String>,
    media_url: Option<String>,
}

impl PendingItem {
    fn apply(&mut self, field: Field) {
        match field {
            Field::Link(link) => self.link = Some(link),
            Field::MediaUrl(url) => self.media_url = Some(url),
            Field::Other => {}
        }
    }
}

enum State {
    OutsideItem,
    InsideItem(PendingItem),
}

#[derive(Debug, Clone, Default)]
pub struct FeedParser {
    attribution: AttributionPolicy,
}

impl FeedParser {
    pub fn new(attribution: AttributionPolicy) -> Self {
        Self { attribution }
    }

    pub fn parse(&self, creator: &CreatorKey, document: &str) -> ParsedFeed {
        let mut parsed = ParsedFeed::default();
        let mut state = State::OutsideItem;

        for line in document.lines().map(str::trim) {
            state = match state {
                State::OutsideItem if line == ITEM_OPEN => State::InsideItem(PendingItem::default()),
                State::OutsideItem => State::OutsideItem,
                State::InsideItem(pending) if line == ITEM_CLOSE => {
                    if let Err(e) = self.finish_item(creator, pending, &mut parsed) {
                        parsed.error = Some(e);
                        break;
                    }
                    State::OutsideItem
                }
                State::InsideItem(mut pending) => {
                    if let Some(field) = extract_field(line) {
                        pending.apply(field);
                    }
                    State::InsideItem(pending)
                }
            };
        }

        parsed
    }

    fn finish_item(
        &self,
        creator: &CreatorKey,
        pending: PendingItem,
        parsed: &mut ParsedFeed,
    ) -> Result<()> {
        let Some(media_url) = pending.media_url else {
            return Ok(());
        };

        match (pending.link, self.attribution) {
            (Some(link), _) => parsed
                .items
                .push(MediaItem::new(creator.clone(), link, media_url)),
            (None, AttributionPolicy::Lenient) => parsed.unattributed.push(media_url),
            (None, AttributionPolicy::Strict) => {
                return Err(FedimageError::MissingAttribution {
                    creator: creator.to_string(),
                    media_url,
                })
            }
        }

        Ok(())
    }
}

/// Apply the field rules in priority order; the first match wins.
fn extract_field(line: &str) -> Option<Field> {
    if let Some(caps) = CDATA_FIELD.captures(line) {
        return Some(named_field(&caps[1], caps[2].to_string()));
    }
    if let Some(caps) = PLAIN_FIELD.captures(line) {
        return Some(named_field(&caps[1], decode_html_entities(&caps[2]).into_owned()));
    }
    ENCLOSURE
        .captures(line)
        .or_else(|| MEDIA_CONTENT.captures(line))
        .map(|caps| Field::MediaUrl(decode_html_entities(&caps[1]).into_owned()))
}

fn named_field(name: &str, value: String) -> Field {
    match name {
        "link" => Field::Link(value),
        _ => Field::Other,
    }
}
