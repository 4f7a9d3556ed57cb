// src/fetch/youtube.rs
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use super::VideoFetcher;
use crate::error::{FetchError, ResolutionError};
use crate::types::{CandidateItem, SourceIdentity};

const FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";
const CHANNEL_BASE: &str = "https://www.youtube.com/channel/";
const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";
const USER_AGENT: &str = concat!("video-watch/", env!("CARGO_PKG_VERSION"));

static RE_BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^UC[\w-]{22}$").unwrap());
static RE_URL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/channel/|[?&]channel_id=)(UC[\w-]{22})").unwrap());
static RE_PAGE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        <link\s+rel="canonical"\s+href="https://www\.youtube\.com/channel/(UC[\w-]{22})"
        | "externalId"\s*:\s*"(UC[\w-]{22})"
        | <meta\s+itemprop="(?:channelId|identifier)"\s+content="(UC[\w-]{22})"
        | "channelId"\s*:\s*"(UC[\w-]{22})"
        "#,
    )
    .unwrap()
});
static RE_OG_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta\s+property="og:title"\s+content="([^"]*)""#).unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<Author>,
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    #[serde(default)]
    published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
    #[serde(rename = "@href", default)]
    href: Option<String>,
}

/// A locator after syntactic inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// The channel id is already known.
    ChannelId(String),
    /// A handle or custom URL; the id lives in the page markup.
    Page(String),
}

/// Classify a user-supplied locator without touching the network.
pub fn parse_locator(raw: &str) -> Result<Locator, FetchError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FetchError::Locator("empty locator".into()));
    }
    if RE_BARE_ID.is_match(raw) {
        return Ok(Locator::ChannelId(raw.to_string()));
    }
    if let Some(c) = RE_URL_ID.captures(raw) {
        return Ok(Locator::ChannelId(c[1].to_string()));
    }
    if raw.starts_with('@') {
        return Ok(Locator::Page(format!("https://www.youtube.com/{raw}")));
    }
    if raw.starts_with("https://") || raw.starts_with("http://") {
        return Ok(Locator::Page(raw.to_string()));
    }
    if raw.contains("youtube.com/") {
        return Ok(Locator::Page(format!("https://{raw}")));
    }
    Err(FetchError::Locator(format!("unrecognized locator '{raw}'")))
}

/// Pull the channel id out of a channel page.
pub fn extract_channel_id(html: &str) -> Option<String> {
    let caps = RE_PAGE_ID.captures(html)?;
    caps.iter()
        .skip(1)
        .flatten()
        .next()
        .map(|m| m.as_str().to_string())
}

/// Channel name from the page's `og:title`. Attribute values are still
/// entity-encoded at this point, unlike feed text.
pub fn extract_page_title(html: &str) -> Option<String> {
    let raw = RE_OG_TITLE.captures(html)?.get(1)?.as_str();
    let name = normalize_text(&html_escape::decode_html_entities(raw));
    (!name.is_empty()).then_some(name)
}

/// Collapse whitespace in feed text. The XML reader has already unescaped it.
pub fn normalize_text(s: &str) -> String {
    RE_WS.replace_all(s.trim(), " ").into_owned()
}

/// Parsed channel feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFeed {
    /// Feed title, falling back to the author name. `None` when the feed has neither.
    pub channel_name: Option<String>,
    pub items: Vec<CandidateItem>,
}

/// Parse a channel's Atom feed. Entries keep feed order (newest first) and
/// are cut at `limit`. Entries whose id is missing are kept with an empty
/// `item_id` so the caller can count them.
pub fn parse_feed(xml: &str, channel_id: &str, limit: usize) -> Result<ChannelFeed, FetchError> {
    let feed: Feed = from_str(xml).map_err(|e| FetchError::Parse(e.to_string()))?;

    let channel_name = feed
        .title
        .as_deref()
        .map(normalize_text)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            feed.author
                .and_then(|a| a.name)
                .map(|n| normalize_text(&n))
                .filter(|n| !n.is_empty())
        });

    let items = feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| {
            let item_id = entry
                .id
                .as_deref()
                .map(|id| id.trim().trim_start_matches("yt:video:").to_string())
                .unwrap_or_default();
            let url = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
                .and_then(|l| l.href.clone())
                .unwrap_or_else(|| {
                    if item_id.is_empty() {
                        String::new()
                    } else {
                        format!("{WATCH_BASE}{item_id}")
                    }
                });
            CandidateItem {
                item_id,
                source_id: channel_id.to_string(),
                source_name: channel_name.clone().unwrap_or_default(),
                title: entry
                    .title
                    .as_deref()
                    .map(normalize_text)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Unknown Title".to_string()),
                url,
                published_at: entry.published.unwrap_or_default().trim().to_string(),
            }
        })
        .collect();

    Ok(ChannelFeed {
        channel_name,
        items,
    })
}

/// Fetch adapter over the public per-channel Atom feed.
#[derive(Clone)]
pub struct YouTubeFeedFetcher {
    client: Client,
}

impl YouTubeFeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = ?e, url, "channel http error");
            FetchError::Request(e)
        })?;
        Ok(resp.error_for_status()?.text().await?)
    }

    /// Channel id for `locator`, plus the page title when a page had to be fetched.
    async fn locate(&self, locator: &str) -> Result<(String, Option<String>), FetchError> {
        match parse_locator(locator)? {
            Locator::ChannelId(id) => Ok((id, None)),
            Locator::Page(url) => {
                let html = self.get_text(&url).await?;
                let id = extract_channel_id(&html)
                    .ok_or_else(|| FetchError::Parse(format!("no channel id on page {url}")))?;
                Ok((id, extract_page_title(&html)))
            }
        }
    }

    async fn feed(&self, channel_id: &str, limit: usize) -> Result<ChannelFeed, FetchError> {
        let xml = self.get_text(&format!("{FEED_BASE}{channel_id}")).await?;
        parse_feed(&xml, channel_id, limit)
    }
}

#[async_trait]
impl VideoFetcher for YouTubeFeedFetcher {
    async fn resolve_identity(&self, locator: &str) -> Result<SourceIdentity, ResolutionError> {
        let (channel_id, page_title) = self
            .locate(locator)
            .await
            .map_err(|e| ResolutionError::new(locator, e))?;
        let feed = self
            .feed(&channel_id, 0)
            .await
            .map_err(|e| ResolutionError::new(locator, e))?;
        let display_name = feed
            .channel_name
            .or(page_title)
            .unwrap_or_else(|| channel_id.clone());
        Ok(SourceIdentity {
            canonical_url: format!("{CHANNEL_BASE}{channel_id}"),
            source_id: channel_id,
            display_name,
        })
    }

    async fn fetch_recent(
        &self,
        locator: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, FetchError> {
        let (channel_id, _) = self.locate(locator).await?;
        Ok(self.feed(&channel_id, limit).await?.items)
    }
}
