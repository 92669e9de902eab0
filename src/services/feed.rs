// src/services/feed.rs

//! Feed source service.
//!
//! Fetches the RSS document and flattens each `<item>` into a field bag keyed
//! by qualified element name. Zero, one or many items all come back as a
//! `Vec`, in document order.

use std::collections::HashMap;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::FeedConfig;

/// One raw feed item, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    fields: HashMap<String, String>,
}

impl RawItem {
    /// Build an item from `(element, text)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut item = Self::default();
        for (key, value) in pairs {
            item.insert(key.into(), value.into());
        }
        item
    }

    /// Field text, trimmed; empty fields read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Record a field. The first occurrence of a repeated element wins.
    pub fn insert(&mut self, key: String, value: String) {
        self.fields.entry(key).or_insert(value);
    }
}

/// Producer of the ordered item sequence for one run.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current feed snapshot, newest first.
    async fn fetch(&self) -> Result<Vec<RawItem>>;
}

/// Feed source backed by an HTTP GET of an RSS document.
pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Feed source for the configured feed owner.
    pub fn from_config(client: Client, config: &FeedConfig) -> Self {
        Self::new(client, config.rss_url())
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<RawItem>> {
        log::info!("Fetching feed {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::feed(format!("GET {} returned {}", self.url, status)));
        }

        let body = response.text().await?;
        let items = parse_feed(&body)?;
        log::info!("Feed contains {} items", items.len());
        Ok(items)
    }
}

/// Parse an RSS document into raw items.
///
/// Only direct children of `<item>` become fields; nested markup contributes
/// its text to the enclosing field.
pub fn parse_feed(xml: &str) -> Result<Vec<RawItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<(String, String)> = None;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            AppError::feed(format!(
                "invalid XML at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if current.is_none() {
                    if name == "item" {
                        current = Some(RawItem::default());
                        depth = 0;
                    }
                } else {
                    depth += 1;
                    if depth == 1 {
                        field = Some((name, String::new()));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = field.as_mut() {
                    let unescaped = t.unescape().map_err(AppError::feed)?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if let Some(item) = current.as_mut() {
                    if depth == 0 {
                        items.extend(current.take());
                    } else {
                        if depth == 1 {
                            if let Some((name, text)) = field.take() {
                                item.insert(name, text);
                            }
                        }
                        depth -= 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}
