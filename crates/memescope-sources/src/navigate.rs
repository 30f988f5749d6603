//! Page navigation for the crawl half of collection.
//!
//! Crawl targets are platform names ("微博热搜", "B站热门", ...) resolved
//! against a fixed table of trending-board URLs. [`HttpNavigator`] fetches a
//! page with a browser user agent and reduces it to title plus visible text.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::SourceError;
use crate::html::{extract_title, visible_text};

/// Trending boards the crawler knows how to reach.
pub const KNOWN_TARGETS: &[(&str, &str)] = &[
    ("微博热搜", "https://s.weibo.com/top/summary"),
    ("知乎热榜", "https://www.zhihu.com/billboard"),
    ("B站热门", "https://www.bilibili.com/v/popular/all"),
    ("百度热搜", "https://top.baidu.com/board"),
    ("抖音热点", "https://www.douyin.com/hot"),
    ("36氪", "https://36kr.com/hot-list/catalog"),
];

/// Resolves a crawl target name to a URL.
///
/// Matching is by substring in either direction, so "微博" and
/// "微博热搜榜" both resolve to the 微博热搜 board. Blank names never match.
#[must_use]
pub fn target_url(target: &str) -> Option<&'static str> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    KNOWN_TARGETS
        .iter()
        .find(|(name, _)| *name == target)
        .or_else(|| {
            KNOWN_TARGETS
                .iter()
                .find(|(name, _)| name.contains(target) || target.contains(name))
        })
        .map(|(_, url)| *url)
}

/// A rendered page reduced to what the extractor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub title: String,
    pub text: String,
}

/// Loads a page and returns its title and visible text.
pub trait PageNavigator: Send + Sync {
    fn navigate(&self, url: &str) -> impl Future<Output = Result<PageSnapshot, SourceError>> + Send;
}

/// [`PageNavigator`] over plain HTTP GET.
pub struct HttpNavigator {
    client: Client,
}

impl HttpNavigator {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl PageNavigator for HttpNavigator {
    async fn navigate(&self, url: &str) -> Result<PageSnapshot, SourceError> {
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.6")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let html = response.text().await?;
        tracing::debug!(url, bytes = html.len(), "page fetched");

        Ok(PageSnapshot {
            title: extract_title(&html),
            text: visible_text(&html),
        })
    }
}
