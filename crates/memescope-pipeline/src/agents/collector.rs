//! Gathers raw material for the plan from web search and trending boards.
//!
//! Each query and each target is attempted independently: one failure is
//! logged and the rest continue. Calls are sequential with a pause between
//! them to stay polite to the upstream services.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use memescope_core::{AppConfig, CrawlRecord, Plan, RawCollection, SearchDepth, SearchHit};
use memescope_sources::{target_url, PageNavigator, WebSearch};

use super::{truncate_chars, Stage};
use crate::artifacts::ArtifactStore;
use crate::error::PipelineError;

const SNIPPET_CHARS: usize = 5000;

/// Tuning for the collector's outbound calls.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub search_depth: SearchDepth,
    pub max_results: u32,
    pub search_delay: Duration,
    pub crawl_delay: Duration,
}

impl CollectorOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_depth: config.search_depth,
            max_results: config.search_max_results,
            search_delay: Duration::from_millis(config.search_delay_ms),
            crawl_delay: Duration::from_millis(config.browser_delay_ms),
        }
    }
}

/// A `None` service means the collector skips that half of collection.
pub struct Collector<S, N> {
    search: Option<S>,
    navigator: Option<N>,
    store: ArtifactStore,
    options: CollectorOptions,
}

impl<S: WebSearch, N: PageNavigator> Collector<S, N> {
    pub fn new(
        search: Option<S>,
        navigator: Option<N>,
        store: ArtifactStore,
        options: CollectorOptions,
    ) -> Self {
        Self {
            search,
            navigator,
            store,
            options,
        }
    }

    async fn run_searches(&self, queries: &[String]) -> Vec<SearchHit> {
        let Some(search) = &self.search else {
            tracing::warn!("no search API key configured; skipping web search");
            return Vec::new();
        };

        let mut hits = Vec::new();
        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.options.search_delay.is_zero() {
                tokio::time::sleep(self.options.search_delay).await;
            }
            match search
                .search(query, self.options.search_depth, self.options.max_results)
                .await
            {
                Ok(results) => {
                    tracing::info!(query = %query, count = results.len(), "search finished");
                    hits.extend(results.into_iter().map(|r| SearchHit {
                        title: r.title,
                        content: r.content,
                        url: r.url,
                        query: query.clone(),
                        source: "search".to_owned(),
                    }));
                }
                Err(e) => tracing::error!(query = %query, error = %e, "search failed"),
            }
        }
        hits
    }

    async fn run_crawls(&self, targets: &[String]) -> Vec<CrawlRecord> {
        let Some(navigator) = &self.navigator else {
            tracing::warn!("page navigation disabled; skipping trending boards");
            return Vec::new();
        };

        let mut records = Vec::new();
        let mut attempted = 0usize;
        for target in targets {
            let Some(url) = target_url(target) else {
                tracing::warn!(crawl_target = %target, "unknown crawl target; skipping");
                continue;
            };
            if attempted > 0 && !self.options.crawl_delay.is_zero() {
                tokio::time::sleep(self.options.crawl_delay).await;
            }
            attempted += 1;

            match navigator.navigate(url).await {
                Ok(page) => {
                    let snippet = truncate_chars(&page.text, SNIPPET_CHARS).replace('\n', " ");
                    tracing::info!(crawl_target = %target, url, chars = snippet.chars().count(), "page captured");
                    records.push(CrawlRecord {
                        source: "browser".to_owned(),
                        target: target.clone(),
                        url: url.to_owned(),
                        title: page.title,
                        content_snippet: snippet,
                        crawled_at: Utc::now(),
                    });
                }
                Err(e) => tracing::error!(crawl_target = %target, url, error = %e, "page capture failed"),
            }
        }
        records
    }
}

impl<S: WebSearch, N: PageNavigator> Stage for Collector<S, N> {
    type Input = Plan;
    type Output = PathBuf;

    fn name(&self) -> &'static str {
        "collector"
    }

    async fn run(&self, plan: Plan) -> Result<PathBuf, PipelineError> {
        tracing::info!(
            stage = self.name(),
            queries = plan.search_queries.len(),
            targets = plan.crawl_targets.len(),
            "collection started"
        );

        let search_results = self.run_searches(&plan.search_queries).await;
        let crawl_results = self.run_crawls(&plan.crawl_targets).await;

        let collection = RawCollection {
            search_results,
            crawl_results,
            timestamp: Utc::now(),
        };

        let path = self.store.raw_path();
        self.store.write_json(&path, &collection).await?;
        tracing::info!(
            stage = self.name(),
            search = collection.search_results.len(),
            crawl = collection.crawl_results.len(),
            path = %path.display(),
            "collection finished"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use memescope_core::{Intent, PlanOrigin, TimeRange};
    use memescope_sources::{PageSnapshot, SearchResult, SourceError};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeSearch {
        seen: Mutex<Vec<String>>,
    }

    impl WebSearch for FakeSearch {
        async fn search(
            &self,
            query: &str,
            _depth: SearchDepth,
            _max_results: u32,
        ) -> Result<Vec<SearchResult>, SourceError> {
            self.seen.lock().unwrap().push(query.to_owned());
            if query == "boom" {
                return Err(SourceError::UnexpectedStatus {
                    status: 500,
                    url: "http://search".to_owned(),
                });
            }
            Ok(vec![SearchResult {
                title: format!("title for {query}"),
                content: "content".to_owned(),
                url: "https://example.com".to_owned(),
            }])
        }
    }

    #[derive(Default)]
    struct FakeNavigator {
        visited: Mutex<Vec<String>>,
    }

    impl PageNavigator for FakeNavigator {
        async fn navigate(&self, url: &str) -> Result<PageSnapshot, SourceError> {
            self.visited.lock().unwrap().push(url.to_owned());
            Ok(PageSnapshot {
                title: "热榜".to_owned(),
                text: format!("第一行\n第二行\n{}", "长".repeat(6000)),
            })
        }
    }

    fn options() -> CollectorOptions {
        CollectorOptions {
            search_depth: SearchDepth::Advanced,
            max_results: 10,
            search_delay: Duration::ZERO,
            crawl_delay: Duration::ZERO,
        }
    }

    fn plan(queries: &[&str], targets: &[&str]) -> Plan {
        Plan {
            intent: Intent::ContentAnalysis,
            search_queries: queries.iter().map(|s| (*s).to_owned()).collect(),
            crawl_targets: targets.iter().map(|s| (*s).to_owned()).collect(),
            time_range: TimeRange::full_year("2025"),
            origin: PlanOrigin::Fallback,
            created_at: Utc::now(),
            user_input: String::new(),
            keywords: Vec::new(),
            platforms: Vec::new(),
        }
    }

    async fn store(tmp: &TempDir) -> ArtifactStore {
        let s = ArtifactStore::new(tmp.path().join("data"), tmp.path().join("reports"));
        s.ensure_dirs().await.unwrap();
        s
    }

    #[tokio::test]
    async fn failed_query_does_not_stop_the_rest() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let collector: Collector<FakeSearch, FakeNavigator> =
            Collector::new(Some(FakeSearch::default()), None, store.clone(), options());

        let path = collector
            .run(plan(&["a", "boom", "c"], &[]))
            .await
            .unwrap();
        let raw: RawCollection = store.read_json(&path).await.unwrap().unwrap();

        let queries: Vec<&str> = raw.search_results.iter().map(|h| h.query.as_str()).collect();
        assert_eq!(queries, vec!["a", "c"]);
        assert!(raw.search_results.iter().all(|h| h.source == "search"));
        assert!(raw.crawl_results.is_empty());
    }

    #[tokio::test]
    async fn unknown_targets_are_skipped_and_snippets_flattened() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let nav = FakeNavigator::default();
        let collector: Collector<FakeSearch, FakeNavigator> =
            Collector::new(None, Some(nav), store.clone(), options());

        let path = collector
            .run(plan(&["ignored"], &["小红书", "微博", "知乎热榜"]))
            .await
            .unwrap();
        let raw: RawCollection = store.read_json(&path).await.unwrap().unwrap();

        assert!(raw.search_results.is_empty());
        assert_eq!(raw.crawl_results.len(), 2);
        assert_eq!(raw.crawl_results[0].target, "微博");
        assert_eq!(raw.crawl_results[0].url, "https://s.weibo.com/top/summary");
        assert_eq!(raw.crawl_results[1].url, "https://www.zhihu.com/billboard");

        let snippet = &raw.crawl_results[0].content_snippet;
        assert_eq!(snippet.chars().count(), SNIPPET_CHARS);
        assert!(!snippet.contains('\n'));
        assert!(snippet.starts_with("第一行 第二行 "));
        assert_eq!(raw.crawl_results[0].source, "browser");
    }

    #[tokio::test]
    async fn without_services_the_artifact_is_still_written() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let collector: Collector<FakeSearch, FakeNavigator> =
            Collector::new(None, None, store.clone(), options());

        let path = collector
            .run(plan(&["q"], &["微博热搜"]))
            .await
            .unwrap();
        assert_eq!(path, store.raw_path());
        let raw: RawCollection = store.read_json(&path).await.unwrap().unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_separate_successive_queries_only() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        let opts = CollectorOptions {
            search_delay: Duration::from_secs(1),
            ..options()
        };
        let collector: Collector<FakeSearch, FakeNavigator> =
            Collector::new(Some(FakeSearch::default()), None, store, opts);

        let started = tokio::time::Instant::now();
        collector.run(plan(&["a", "b", "c"], &[])).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }
}
