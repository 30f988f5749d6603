//! Drives the five stages in order for one request.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use memescope_core::{AppConfig, MemeRecord, PipelineSettings, Plan};
use memescope_llm::{ClientSettings, Completion, CompletionClient};
use memescope_sources::{HttpNavigator, PageNavigator, TavilyClient, WebSearch};

use crate::agents::{Analyzer, Collector, CollectorOptions, Extractor, Planner, Stage, Writer};
use crate::artifacts::ArtifactStore;
use crate::error::PipelineError;

/// What one run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub plan: Plan,
    pub raw_path: PathBuf,
    pub memes_path: PathBuf,
    pub meme_count: usize,
    pub insights_path: PathBuf,
    pub report_path: PathBuf,
}

/// The pipeline wired to the real HTTP clients.
pub type LiveOrchestrator = Orchestrator<CompletionClient, TavilyClient, HttpNavigator>;

pub struct Orchestrator<C, S, N> {
    planner: Planner<C>,
    collector: Collector<S, N>,
    extractor: Extractor<C>,
    analyzer: Analyzer<C>,
    writer: Writer<C>,
    store: ArtifactStore,
}

impl LiveOrchestrator {
    /// Builds the production pipeline from configuration.
    ///
    /// Missing credentials disable the corresponding client rather than
    /// failing; the page navigator is only built when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Llm`] or [`PipelineError::Source`] if an HTTP
    /// client cannot be constructed or a base URL is invalid.
    pub fn live(config: &AppConfig, settings: &PipelineSettings) -> Result<Self, PipelineError> {
        let llm = Arc::new(CompletionClient::new(&ClientSettings::from_app_config(
            config,
        ))?);

        let search = match config.search_api_key.as_deref() {
            Some(key) => Some(TavilyClient::new(
                key,
                &config.search_base_url,
                config.search_timeout_secs,
            )?),
            None => {
                tracing::warn!("TAVILY_API_KEY not set; web search disabled");
                None
            }
        };

        let navigator = if config.browser_enabled {
            Some(HttpNavigator::new(
                &config.user_agent,
                config.browser_timeout_secs,
            )?)
        } else {
            tracing::info!("page navigation disabled (set MEMESCOPE_BROWSER_ENABLED=true to enable)");
            None
        };

        let store = ArtifactStore::new(&config.data_dir, &config.reports_dir);
        Ok(Self::new(
            llm,
            search,
            navigator,
            store,
            settings,
            CollectorOptions::from_app_config(config),
        ))
    }
}

impl<C, S, N> Orchestrator<C, S, N>
where
    C: Completion,
    S: WebSearch,
    N: PageNavigator,
{
    /// Wires the stages around shared collaborators.
    pub fn new(
        llm: Arc<C>,
        search: Option<S>,
        navigator: Option<N>,
        store: ArtifactStore,
        settings: &PipelineSettings,
        collector_options: CollectorOptions,
    ) -> Self {
        Self {
            planner: Planner::new(Arc::clone(&llm), settings.planner.clone()),
            collector: Collector::new(search, navigator, store.clone(), collector_options),
            extractor: Extractor::new(Arc::clone(&llm), settings.extractor.clone(), store.clone()),
            analyzer: Analyzer::new(Arc::clone(&llm), settings.analyzer.clone(), store.clone()),
            writer: Writer::new(llm, settings.writer.clone(), store.clone()),
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Runs only the planning stage.
    ///
    /// # Errors
    ///
    /// Planning itself never fails; the `Result` mirrors [`Stage::run`].
    pub async fn plan(&self, request: &str) -> Result<Plan, PipelineError> {
        self.planner.run(request.to_owned()).await
    }

    /// Runs all five stages strictly in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised at a stage boundary. Remote
    /// failures never abort a run.
    pub async fn run(&self, request: &str) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id);
        self.run_stages(run_id, request).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid, request: &str) -> Result<RunSummary, PipelineError> {
        tracing::info!(request, "pipeline started");
        self.store.ensure_dirs().await?;

        let plan = self.planner.run(request.to_owned()).await?;
        tracing::info!(
            stage = self.planner.name(),
            intent = %plan.intent,
            origin = %plan.origin,
            queries = plan.search_queries.len(),
            targets = plan.crawl_targets.len(),
            "stage 1/5 done"
        );

        let raw_path = self.collector.run(plan.clone()).await?;
        tracing::info!(stage = self.collector.name(), path = %raw_path.display(), "stage 2/5 done");

        let memes_path = self.extractor.run(raw_path.clone()).await?;
        let meme_count = self
            .store
            .read_json::<Vec<MemeRecord>>(&memes_path)
            .await?
            .map_or(0, |memes| memes.len());
        tracing::info!(stage = self.extractor.name(), count = meme_count, "stage 3/5 done");

        let insights_path = self.analyzer.run(memes_path.clone()).await?;
        tracing::info!(stage = self.analyzer.name(), path = %insights_path.display(), "stage 4/5 done");

        let report_path = self.writer.run(insights_path.clone()).await?;
        tracing::info!(stage = self.writer.name(), path = %report_path.display(), "stage 5/5 done");

        Ok(RunSummary {
            run_id,
            plan,
            raw_path,
            memes_path,
            meme_count,
            insights_path,
            report_path,
        })
    }
}
