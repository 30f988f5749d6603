//! Six-angle analysis of the extracted memes.
//!
//! All six completions share one compact summary of the records and run
//! concurrently; the stage returns only after every one has finished.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;

use memescope_core::{Dimension, InsightSet, MemeRecord, StageSettings};
use memescope_llm::{ChatMessage, Completion, GenerationParams};

use super::{load_upstream, truncate_chars, Stage};
use crate::artifacts::ArtifactStore;
use crate::error::PipelineError;

const SUMMARY_DESCRIPTION_CHARS: usize = 50;

const PERSONA: &str = "你是一位资深的互联网文化研究员和数据分析师。";

fn dimension_prompt(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Top10 => {
            "请从数据中挑选出最火的10个梗。
逐一分析它们的传播机制：为什么会火？利用了哪些心理？关键的传播节点是什么？
请用Markdown格式输出分析。"
        }
        Dimension::PlatformComparison => {
            "请对比微博、B站、抖音、小红书等平台的梗文化生态。
各平台产生的梗有什么不同？用户的互动方式有哪些差异？
请用Markdown格式输出分析。"
        }
        Dimension::PropagationPaths => {
            "请分析梗的跨平台传播路径。
一个梗通常如何从小圈子（如贴吧、B站）扩散到大众平台（抖音、微博）？
请结合数据中的例子说明，并用Markdown格式输出分析。"
        }
        Dimension::TimeTrends => {
            "请分析这些梗的时间趋势。
梗的生命周期是在变短还是变长？是否存在季节性或事件驱动的规律？
请用Markdown格式输出分析。"
        }
        Dimension::CulturalInsights => {
            "请给出深度的文化洞察。
这些梗反映了当代年轻人怎样的心理状态、价值观或社会焦虑？
可以结合发疯文学、躺平、电子榨菜等现象分析其背后的社会心理。
请用Markdown格式输出分析。"
        }
        Dimension::CommercialValue => {
            "请预测这些梗的商业价值。
品牌可以如何借势营销？哪些梗适合商业化，哪些存在风险？
请给出具体的营销建议，并用Markdown格式输出。"
        }
    }
}

/// One line per record: `"{name} ({platform}): {description[..50]}"`.
#[must_use]
pub fn summarize_memes(memes: &[MemeRecord]) -> Vec<String> {
    memes
        .iter()
        .map(|m| {
            format!(
                "{} ({}): {}",
                m.name,
                m.platform,
                truncate_chars(&m.description, SUMMARY_DESCRIPTION_CHARS)
            )
        })
        .collect()
}

pub struct Analyzer<C> {
    llm: Arc<C>,
    settings: StageSettings,
    store: ArtifactStore,
}

impl<C: Completion> Analyzer<C> {
    pub fn new(llm: Arc<C>, settings: StageSettings, store: ArtifactStore) -> Self {
        Self {
            llm,
            settings,
            store,
        }
    }

    /// Runs all six dimensions concurrently. A failed dimension is `""`.
    pub async fn analyze(&self, memes: &[MemeRecord]) -> InsightSet {
        let summary = serde_json::to_string(&summarize_memes(memes)).unwrap_or_else(|_| "[]".to_owned());
        let params = GenerationParams::from(&self.settings);

        let calls = Dimension::ALL.iter().map(|&dimension| {
            let messages = vec![
                ChatMessage::system(PERSONA),
                ChatMessage::user(format!(
                    "{}\n\n数据摘要：\n{summary}",
                    dimension_prompt(dimension)
                )),
            ];
            let llm = Arc::clone(&self.llm);
            let params = &params;
            async move {
                tracing::info!(stage = "analyzer", %dimension, "dimension started");
                let text = llm.complete(&messages, params).await;
                if text.trim().is_empty() {
                    tracing::warn!(stage = "analyzer", %dimension, "dimension produced no text");
                }
                (dimension, text)
            }
        });

        let mut insights = InsightSet::default();
        for (dimension, text) in join_all(calls).await {
            insights.set(dimension, text);
        }
        insights
    }
}

impl<C: Completion> Stage for Analyzer<C> {
    type Input = PathBuf;
    type Output = PathBuf;

    fn name(&self) -> &'static str {
        "analyzer"
    }

    async fn run(&self, memes_path: PathBuf) -> Result<PathBuf, PipelineError> {
        let memes: Vec<MemeRecord> = load_upstream(&self.store, self.name(), &memes_path).await?;
        tracing::info!(stage = self.name(), count = memes.len(), "analysis started");

        let insights = self.analyze(&memes).await;

        let path = self.store.insights_path();
        self.store.write_json(&path, &insights).await?;
        tracing::info!(
            stage = self.name(),
            filled = insights.filled(),
            path = %path.display(),
            "analysis finished"
        );
        Ok(path)
    }
}
