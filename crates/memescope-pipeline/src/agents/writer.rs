//! Composes the final Markdown report from the six insights.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use memescope_core::{Dimension, InsightSet, StageSettings};
use memescope_llm::{ChatMessage, Completion, GenerationParams};

use super::{load_upstream, Stage};
use crate::artifacts::ArtifactStore;
use crate::error::PipelineError;

const SYSTEM_PROMPT: &str = "你是一名专业的商业分析师和内容创作者。
请基于提供的分析素材，撰写一份高质量的《网络热梗深度分析报告》。
报告要求逻辑清晰、见解深刻，篇幅约4000-6000字。

报告结构：
1. # 执行摘要 (Executive Summary)
   - 核心发现
   - 关键趋势
2. # 年度热门梗Top10深度解析
   - 逐一分析每个梗的起因、经过与结果
3. # 平台生态全景对比
   - 微博 vs B站 vs 抖音 vs 小红书
4. # 跨平台传播机制解密
   - 传播路径图谱
   - 关键节点分析
5. # 未来趋势预测
   - 梗文化的发展方向
6. # 商业化与实用建议
   - 对品牌方的建议
   - 对内容创作者的建议";

fn label(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Top10 => "Top 10分析",
        Dimension::PlatformComparison => "平台对比",
        Dimension::PropagationPaths => "传播路径",
        Dimension::TimeTrends => "时间趋势",
        Dimension::CulturalInsights => "文化洞察",
        Dimension::CommercialValue => "商业价值",
    }
}

/// `【label】: text` per dimension, in fixed order.
fn context_block(insights: &InsightSet) -> String {
    Dimension::ALL
        .iter()
        .map(|&d| format!("【{}】: {}", label(d), insights.get(d)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Writer<C> {
    llm: Arc<C>,
    settings: StageSettings,
    store: ArtifactStore,
    today: fn() -> NaiveDate,
}

impl<C: Completion> Writer<C> {
    pub fn new(llm: Arc<C>, settings: StageSettings, store: ArtifactStore) -> Self {
        Self {
            llm,
            settings,
            store,
            today: || Local::now().date_naive(),
        }
    }

    /// Overrides the date used to name the report file.
    #[must_use]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }
}

impl<C: Completion> Stage for Writer<C> {
    type Input = PathBuf;
    type Output = PathBuf;

    fn name(&self) -> &'static str {
        "writer"
    }

    async fn run(&self, insights_path: PathBuf) -> Result<PathBuf, PipelineError> {
        let insights: InsightSet = load_upstream(&self.store, self.name(), &insights_path).await?;

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "请根据以下素材撰写完整报告：\n\n{}\n\n请直接输出Markdown格式的报告正文。",
                context_block(&insights)
            )),
        ];
        let report = self
            .llm
            .complete(&messages, &GenerationParams::from(&self.settings))
            .await;
        if report.trim().is_empty() {
            tracing::warn!(stage = self.name(), "no report text generated; writing an empty report");
        }

        let path = self.store.report_path((self.today)());
        self.store.write_text(&path, &report).await?;
        tracing::info!(stage = self.name(), chars = report.chars().count(), path = %path.display(), "report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        prompt: Mutex<String>,
    }

    impl Completion for Recorder {
        async fn complete(&self, messages: &[ChatMessage], _: &GenerationParams) -> String {
            *self.prompt.lock().unwrap() = messages[1].content.clone();
            "# 执行摘要\n\n内容".to_owned()
        }
    }

    fn settings() -> StageSettings {
        StageSettings {
            model: "deepseek-chat".to_owned(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
    }

    #[test]
    fn context_lists_all_six_labels_in_order() {
        let mut insights = InsightSet::default();
        insights.set(Dimension::TimeTrends, "变短了".to_owned());
        let block = context_block(&insights);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "【Top 10分析】: ");
        assert_eq!(lines[3], "【时间趋势】: 变短了");
        assert_eq!(lines[5], "【商业价值】: ");
    }

    #[tokio::test]
    async fn report_is_written_under_dated_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("data"), tmp.path().join("reports"));
        store.ensure_dirs().await.unwrap();
        let mut insights = InsightSet::default();
        insights.set(Dimension::Top10, "摆烂位列第一".to_owned());
        store.write_json(&store.insights_path(), &insights).await.unwrap();

        let llm = Arc::new(Recorder::default());
        let writer = Writer::new(Arc::clone(&llm), settings(), store.clone()).with_clock(fixed_day);
        let path = writer.run(store.insights_path()).await.unwrap();

        assert_eq!(path, tmp.path().join("reports/report_20251231.md"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# 执行摘要\n\n内容");
        assert!(llm.prompt.lock().unwrap().contains("【Top 10分析】: 摆烂位列第一"));
    }
}
