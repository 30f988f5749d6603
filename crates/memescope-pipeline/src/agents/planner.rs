//! Turns the user's request into a [`Plan`].

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use memescope_core::{Intent, Plan, PlanOrigin, StageSettings, TimeRange};
use memescope_llm::{extract_as, ChatMessage, Completion, GenerationParams, Shape};

use super::Stage;
use crate::error::PipelineError;

const DEFAULT_YEAR: &str = "2025";

const COMPARISON_KEYWORDS: &[&str] = &["对比", "比较", "compare", "versus", "vs"];
const TREND_KEYWORDS: &[&str] = &["趋势", "变化", "trend"];

const FALLBACK_TARGETS: &[&str] = &["微博热搜", "知乎热榜", "B站热门"];
const FALLBACK_KEYWORDS: &[&str] = &["热梗", "网络流行语", "表情包", "meme"];
const FALLBACK_PLATFORMS: &[&str] = &["小红书", "微博", "知乎", "B站"];

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"20\d{2}").expect("valid year regex"));

const SYSTEM_PROMPT: &str = "你是一名数据分析规划专家，负责把用户的分析需求拆解成可执行的采集计划。

只输出一个JSON对象，字段如下：
1. intent：用户意图，取值 trend_analysis / content_analysis / comparison 之一
2. search_queries：网络搜索关键词列表，用于获取媒体报道和背景资料，例如 [\"2025微博热梗\", \"B站梗文化\"]
3. crawl_targets：需要抓取的实时热榜列表，例如 [\"微博热搜\", \"知乎热榜\", \"B站热门\"]
4. time_range：可选，形如 {\"start\": \"2025-01\", \"end\": \"2025-12\"}

要求：
- 用户未说明年份时默认2025年
- search_queries 应覆盖多个维度
- crawl_targets 应覆盖主流社交平台的热榜";

/// The model's answer. Every field is optional and loosely typed so that one
/// `null` or mistyped field only loses that field; gaps are filled from the
/// deterministic plan.
#[derive(Debug, Default, Deserialize)]
struct PlanReply {
    #[serde(default)]
    intent: Option<Value>,
    #[serde(default, alias = "tavily_queries")]
    search_queries: Option<Value>,
    #[serde(default, alias = "playwright_targets")]
    crawl_targets: Option<Value>,
    #[serde(default)]
    time_range: Option<Value>,
}

pub struct Planner<C> {
    llm: Arc<C>,
    settings: StageSettings,
}

impl<C: Completion> Planner<C> {
    pub fn new(llm: Arc<C>, settings: StageSettings) -> Self {
        Self { llm, settings }
    }

    fn messages(request: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "请分析下面的用户需求并生成执行计划：\n\n用户输入：\"{request}\"\n\n请输出完整的JSON执行计划。"
            )),
        ]
    }
}

impl<C: Completion> Stage for Planner<C> {
    type Input = String;
    type Output = Plan;

    fn name(&self) -> &'static str {
        "planner"
    }

    async fn run(&self, request: String) -> Result<Plan, PipelineError> {
        let fallback = fallback_plan(&request, Utc::now());

        let response = self
            .llm
            .complete(
                &Self::messages(&request),
                &GenerationParams::from(&self.settings),
            )
            .await;

        if response.trim().is_empty() {
            tracing::warn!(stage = self.name(), "no model plan; using fallback planner");
            return Ok(fallback);
        }

        match extract_as::<PlanReply>(&response, Shape::Object) {
            Ok(reply) => {
                let plan = merge_reply(reply, fallback);
                tracing::info!(
                    stage = self.name(),
                    intent = %plan.intent,
                    queries = plan.search_queries.len(),
                    targets = plan.crawl_targets.len(),
                    "model plan accepted"
                );
                Ok(plan)
            }
            Err(e) => {
                tracing::warn!(stage = self.name(), error = %e, "model plan unparseable; using fallback planner");
                Ok(fallback)
            }
        }
    }
}

fn merge_reply(reply: PlanReply, fallback: Plan) -> Plan {
    let intent = reply
        .intent
        .as_ref()
        .and_then(Value::as_str)
        .and_then(Intent::from_wire)
        .unwrap_or(fallback.intent);

    let search_queries = non_empty_or(string_list(reply.search_queries), fallback.search_queries);
    let crawl_targets = non_empty_or(string_list(reply.crawl_targets), fallback.crawl_targets);

    let time_range = reply
        .time_range
        .and_then(|v| serde_json::from_value::<TimeRange>(v).ok())
        .filter(|r| !r.start.trim().is_empty() && !r.end.trim().is_empty())
        .unwrap_or(fallback.time_range);

    Plan {
        intent,
        search_queries,
        crawl_targets,
        time_range,
        origin: PlanOrigin::Llm,
        ..fallback
    }
}

fn string_list(value: Option<Value>) -> Vec<String> {
    let Some(Value::Array(values)) = value else {
        return Vec::new();
    };
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_owned()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_or(primary: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    if primary.is_empty() {
        fallback
    } else {
        primary
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Deterministic plan derived from the request text alone.
///
/// The year is the first `20xx` in the request, defaulting to 2025.
#[must_use]
pub fn fallback_plan(request: &str, now: DateTime<Utc>) -> Plan {
    let year = YEAR_RE
        .find(request)
        .map_or(DEFAULT_YEAR, |m| m.as_str());

    let lowered = request.to_lowercase();
    let intent = if COMPARISON_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Intent::Comparison
    } else if TREND_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Intent::TrendAnalysis
    } else {
        Intent::ContentAnalysis
    };

    Plan {
        intent,
        search_queries: vec![
            format!("{year}网络热梗流行语"),
            format!("{year}十大热梗"),
            format!("{year}梗文化趋势"),
            format!("{year} social media trends china"),
        ],
        crawl_targets: owned(FALLBACK_TARGETS),
        time_range: TimeRange::full_year(year),
        origin: PlanOrigin::Fallback,
        created_at: now,
        user_input: request.to_owned(),
        keywords: owned(FALLBACK_KEYWORDS),
        platforms: owned(FALLBACK_PLATFORMS),
    }
}
