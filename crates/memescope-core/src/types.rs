use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// What kind of analysis the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    TrendAnalysis,
    ContentAnalysis,
    Comparison,
}

impl Intent {
    /// Parse the wire name, tolerating case and surrounding whitespace.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trend_analysis" => Some(Intent::TrendAnalysis),
            "content_analysis" => Some(Intent::ContentAnalysis),
            "comparison" => Some(Intent::Comparison),
            _ => None,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::TrendAnalysis => write!(f, "trend_analysis"),
            Intent::ContentAnalysis => write!(f, "content_analysis"),
            Intent::Comparison => write!(f, "comparison"),
        }
    }
}

/// Whether the plan came from the model or the deterministic planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanOrigin {
    Llm,
    Fallback,
}

impl std::fmt::Display for PlanOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanOrigin::Llm => write!(f, "llm"),
            PlanOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// Inclusive `YYYY-MM` bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    /// January through December of `year`.
    #[must_use]
    pub fn full_year(year: &str) -> Self {
        Self {
            start: format!("{year}-01"),
            end: format!("{year}-12"),
        }
    }
}

/// Execution plan produced by the planner stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    #[serde(alias = "tavily_queries")]
    pub search_queries: Vec<String>,
    #[serde(alias = "playwright_targets")]
    pub crawl_targets: Vec<String>,
    pub time_range: TimeRange,
    pub origin: PlanOrigin,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_input: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// One web-search result, tagged with the query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    pub query: String,
    pub source: String,
}

/// Visible text captured from one navigated page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub source: String,
    pub target: String,
    pub url: String,
    pub title: String,
    pub content_snippet: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub crawled_at: DateTime<Utc>,
}

/// Everything the collector gathered in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCollection {
    #[serde(default, alias = "tavily_results")]
    pub search_results: Vec<SearchHit>,
    #[serde(default, alias = "playwright_results")]
    pub crawl_results: Vec<CrawlRecord>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Accepts RFC 3339 timestamps and offset-less ISO timestamps, which are
/// taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
}

impl RawCollection {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            search_results: Vec::new(),
            crawl_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_results.is_empty() && self.crawl_results.is_empty()
    }
}

impl Default for RawCollection {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single meme as extracted from the raw collection.
///
/// Names are not unique: near-duplicate memes from different sources are
/// kept as separate records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeRecord {
    pub name: String,
    pub platform: String,
    #[serde(rename = "heat", alias = "heat_description")]
    pub heat_description: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl MemeRecord {
    /// Drop repeated tags, keeping the first occurrence of each.
    pub fn dedup_tags(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|tag| seen.insert(tag.clone()));
    }
}

/// The six fixed analytical angles, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Top10,
    PlatformComparison,
    PropagationPaths,
    TimeTrends,
    CulturalInsights,
    CommercialValue,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Top10,
        Dimension::PlatformComparison,
        Dimension::PropagationPaths,
        Dimension::TimeTrends,
        Dimension::CulturalInsights,
        Dimension::CommercialValue,
    ];

    /// Key used in the persisted insight map.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Top10 => "top_10_analysis",
            Dimension::PlatformComparison => "platform_comparison",
            Dimension::PropagationPaths => "propagation_paths",
            Dimension::TimeTrends => "time_trends",
            Dimension::CulturalInsights => "cultural_insights",
            Dimension::CommercialValue => "commercial_value",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Markdown analysis per dimension. Absent keys read back as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSet {
    pub top_10_analysis: String,
    pub platform_comparison: String,
    pub propagation_paths: String,
    pub time_trends: String,
    pub cultural_insights: String,
    pub commercial_value: String,
}

impl InsightSet {
    #[must_use]
    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Top10 => &self.top_10_analysis,
            Dimension::PlatformComparison => &self.platform_comparison,
            Dimension::PropagationPaths => &self.propagation_paths,
            Dimension::TimeTrends => &self.time_trends,
            Dimension::CulturalInsights => &self.cultural_insights,
            Dimension::CommercialValue => &self.commercial_value,
        }
    }

    pub fn set(&mut self, dimension: Dimension, text: String) {
        let slot = match dimension {
            Dimension::Top10 => &mut self.top_10_analysis,
            Dimension::PlatformComparison => &mut self.platform_comparison,
            Dimension::PropagationPaths => &mut self.propagation_paths,
            Dimension::TimeTrends => &mut self.time_trends,
            Dimension::CulturalInsights => &mut self.cultural_insights,
            Dimension::CommercialValue => &mut self.commercial_value,
        };
        *slot = text;
    }

    /// Number of dimensions with non-blank text.
    #[must_use]
    pub fn filled(&self) -> usize {
        Dimension::ALL
            .iter()
            .filter(|d| !self.get(**d).trim().is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_written_with_legacy_keys_and_naive_timestamps_decodes() {
        let json = r#"{
  "tavily_results": [
    {"title": "2025年度十大网络流行语", "url": "https://example.com/a", "content": "City不City", "score": 0.91, "raw_content": null, "query": "2025十大热梗", "source": "tavily"}
  ],
  "playwright_results": [
    {"source": "playwright", "target": "微博热搜", "url": "https://s.weibo.com/top/summary", "title": "微博热搜", "content_snippet": "1 某某梗 2 另一个梗", "crawled_at": "2025-03-01T12:30:45.123456"}
  ],
  "timestamp": "2025-03-01T12:30:40.654321"
}"#;
        let raw: RawCollection = serde_json::from_str(json).unwrap();

        assert_eq!(raw.search_results.len(), 1);
        assert_eq!(raw.search_results[0].query, "2025十大热梗");
        assert_eq!(raw.crawl_results.len(), 1);
        assert_eq!(raw.crawl_results[0].target, "微博热搜");
        assert_eq!(
            raw.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2025-03-01 12:30:40"
        );
    }

    #[test]
    fn offset_timestamps_are_normalized_to_utc() {
        let json = r#"{"timestamp": "2025-03-01T20:00:00+08:00"}"#;
        let raw: RawCollection = serde_json::from_str(json).unwrap();
        assert_eq!(raw.timestamp.format("%H:%M").to_string(), "12:00");
        assert!(raw.is_empty());

        assert!(serde_json::from_str::<RawCollection>(r#"{"timestamp": "yesterday"}"#).is_err());
    }

    #[test]
    fn intent_serializes_snake_case() {
        let json = serde_json::to_string(&Intent::TrendAnalysis).unwrap();
        assert_eq!(json, "\"trend_analysis\"");
    }

    #[test]
    fn intent_from_wire_tolerates_case() {
        assert_eq!(Intent::from_wire(" Comparison "), Some(Intent::Comparison));
        assert_eq!(Intent::from_wire("summary"), None);
    }

    #[test]
    fn plan_accepts_legacy_field_names() {
        let json = serde_json::json!({
            "intent": "content_analysis",
            "tavily_queries": ["2025十大热梗"],
            "playwright_targets": ["微博热搜"],
            "time_range": {"start": "2025-01", "end": "2025-12"},
            "origin": "llm",
            "created_at": "2025-06-01T00:00:00Z"
        });
        let plan: Plan = serde_json::from_value(json).unwrap();
        assert_eq!(plan.search_queries, vec!["2025十大热梗"]);
        assert_eq!(plan.crawl_targets, vec!["微博热搜"]);
        assert!(plan.keywords.is_empty());
    }

    #[test]
    fn meme_record_uses_heat_on_the_wire() {
        let meme = MemeRecord {
            name: "摆烂".to_string(),
            platform: "微博".to_string(),
            heat_description: "高".to_string(),
            description: "...".to_string(),
            tags: vec!["情绪".to_string()],
        };
        let value = serde_json::to_value(&meme).unwrap();
        assert_eq!(value["heat"], "高");
        assert!(value.get("heat_description").is_none());
    }

    #[test]
    fn dedup_tags_preserves_first_seen_order() {
        let mut meme = MemeRecord {
            name: "a".to_string(),
            platform: String::new(),
            heat_description: String::new(),
            description: String::new(),
            tags: vec!["x".into(), "y".into(), "x".into(), "z".into(), "y".into()],
        };
        meme.dedup_tags();
        assert_eq!(meme.tags, vec!["x", "y", "z"]);
    }

    #[test]
    fn insight_set_has_six_fixed_keys() {
        let value = serde_json::to_value(InsightSet::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 6);
        for d in Dimension::ALL {
            assert!(obj.contains_key(d.key()), "missing key {}", d.key());
        }
    }

    #[test]
    fn insight_set_missing_keys_read_as_empty() {
        let set: InsightSet =
            serde_json::from_str(r#"{"time_trends": "shorter cycles"}"#).unwrap();
        assert_eq!(set.get(Dimension::TimeTrends), "shorter cycles");
        assert_eq!(set.get(Dimension::Top10), "");
        assert_eq!(set.filled(), 1);
    }

    #[test]
    fn insight_set_set_and_get_round_trip_each_dimension() {
        let mut set = InsightSet::default();
        for d in Dimension::ALL {
            set.set(d, format!("text for {d}"));
        }
        for d in Dimension::ALL {
            assert_eq!(set.get(d), format!("text for {d}"));
        }
        assert_eq!(set.filled(), 6);
    }

    #[test]
    fn empty_raw_collection_reports_empty() {
        assert!(RawCollection::empty().is_empty());
    }
}
