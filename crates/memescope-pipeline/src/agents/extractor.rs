//! Distills the raw collection into structured [`MemeRecord`]s.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use memescope_core::{MemeRecord, RawCollection, StageSettings};
use memescope_llm::{extract_json, ChatMessage, Completion, GenerationParams, Shape};

use super::{load_upstream, truncate_chars, Stage};
use crate::artifacts::ArtifactStore;
use crate::error::PipelineError;

const CONTEXT_ITEMS: usize = 5;
const SEARCH_CONTENT_CHARS: usize = 1000;
const CRAWL_SNIPPET_CHARS: usize = 800;

const FALLBACK_LIMIT: usize = 10;
const FALLBACK_NAME_CHARS: usize = 20;
const FALLBACK_DESCRIPTION_CHARS: usize = 100;
const FALLBACK_HEAT: &str = "未知";
const FALLBACK_TAGS: [&str; 2] = ["自动提取", "备选方案"];

const SYSTEM_PROMPT: &str = "你是一名数据结构化专家，擅长从零散的搜索结果和网页抓取内容中整理出清晰的“网络热梗”条目。

每个条目包含以下字段：
1. name：梗的名称或流行语
2. platform：主要来源或流行平台
3. heat：热度或流行程度描述
4. description：详细说明（含义、用法、出处）
5. tags：标签列表

只返回标准JSON数组。";

pub struct Extractor<C> {
    llm: Arc<C>,
    settings: StageSettings,
    store: ArtifactStore,
}

impl<C: Completion> Extractor<C> {
    pub fn new(llm: Arc<C>, settings: StageSettings, store: ArtifactStore) -> Self {
        Self {
            llm,
            settings,
            store,
        }
    }

    /// Runs the model over `raw`, falling back to [`fallback_memes`] when the
    /// model yields nothing usable.
    pub async fn extract(&self, raw: &RawCollection) -> Vec<MemeRecord> {
        let response = self
            .llm
            .complete(
                &prompt_messages(raw),
                &GenerationParams::from(&self.settings),
            )
            .await;

        let memes = if response.trim().is_empty() {
            Vec::new()
        } else {
            match extract_json(&response, Shape::Array) {
                Ok(value) => normalize_records(value),
                Err(e) => {
                    tracing::warn!(stage = "extractor", error = %e, "model output has no meme array");
                    Vec::new()
                }
            }
        };

        if memes.is_empty() {
            tracing::warn!(stage = "extractor", "model extraction empty; using fallback extraction");
            return fallback_memes(raw);
        }
        memes
    }
}

impl<C: Completion> Stage for Extractor<C> {
    type Input = PathBuf;
    type Output = PathBuf;

    fn name(&self) -> &'static str {
        "extractor"
    }

    async fn run(&self, raw_path: PathBuf) -> Result<PathBuf, PipelineError> {
        let raw: RawCollection = load_upstream(&self.store, self.name(), &raw_path).await?;
        let memes = self.extract(&raw).await;

        let path = self.store.memes_path();
        self.store.write_json(&path, &memes).await?;
        tracing::info!(stage = self.name(), count = memes.len(), path = %path.display(), "extraction finished");
        Ok(path)
    }
}

fn prompt_messages(raw: &RawCollection) -> Vec<ChatMessage> {
    let media: Vec<Value> = raw
        .search_results
        .iter()
        .take(CONTEXT_ITEMS)
        .map(|hit| {
            json!({
                "title": hit.title,
                "content": truncate_chars(&hit.content, SEARCH_CONTENT_CHARS),
                "source": hit.source,
            })
        })
        .collect();

    let realtime: Vec<Value> = raw
        .crawl_results
        .iter()
        .take(CONTEXT_ITEMS)
        .map(|rec| {
            json!({
                "source": rec.source,
                "target": rec.target,
                "content_snippet": truncate_chars(&rec.content_snippet, CRAWL_SNIPPET_CHARS),
            })
        })
        .collect();

    let context = json!({ "media_reports": media, "realtime_data": realtime });
    let context = serde_json::to_string_pretty(&context).unwrap_or_else(|_| context.to_string());

    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "以下是采集到的多源数据：\n{context}\n\n请从中提取所有能识别出的热梗（目标25-40条），返回如下格式的JSON数组：\n[\n  {{\n    \"name\": \"梗名称\",\n    \"platform\": \"平台\",\n    \"heat\": \"热度描述\",\n    \"description\": \"描述\",\n    \"tags\": [\"标签1\", \"标签2\"]\n  }}\n]"
        )),
    ]
}

/// Lenient per-element conversion: non-objects are dropped, missing or
/// non-string fields become `""`, non-array tags become `[]`.
fn normalize_records(value: Value) -> Vec<MemeRecord> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let Value::Object(map) = item else {
                return None;
            };
            let text = |key: &str| -> String {
                map.get(key)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_owned())
                    .unwrap_or_default()
            };
            let heat = map
                .get("heat")
                .or_else(|| map.get("heat_description"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_owned())
                .unwrap_or_default();
            let tags: Vec<String> = map
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();

            let mut record = MemeRecord {
                name: text("name"),
                platform: text("platform"),
                heat_description: heat,
                description: text("description"),
                tags,
            };
            record.dedup_tags();
            Some(record)
        })
        .collect()
}

/// Deterministic records sliced out of the raw collection, at most ten.
///
/// Crawl records come first and are named after the first line of their
/// snippet; search hits follow and are named after their title.
#[must_use]
pub fn fallback_memes(raw: &RawCollection) -> Vec<MemeRecord> {
    let tags = || -> Vec<String> { FALLBACK_TAGS.iter().map(|t| (*t).to_owned()).collect() };

    let from_crawl = raw
        .crawl_results
        .iter()
        .filter(|rec| !rec.content_snippet.is_empty())
        .map(|rec| {
            let first_line = rec.content_snippet.lines().next().unwrap_or_default();
            MemeRecord {
                name: truncate_chars(first_line, FALLBACK_NAME_CHARS),
                platform: rec.source.clone(),
                heat_description: FALLBACK_HEAT.to_owned(),
                description: truncate_chars(&rec.content_snippet, FALLBACK_DESCRIPTION_CHARS),
                tags: tags(),
            }
        });

    let from_search = raw.search_results.iter().map(|hit| {
        let title = if hit.title.trim().is_empty() {
            "未知"
        } else {
            hit.title.as_str()
        };
        MemeRecord {
            name: truncate_chars(title, FALLBACK_NAME_CHARS),
            platform: "media".to_owned(),
            heat_description: FALLBACK_HEAT.to_owned(),
            description: truncate_chars(&hit.content, FALLBACK_DESCRIPTION_CHARS),
            tags: tags(),
        }
    });

    from_crawl.chain(from_search).take(FALLBACK_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use memescope_core::{CrawlRecord, SearchHit};

    fn hit(title: &str, content: &str) -> SearchHit {
        SearchHit {
            title: title.to_owned(),
            content: content.to_owned(),
            url: String::new(),
            query: "q".to_owned(),
            source: "search".to_owned(),
        }
    }

    fn crawl(snippet: &str) -> CrawlRecord {
        CrawlRecord {
            source: "browser".to_owned(),
            target: "微博热搜".to_owned(),
            url: "https://s.weibo.com/top/summary".to_owned(),
            title: "微博热搜".to_owned(),
            content_snippet: snippet.to_owned(),
            crawled_at: Utc::now(),
        }
    }

    #[test]
    fn fallback_of_empty_collection_is_empty() {
        assert!(fallback_memes(&RawCollection::empty()).is_empty());
    }

    #[test]
    fn fallback_prefers_crawl_records_then_search_hits() {
        let raw = RawCollection {
            search_results: vec![hit("2025年度十大网络流行语盘点与解读合集", "正文")],
            crawl_results: vec![crawl("City不City 热度 120万 第二条"), crawl("")],
            timestamp: Utc::now(),
        };
        let memes = fallback_memes(&raw);

        assert_eq!(memes.len(), 2);
        assert_eq!(memes[0].name, "City不City 热度 120万 第二");
        assert_eq!(memes[0].platform, "browser");
        assert_eq!(memes[1].name, "2025年度十大网络流行语盘点与解读合集");
        assert_eq!(memes[1].platform, "media");
        for m in &memes {
            assert_eq!(m.heat_description, "未知");
            assert_eq!(m.tags, vec!["自动提取", "备选方案"]);
        }
    }

    #[test]
    fn fallback_names_blank_titles_as_unknown() {
        let raw = RawCollection {
            search_results: vec![hit("  ", "x".repeat(300).as_str())],
            ..RawCollection::empty()
        };
        let memes = fallback_memes(&raw);
        assert_eq!(memes[0].name, "未知");
        assert_eq!(memes[0].description.chars().count(), FALLBACK_DESCRIPTION_CHARS);
    }

    #[test]
    fn fallback_is_capped_at_ten() {
        let raw = RawCollection {
            search_results: (0..30).map(|i| hit(&format!("t{i}"), "c")).collect(),
            ..RawCollection::empty()
        };
        assert_eq!(fallback_memes(&raw).len(), FALLBACK_LIMIT);
    }

    #[test]
    fn normalize_is_lenient_about_field_types() {
        let value = json!([
            {"name": " 摆烂 ", "platform": "微博", "heat": "高", "description": "d", "tags": ["a", "a", 3, "b"]},
            {"name": "发疯文学", "tags": "not-a-list", "heat_description": "中"},
            "stray string",
            42
        ]);
        let memes = normalize_records(value);

        assert_eq!(memes.len(), 2);
        assert_eq!(memes[0].name, "摆烂");
        assert_eq!(memes[0].tags, vec!["a", "b"]);
        assert_eq!(memes[1].platform, "");
        assert_eq!(memes[1].heat_description, "中");
        assert!(memes[1].tags.is_empty());
    }

    #[test]
    fn normalize_keeps_duplicate_names_in_order() {
        let value = json!([{"name": "x"}, {"name": "y"}, {"name": "x"}]);
        let names: Vec<String> = normalize_records(value).into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["x", "y", "x"]);
    }

    #[test]
    fn prompt_context_is_bounded() {
        let raw = RawCollection {
            search_results: (0..8).map(|i| hit(&format!("t{i}"), &"文".repeat(2000))).collect(),
            crawl_results: (0..8).map(|_| crawl(&"榜".repeat(3000))).collect(),
            timestamp: Utc::now(),
        };
        let messages = prompt_messages(&raw);
        let user = &messages[1].content;

        assert!(user.contains("\"t4\""));
        assert!(!user.contains("\"t5\""));
        assert!(user.contains(&"文".repeat(SEARCH_CONTENT_CHARS)));
        assert!(!user.contains(&"文".repeat(SEARCH_CONTENT_CHARS + 1)));
        assert!(!user.contains(&"榜".repeat(CRAWL_SNIPPET_CHARS + 1)));
    }
}
