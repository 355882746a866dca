use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the analysis result is stored in `info.json`.
pub const AI_ANALYSIS_KEY: &str = "aiAnalysis";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelMetadata {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, rename = "word_count", alias = "wordCount")]
    pub word_count: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        rename = "aiAnalysis",
        alias = "ai_analysis",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_analysis: Option<AnalysisResult>,
}

impl NovelMetadata {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            tags: Vec::new(),
            word_count: String::new(),
            description: String::new(),
            ai_analysis: None,
        }
    }

    /// The catalog-derived fields as a merge patch. Never carries `aiAnalysis`,
    /// so re-verifying a catalog keeps an earlier analysis intact.
    pub fn catalog_patch(&self) -> MetadataPatch {
        MetadataPatch {
            title: Some(self.title.clone()),
            url: Some(self.url.clone()),
            tags: Some(self.tags.clone()),
            word_count: Some(self.word_count.clone()),
            description: Some(self.description.clone()),
            ai_analysis: None,
        }
    }
}

/// Structured summary produced by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub genre: String,
    pub style: String,
    pub goldfinger: String,
    pub opening: String,
    pub highlights: String,
}

/// A shallow metadata update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub word_count: Option<String>,
    pub description: Option<String>,
    pub ai_analysis: Option<AnalysisResult>,
}

impl MetadataPatch {
    pub fn analysis(result: AnalysisResult) -> Self {
        Self {
            ai_analysis: Some(result),
            ..Default::default()
        }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(title) = self.title {
            fields.insert("title".into(), Value::String(title));
        }
        if let Some(url) = self.url {
            fields.insert("url".into(), Value::String(url));
        }
        if let Some(tags) = self.tags {
            fields.insert(
                "tags".into(),
                Value::Array(tags.into_iter().map(Value::String).collect()),
            );
        }
        if let Some(word_count) = self.word_count {
            fields.insert("word_count".into(), Value::String(word_count));
        }
        if let Some(description) = self.description {
            fields.insert("description".into(), Value::String(description));
        }
        if let Some(analysis) = self.ai_analysis {
            fields.insert(
                AI_ANALYSIS_KEY.into(),
                serde_json::to_value(analysis).unwrap_or(Value::Null),
            );
        }
        fields
    }
}

/// One novel discovered on a rank page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub title: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_legacy_and_camel_case_files() {
        let legacy = r#"{"title":"A","url":"u","tags":["x"],"word_count":"10万字","description":"d"}"#;
        let meta: NovelMetadata = serde_json::from_str(legacy).unwrap();
        assert_eq!(meta.word_count, "10万字");
        assert!(meta.ai_analysis.is_none());

        let camel = r#"{"title":"A","url":"u","wordCount":"5","futureField":1}"#;
        let meta: NovelMetadata = serde_json::from_str(camel).unwrap();
        assert_eq!(meta.word_count, "5");
        assert!(meta.tags.is_empty());
    }

    #[test]
    fn test_serialization_omits_missing_analysis() {
        let meta = NovelMetadata::new("A", "https://x");
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get(AI_ANALYSIS_KEY).is_none());
        assert!(json.get("word_count").is_some());
    }

    #[test]
    fn test_catalog_patch_never_touches_analysis() {
        let mut meta = NovelMetadata::new("A", "https://x");
        meta.ai_analysis = Some(AnalysisResult {
            genre: "g".into(),
            style: "s".into(),
            goldfinger: "gf".into(),
            opening: "o".into(),
            highlights: "h".into(),
        });
        let fields = meta.catalog_patch().into_fields();
        assert!(!fields.contains_key(AI_ANALYSIS_KEY));
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn test_analysis_requires_all_fields() {
        let partial = r#"{"genre":"g","style":"s"}"#;
        assert!(serde_json::from_str::<AnalysisResult>(partial).is_err());

        let extra = r#"{"genre":"g","style":"s","goldfinger":"x","opening":"o","highlights":"h","score":9}"#;
        assert!(serde_json::from_str::<AnalysisResult>(extra).is_ok());
    }
}
