//! Recovering a JSON object from free-form model output.
//!
//! Candidates are tried in order: the whole text, the interior of each fenced
//! code block, then the first balanced `{...}` span.

use serde_json::Value;

use crate::app::{Result, ScoutError};
use crate::domain::AnalysisResult;

/// First candidate that parses as a JSON object.
pub fn extract_json(text: &str) -> Option<Value> {
    candidates(text)
        .into_iter()
        .filter_map(|c| serde_json::from_str::<Value>(c.trim()).ok())
        .find(Value::is_object)
}

/// First candidate that is a complete [`AnalysisResult`].
pub fn extract_analysis(text: &str) -> Result<AnalysisResult> {
    candidates(text)
        .into_iter()
        .filter_map(|c| serde_json::from_str::<Value>(c.trim()).ok())
        .filter(Value::is_object)
        .find_map(|v| serde_json::from_value::<AnalysisResult>(v).ok())
        .ok_or_else(|| {
            let preview: String = text.chars().take(80).collect();
            ScoutError::Extraction(format!("no analysis object in response {:?}", preview))
        })
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = vec![text];
    out.extend(fenced_blocks(text));
    if let Some(span) = first_balanced_object(text) {
        out.push(span);
    }
    out
}

/// Interiors of ``` blocks; an optional language tag on the opening line is dropped.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        // skip the info string (```json)
        let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_open[body_start..];

        let Some(close) = body.find("```") else {
            break;
        };
        blocks.push(&body[..close]);
        rest = &body[close + 3..];
    }
    blocks
}

/// The first top-level `{...}` span, ignoring braces inside strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            genre: "玄幻/系统".into(),
            style: "热血".into(),
            goldfinger: "签到系统 {每日奖励}".into(),
            opening: "少年觉醒\"神秘\"血脉".into(),
            highlights: "升级快，打脸爽".into(),
        }
    }

    #[test]
    fn test_plain_json() {
        let text = serde_json::to_string(&sample()).unwrap();
        assert_eq!(extract_analysis(&text).unwrap(), sample());
    }

    #[test]
    fn test_fenced_block_inside_prose() {
        let text = format!(
            "好的，分析如下：\n```json\n{}\n```\n希望对你有帮助。",
            serde_json::to_string_pretty(&sample()).unwrap()
        );
        assert_eq!(extract_analysis(&text).unwrap(), sample());
    }

    #[test]
    fn test_balanced_span_with_braces_in_strings() {
        let text = format!(
            "Result: {} -- end",
            serde_json::to_string(&sample()).unwrap()
        );
        assert_eq!(extract_analysis(&text).unwrap(), sample());
    }

    #[test]
    fn test_extra_fields_ignored_missing_fields_rejected() {
        let extra = r#"{"genre":"a","style":"b","goldfinger":"c","opening":"d","highlights":"e","score":9}"#;
        assert_eq!(extract_analysis(extra).unwrap().highlights, "e");

        let missing = r#"{"genre":"a","style":"b"}"#;
        assert!(matches!(
            extract_analysis(missing),
            Err(ScoutError::Extraction(_))
        ));
        // still a JSON object for callers that do not need the full shape
        assert!(extract_json(missing).is_some());
    }

    #[test]
    fn test_refusal_fails_closed() {
        assert!(matches!(
            extract_analysis("I cannot analyze this."),
            Err(ScoutError::Extraction(_))
        ));
        assert!(extract_json("I cannot analyze this.").is_none());
    }

    #[test]
    fn test_later_fence_used_when_first_is_not_json() {
        let text = "```\nnot json\n```\nthen\n```json\n{\"k\": 1}\n```";
        assert_eq!(extract_json(text).unwrap()["k"], 1);
    }

    #[test]
    fn test_unbalanced_text() {
        assert_eq!(first_balanced_object("{\"a\": \"}\""), None);
        assert_eq!(first_balanced_object("x {\"a\": {\"b\": 1}} y"), Some("{\"a\": {\"b\": 1}}"));
    }
}
