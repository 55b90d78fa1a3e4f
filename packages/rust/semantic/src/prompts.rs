//! Prompt builders and lenient JSON reply parsing.
//!
//! Every prompt asks for exactly one JSON object whose keys are supplied in
//! the prompt, so replies can be applied by exact key match.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use conceptgraph_shared::{ConceptGraphError, Result};
use regex::Regex;
use serde_json::{Map, Value};

/// Separator between source and target labels in edge keys.
pub const EDGE_ARROW: &str = "→";

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)\s*```").expect("valid regex"));

const JSON_ONLY: &str = "Respond with a single JSON object and nothing else.";

/// Edge lookup key: `"<source label>→<target label>"`.
pub fn edge_key(source: &str, target: &str) -> String {
    format!("{source}{EDGE_ARROW}{target}")
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".into())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Ask for a short name per theme group.
pub fn theme_prompt(groups: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::from(
        "The following concepts from a concept map are grouped by theme key.\n\
         Give each group a short, human-readable theme name of one to three words.\n\n",
    );
    for (key, labels) in groups {
        out.push_str(&format!("{key}: {}\n", labels.join(", ")));
    }
    out.push_str(&format!(
        "\n{JSON_ONLY} Use the theme keys above as keys and the names as values, \
         e.g. {{\"{}\": \"Energy Sources\"}}.",
        groups.keys().next().map(String::as_str).unwrap_or("cluster-0")
    ));
    out
}

/// Ask to assign each concept one role from `roles`.
pub fn role_prompt(labels: &[String], roles: &[String], guidance: Option<&str>) -> String {
    let mut out = format!(
        "Classify each concept into exactly one of these roles: {}.\n",
        roles.join(", ")
    );
    if let Some(guidance) = guidance.filter(|g| !g.trim().is_empty()) {
        out.push_str(&format!("Guidance: {}\n", guidance.trim()));
    }
    out.push_str(&format!(
        "\nConcepts: {}\n\n{JSON_ONLY} Map each concept exactly as written to its role.",
        json_list(labels)
    ));
    out
}

/// Ask for a short relationship label per edge key.
pub fn edge_prompt(edge_keys: &[String]) -> String {
    format!(
        "Each item below is a relationship between two concepts, written as \
         \"Source{EDGE_ARROW}Target\".\n\
         Label each with a short verb phrase (two to four words) describing how the \
         source relates to the target.\n\n\
         Relationships: {}\n\n{JSON_ONLY} Map each relationship exactly as written to its label.",
        json_list(edge_keys)
    )
}

/// Ask for a one-sentence description per concept.
pub fn description_prompt(labels: &[String], title: &str) -> String {
    let context = if title.is_empty() {
        String::new()
    } else {
        format!(" from a concept map about \"{title}\"")
    };
    format!(
        "Write a one-sentence description for each concept{context}.\n\n\
         Concepts: {}\n\n{JSON_ONLY} Map each concept exactly as written to its description.",
        json_list(labels)
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract the JSON object from a model reply.
///
/// Strips Markdown code fences, then tries the whole text and finally the
/// outermost `{ ... }` slice. Anything that is not a JSON object is a
/// `Parse` error.
pub fn parse_object(reply: &str) -> Result<Map<String, Value>> {
    let body = FENCE_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str())
        .trim();

    let value = serde_json::from_str::<Value>(body)
        .ok()
        .or_else(|| {
            let start = body.find('{')?;
            let end = body.rfind('}')?;
            (start < end)
                .then(|| serde_json::from_str::<Value>(&body[start..=end]).ok())
                .flatten()
        })
        .ok_or_else(|| ConceptGraphError::parse("reply contains no JSON"))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ConceptGraphError::parse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Keep the non-empty string values of a parsed reply.
pub fn string_entries(map: Map<String, Value>) -> HashMap<String, String> {
    map.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) if !s.trim().is_empty() => Some((key, s.trim().to_string())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let map = parse_object(r#"{"a": "b"}"#).unwrap();
        assert_eq!(map["a"], "b");
    }

    #[test]
    fn strips_markdown_fence() {
        let reply = "Here you go:\n```json\n{\"cluster-0\": \"Energy\"}\n```\nHope that helps.";
        let map = parse_object(reply).unwrap();
        assert_eq!(map["cluster-0"], "Energy");
    }

    #[test]
    fn falls_back_to_brace_slice() {
        let map = parse_object("Sure! {\"x\": \"y\"} Let me know.").unwrap();
        assert_eq!(map["x"], "y");
    }

    #[test]
    fn rejects_non_objects() {
        let err = parse_object("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ConceptGraphError::Parse { .. }));
        assert!(err.to_string().contains("an array"));
        assert!(parse_object("\"just a string\"").is_err());
        assert!(parse_object("no json here").is_err());
        assert!(parse_object("").is_err());
    }

    #[test]
    fn string_entries_drop_non_strings_and_blanks() {
        let map = parse_object(r#"{"a": "keep", "b": 3, "c": "  ", "d": null, "e": " pad "}"#)
            .unwrap();
        let entries = string_entries(map);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["a"], "keep");
        assert_eq!(entries["e"], "pad");
    }

    #[test]
    fn theme_prompt_lists_every_group() {
        let mut groups = BTreeMap::new();
        groups.insert("cluster-0".to_string(), vec!["Sun".to_string(), "Wind".to_string()]);
        groups.insert("cluster-1".to_string(), vec!["Grid".to_string()]);
        let prompt = theme_prompt(&groups);
        assert!(prompt.contains("cluster-0: Sun, Wind"));
        assert!(prompt.contains("cluster-1: Grid"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn role_prompt_includes_guidance_only_when_present() {
        let labels = vec!["Sun".to_string()];
        let roles = vec!["cause".to_string(), "effect".to_string()];
        assert!(role_prompt(&labels, &roles, Some("favor causes")).contains("Guidance: favor causes"));
        assert!(!role_prompt(&labels, &roles, Some("  ")).contains("Guidance"));
        assert!(role_prompt(&labels, &roles, None).contains("cause, effect"));
    }

    #[test]
    fn edge_keys_use_arrow() {
        assert_eq!(edge_key("Sun", "Earth"), "Sun→Earth");
        assert!(edge_prompt(&[edge_key("Sun", "Earth")]).contains("\"Sun→Earth\""));
    }
}
