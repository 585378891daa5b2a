use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An insight before it is stored, as produced by the LLM or the heuristic generator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct InsightDraft {
    pub title: String,
    pub description: String,
    /// One of `info`, `warning`, `success`; anything else is stored as `info`
    #[serde(rename = "type", alias = "insight_type", default = "default_type")]
    pub insight_type: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub related_transactions: Vec<i32>,
}

fn default_type() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let draft: InsightDraft =
            serde_json::from_str(r#"{"title":"Hi","description":"There"}"#).unwrap();
        assert_eq!(draft.insight_type, "info");
        assert!(draft.category.is_none());
        assert!(draft.related_transactions.is_empty());
    }

    #[test]
    fn test_deserialize_alias() {
        let draft: InsightDraft = serde_json::from_str(
            r#"{"title":"Hi","description":"There","insight_type":"warning","related_transactions":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(draft.insight_type, "warning");
        assert_eq!(draft.related_transactions, vec![1, 2]);
    }
}
