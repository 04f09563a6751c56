// src/analysis/types.rs
// Result types returned to callers

use serde::{Deserialize, Serialize};

/// One breaking change with its ordered mitigation steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakingChange {
    pub title: String,
    pub details: String,
    pub mitigations: Vec<String>,
}

/// Final analysis report (the `result` event payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 0 (trivial) to 100 (catastrophic)
    pub risk_score: u8,
    pub breaking_changes: Vec<BreakingChange>,
    pub markdown_report: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let result = AnalysisResult {
            risk_score: 40,
            breaking_changes: vec![BreakingChange {
                title: "t".into(),
                details: "d".into(),
                mitigations: vec!["m".into()],
            }],
            markdown_report: "# r".into(),
        };
        let value = serde_json::to_value(&result).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(value["riskScore"], 40);
        assert_eq!(value["breakingChanges"][0]["mitigations"][0], "m");
        assert_eq!(value["markdownReport"], "# r");
    }
}
