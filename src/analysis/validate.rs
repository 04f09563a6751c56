// src/analysis/validate.rs
// Hardened JSON extraction and strict validation of the model's response

use super::types::{AnalysisResult, BreakingChange};
use serde_json::{Map, Value};

const RESPONSE_FIELDS: [&str; 3] = ["riskScore", "breakingChanges", "markdownReport"];

/// Checks applied on top of the fixed response shape
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationRules {
    /// Every breaking change needs at least one mitigation step
    pub require_mitigations: bool,
}

/// Parse a JSON value from model output.
///
/// Tries in order:
/// 1. Direct parse of trimmed content
/// 2. Strip markdown code fences, then parse
/// 3. Extract the first balanced `{...}` block, then parse
pub fn parse_json_hardened(content: &str) -> Result<Value, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("response was empty".to_string());
    }

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }

    let stripped = strip_code_fences(trimmed);
    if stripped != trimmed
        && let Ok(v) = serde_json::from_str::<Value>(stripped)
    {
        return Ok(v);
    }

    if let Some(block) = extract_json_object(trimmed)
        && let Ok(v) = serde_json::from_str::<Value>(block)
    {
        return Ok(v);
    }

    Err(format!(
        "response is not valid JSON (starts with: {})",
        crate::utils::truncate(trimmed, 120)
    ))
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```)
pub fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (e.g. "json") on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First balanced `{...}` block, respecting JSON strings
fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, ch) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Validate model output against the response contract.
///
/// The error string names the first problem found; it is fed back to the model
/// in the corrective follow-up.
pub fn validate_response(content: &str, rules: ValidationRules) -> Result<AnalysisResult, String> {
    let obj = match parse_json_hardened(content)? {
        Value::Object(obj) => obj,
        other => {
            return Err(format!(
                "top-level value must be an object, got {}",
                type_name(&other)
            ));
        }
    };

    let mut unexpected: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !RESPONSE_FIELDS.contains(k))
        .collect();
    if !unexpected.is_empty() {
        unexpected.sort_unstable();
        return Err(format!("unexpected top-level fields: {}", unexpected.join(", ")));
    }
    for field in RESPONSE_FIELDS {
        if !obj.contains_key(field) {
            return Err(format!("missing required field '{}'", field));
        }
    }

    let risk_score = validate_score(&obj["riskScore"])?;
    let breaking_changes = validate_changes(&obj["breakingChanges"], rules)?;

    let markdown_report = match &obj["markdownReport"] {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::String(_) => return Err("'markdownReport' must not be empty".to_string()),
        other => {
            return Err(format!("'markdownReport' must be a string, got {}", type_name(other)));
        }
    };

    Ok(AnalysisResult {
        risk_score,
        breaking_changes,
        markdown_report,
    })
}

fn validate_score(value: &Value) -> Result<u8, String> {
    let score = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    };
    match score {
        Some(s) if (0..=100).contains(&s) => Ok(s as u8),
        Some(s) => Err(format!("riskScore {} is out of range 0-100", s)),
        None => Err(format!("riskScore must be an integer, got {}", value)),
    }
}

fn validate_changes(value: &Value, rules: ValidationRules) -> Result<Vec<BreakingChange>, String> {
    let Value::Array(items) = value else {
        return Err(format!("'breakingChanges' must be an array, got {}", type_name(value)));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(change) = item else {
                return Err(format!("breakingChanges[{}] must be an object", i));
            };
            validate_change(i, change, rules)
        })
        .collect()
}

fn validate_change(
    i: usize,
    change: &Map<String, Value>,
    rules: ValidationRules,
) -> Result<BreakingChange, String> {
    let title = match change.get("title") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(format!("breakingChanges[{}].title is empty", i)),
        Some(_) => return Err(format!("breakingChanges[{}].title must be a string", i)),
        None => return Err(format!("breakingChanges[{}] is missing 'title'", i)),
    };
    let details = match change.get("details") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(format!("breakingChanges[{}].details must be a string", i)),
        None => return Err(format!("breakingChanges[{}] is missing 'details'", i)),
    };
    let mitigations = match change.get("mitigations") {
        Some(Value::Array(steps)) => steps
            .iter()
            .map(|s| match s {
                Value::String(step) => Ok(step.clone()),
                _ => Err(format!("breakingChanges[{}].mitigations must contain strings", i)),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(format!("breakingChanges[{}].mitigations must be an array", i)),
        None => return Err(format!("breakingChanges[{}] is missing 'mitigations'", i)),
    };

    if rules.require_mitigations && mitigations.is_empty() {
        return Err(format!(
            "breakingChanges[{}] ('{}') has no mitigation steps",
            i, title
        ));
    }

    Ok(BreakingChange {
        title,
        details,
        mitigations,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
