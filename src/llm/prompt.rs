// src/llm/prompt.rs
// PromptBuilder for the breaking-change analysis prompt

use super::Message;

/// Fixed system message, identical across all calls
const SYSTEM_PREFIX: &str =
    "You are UpgradeSage, an expert at analysing code diffs for breaking changes.";

/// The response contract. Field names are part of the API and must not change.
const RESPONSE_SHAPE: &str = r#"Return ONLY valid JSON (no markdown fences) with exactly this shape:
{
  "riskScore": <integer 0-100>,
  "breakingChanges": [
    {
      "title": "<short title>",
      "details": "<why it is breaking>",
      "mitigations": ["<step 1>", "<step 2>"]
    }
  ],
  "markdownReport": "<full human-readable Markdown report with headings, lists, risk badge>"
}
No other top-level fields are allowed."#;

/// Builds the system and user messages for one analysis.
///
/// Structure:
/// 1. Fixed system message
/// 2. Task rules, adjusted by the effective config
/// 3. Diff header (refs, stats, truncation) and the diff itself
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    breaking_changes_only: bool,
    include_migration_paths: bool,
    require_mitigations: bool,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            breaking_changes_only: false,
            include_migration_paths: true,
            require_mitigations: true,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the report to breaking changes, with no general upgrade notes
    pub fn breaking_changes_only(mut self, enabled: bool) -> Self {
        self.breaking_changes_only = enabled;
        self
    }

    pub fn include_migration_paths(mut self, enabled: bool) -> Self {
        self.include_migration_paths = enabled;
        self
    }

    /// Every breaking change must carry at least one mitigation step
    pub fn require_mitigations(mut self, enabled: bool) -> Self {
        self.require_mitigations = enabled;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        SYSTEM_PREFIX.to_string()
    }

    /// Task instructions placed before the diff
    pub fn build_instructions(&self) -> String {
        let mut rules = vec![
            "Identify only *breaking changes*: changes that would likely break existing consumers. \
             Exclude backward-compatible additions, refactors and internal-only changes."
                .to_string(),
            "For each breaking change, explain WHY it is breaking.".to_string(),
        ];

        let mut steps = "For each breaking change, give ordered mitigation steps. Each step must be \
                         self-contained and actionable, and steps that others depend on come first."
            .to_string();
        if self.require_mitigations {
            steps.push_str(" Every breaking change must have at least one step.");
        }
        rules.push(steps);

        if self.include_migration_paths {
            rules.push(
                "In the Markdown report, add a migration path section that walks through the upgrade \
                 from the old ref to the new ref, covering configuration, API call sites and tests."
                    .to_string(),
            );
        }

        rules.push(
            "Assign a single risk score from 0 to 100 (0 = trivial, 100 = catastrophic).".to_string(),
        );
        rules.push(
            "Recommend upgrading directly from the old ref to the new ref. Never suggest intermediate \
             versions as stepping stones unless the direct path is impossible, and say why if so."
                .to_string(),
        );

        if self.breaking_changes_only {
            rules.push(
                "The Markdown report must cover breaking changes only: no summaries of new features \
                 or general upgrade advice."
                    .to_string(),
            );
        }

        let mut out = String::from(
            "You are an expert software maintainer. Below is a unified diff between two versions of a codebase.\n\n",
        );
        for (i, rule) in rules.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rule));
        }
        out.push('\n');
        out.push_str(RESPONSE_SHAPE);
        out
    }

    /// Build the message list: system message plus one user message holding rules and diff
    pub fn build_messages(&self, diff_section: &str) -> Vec<Message> {
        vec![
            Message::system(self.build_system_prompt()),
            Message::user(format!("{}\n\n{}", self.build_instructions(), diff_section)),
        ]
    }

    /// Follow-up asking the model to fix a response that broke the contract
    pub fn corrective_message(problem: &str) -> Message {
        Message::user(format!(
            "Your previous response was rejected: {}.\n\n{}\nReturn ONLY the corrected JSON.",
            problem, RESPONSE_SHAPE
        ))
    }
}
