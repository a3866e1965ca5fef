use anyhow::{Context, Result};
use catchup_domain::Issue;

use crate::provider::LlmProvider;

pub const SUMMARY_MAX_TOKENS: u32 = 1000;
pub const ANALYSIS_MAX_TOKENS: u32 = 500;
pub const ACTION_ITEMS_MAX: usize = 10;

const ACTION_ITEMS_MAX_TOKENS: u32 = 500;
const SUMMARY_TEMPERATURE: f32 = 0.7;
const ACTION_ITEMS_TEMPERATURE: f32 = 0.6;
const PROMPT_ISSUE_LIMIT: usize = 20;
const DESCRIPTION_PREVIEW_CHARS: usize = 300;
const COMMENT_PREVIEW_CHARS: usize = 150;
const PROMPT_COMMENT_COUNT: usize = 2;
const BULLET_PREFIXES: [char; 4] = ['#', '-', '*', '•'];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisType {
    #[default]
    General,
    Technical,
    Priority,
}

impl AnalysisType {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "technical" => AnalysisType::Technical,
            "priority" => AnalysisType::Priority,
            _ => AnalysisType::General,
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            AnalysisType::General => {
                "Analyze this issue and provide:\n\
                 1. What action is needed\n\
                 2. Who should take action\n\
                 3. Estimated urgency\n\
                 4. Any blockers or dependencies"
            }
            AnalysisType::Technical => {
                "Provide a technical analysis:\n\
                 1. Technical complexity assessment\n\
                 2. Potential implementation approach\n\
                 3. Risks or challenges\n\
                 4. Suggested next steps"
            }
            AnalysisType::Priority => {
                "Assess the priority of this issue:\n\
                 1. Impact assessment\n\
                 2. Urgency level (1-5)\n\
                 3. Affected stakeholders\n\
                 4. Recommendation for prioritization"
            }
        }
    }
}

pub struct IssueSummarizer<P> {
    provider: P,
    base_url: Option<String>,
}

impl<P: LlmProvider> IssueSummarizer<P> {
    pub fn new(provider: P, base_url: Option<String>) -> Self {
        Self {
            provider,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    pub fn summarize_issues(
        &self,
        issues: &[Issue],
        user_context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        if issues.is_empty() {
            return Ok("No issues to summarize.".to_string());
        }

        let mut system_prompt = String::from(
            "You are an assistant helping users catch up on their YouTrack issues. \
             Provide a concise, actionable summary highlighting what needs immediate attention. \
             Group related issues when possible and emphasize priority items. \
             When referencing issues, preserve the markdown links in format [ISSUE-ID](url) that are provided.",
        );
        if let Some(context) = user_context.map(str::trim).filter(|value| !value.is_empty()) {
            system_prompt.push_str(&format!(" User context: {context}"));
        }

        let user_prompt = format!(
            "Please summarize the following {} YouTrack issues:\n\n{}\n\n\
             Provide:\n\
             1. A brief overview of what needs attention\n\
             2. High-priority items requiring immediate action\n\
             3. Items waiting on others or blocked\n\
             4. Any patterns or trends you notice",
            issues.len(),
            self.format_issues_for_prompt(issues)
        );

        self.provider
            .complete(&system_prompt, &user_prompt, max_tokens, SUMMARY_TEMPERATURE)
            .with_context(|| "failed to generate AI summary")
    }

    pub fn analyze_issue(
        &self,
        issue: &Issue,
        analysis: AnalysisType,
        max_tokens: u32,
    ) -> Result<String> {
        let system_prompt = "You are an expert at analyzing software development issues and providing actionable insights. \
             When referencing the issue, preserve the markdown link in format [ISSUE-ID](url) if provided.";
        let user_prompt = format!(
            "{}\n\n{}",
            self.format_single_issue(issue),
            analysis.instructions()
        );

        self.provider
            .complete(system_prompt, &user_prompt, max_tokens, SUMMARY_TEMPERATURE)
            .with_context(|| "failed to analyze issue")
    }

    pub fn generate_action_items(&self, issues: &[Issue], max_items: usize) -> Result<Vec<String>> {
        if issues.is_empty() {
            return Ok(Vec::new());
        }

        let system_prompt = "You are an expert at creating clear, actionable tasks from issue tracking data. \
             When referencing specific issues in action items, preserve the markdown links in format [ISSUE-ID](url).";
        let user_prompt = format!(
            "Based on these {} YouTrack issues:\n\n{}\n\n\
             Generate up to {max_items} specific, actionable items that the user should do today. \
             Format each as a clear, concise action starting with a verb. \
             Include issue references using the markdown links provided. \
             Prioritize by urgency and impact. \
             Return only the action items, one per line, without numbering or bullets.",
            issues.len(),
            self.format_issues_for_prompt(issues)
        );

        let content = self
            .provider
            .complete(
                system_prompt,
                &user_prompt,
                ACTION_ITEMS_MAX_TOKENS,
                ACTION_ITEMS_TEMPERATURE,
            )
            .with_context(|| "failed to generate action items")?;

        Ok(parse_action_items(&content, max_items))
    }

    pub fn format_issues_for_prompt(&self, issues: &[Issue]) -> String {
        issues
            .iter()
            .take(PROMPT_ISSUE_LIMIT)
            .map(|issue| self.format_single_issue(issue))
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    pub fn format_single_issue(&self, issue: &Issue) -> String {
        let mut parts = Vec::new();

        let id = issue.get("idReadable").and_then(|value| value.as_str()).unwrap_or("Unknown");
        let summary = issue.summary().unwrap_or("No summary");
        match &self.base_url {
            Some(base_url) => parts.push(format!("Issue [{id}]({base_url}/issue/{id}): {summary}")),
            None => parts.push(format!("Issue {id}: {summary}")),
        }

        if issue.is_normalized() {
            let state = issue.custom_field_text("State").unwrap_or_else(|| "Unknown".to_string());
            let priority = issue
                .custom_field_text("Priority")
                .unwrap_or_else(|| "Normal".to_string());
            let assignee = issue
                .custom_field_text("Assignee")
                .unwrap_or_else(|| "Unassigned".to_string());
            parts.push(format!(
                "State: {state}, Priority: {priority}, Assignee: {assignee}"
            ));
        }

        if let Some(description) = issue.description().filter(|text| !text.is_empty()) {
            parts.push(format!(
                "Description: {}",
                preview(description, DESCRIPTION_PREVIEW_CHARS)
            ));
        }

        let comments = issue.comments();
        let recent = &comments[comments.len().saturating_sub(PROMPT_COMMENT_COUNT)..];
        let comment_texts = recent
            .iter()
            .filter_map(|comment| {
                let text = take_chars(&comment.text, COMMENT_PREVIEW_CHARS);
                if text.is_empty() {
                    return None;
                }
                let author = comment.author_login.as_deref().unwrap_or("Unknown");
                Some(format!("{author}: {text}"))
            })
            .collect::<Vec<_>>();
        if !comment_texts.is_empty() {
            parts.push(format!("Recent comments: {}", comment_texts.join("; ")));
        }

        parts.join("\n")
    }
}

fn parse_action_items(content: &str, max_items: usize) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(&BULLET_PREFIXES[..]))
        .take(max_items)
        .map(str::to_string)
        .collect()
}

fn take_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

fn preview(value: &str, limit: usize) -> String {
    let head = take_chars(value, limit);
    if head.len() < value.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
