use catchup_domain::{Issue, IssueComment};
use chrono::{DateTime, Local, Utc};

use crate::utils::{or_default, preview_line};

const DESCRIPTION_PREVIEW_CHARS: usize = 200;
const COMMENT_PREVIEW_CHARS: usize = 150;
const RECENT_COMMENTS: usize = 3;
const SEPARATOR_WIDTH: usize = 80;

pub fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .filter(|value| *value != 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|value| value.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn render_issue(issue: &Issue) -> String {
    let mut lines = vec![
        format!(
            "📋 {}: {}",
            issue.id().unwrap_or("Unknown"),
            issue.summary().unwrap_or("No summary")
        ),
        format!("   Created:  {}", format_timestamp(issue.created())),
        format!("   Updated:  {}", format_timestamp(issue.updated())),
    ];
    let resolved = match issue.resolved() {
        Some(millis) => format_timestamp(Some(millis)),
        None => "Unresolved".to_string(),
    };
    lines.push(format!("   Resolved: {resolved}"));

    lines.push(format!(
        "   State: {} | Priority: {} | Type: {}",
        or_default(issue.custom_field_text("State"), "N/A"),
        or_default(issue.custom_field_text("Priority"), "N/A"),
        or_default(issue.custom_field_text("Type"), "N/A"),
    ));
    lines.push(format!(
        "   Assignee: {}",
        or_default(issue.custom_field_text("Assignee"), "Unassigned")
    ));

    if let Some(description) = issue.description().filter(|text| !text.trim().is_empty()) {
        lines.push(format!(
            "   Description: {}",
            preview_line(description, DESCRIPTION_PREVIEW_CHARS)
        ));
    }

    let comments = issue.comments();
    if !comments.is_empty() {
        lines.push(format!("   Recent comments ({} total):", comments.len()));
        let start = comments.len().saturating_sub(RECENT_COMMENTS);
        lines.extend(
            comments[start..]
                .iter()
                .filter(|comment| !comment.text.is_empty())
                .map(render_comment),
        );
    }

    lines.push("-".repeat(SEPARATOR_WIDTH));
    lines.join("\n")
}

pub fn render_footer(total: usize) -> String {
    if total == 0 {
        return "No issues found for the specified period.".to_string();
    }
    format!("✅ Total issues requiring attention: {total}")
}

fn render_comment(comment: &IssueComment) -> String {
    let author = comment
        .author_name
        .as_deref()
        .or(comment.author_login.as_deref())
        .unwrap_or("Unknown");
    format!(
        "     - {author} ({}): {}",
        format_timestamp(comment.created),
        preview_line(&comment.text, COMMENT_PREVIEW_CHARS)
    )
}
