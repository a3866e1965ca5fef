use catchup_youtrack::{Method, Transport, TransportError};
use serde_json::{json, Value};

const BASE_TIMESTAMP_MS: i64 = 1_771_545_600_000;
const HOUR_MS: i64 = 3_600_000;

pub struct MockTransport {
    issues: Vec<Value>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            issues: mock_issues(),
        }
    }
}

impl Transport for MockTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        _body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        if method != Method::GET {
            return Err(TransportError::Status {
                status: 405,
                message: format!("mock server only answers GET, got {method}"),
            });
        }

        match path {
            "users/me" => Ok(json!({
                "id": "1-1",
                "login": "mock-user",
                "fullName": "Mock User",
                "email": "mock-user@example.com"
            })),
            "issues" => {
                let skip = numeric_param(query, "$skip").unwrap_or(0);
                let top = numeric_param(query, "$top").unwrap_or(self.issues.len());
                Ok(Value::Array(
                    self.issues.iter().skip(skip).take(top).cloned().collect(),
                ))
            }
            other => {
                let id = other.strip_prefix("issues/").unwrap_or(other);
                self.issues
                    .iter()
                    .find(|issue| issue["idReadable"] == id)
                    .cloned()
                    .ok_or_else(|| TransportError::Status {
                        status: 404,
                        message: format!("Entity with id {id} not found"),
                    })
            }
        }
    }
}

fn numeric_param(query: &[(String, String)], key: &str) -> Option<usize> {
    query
        .iter()
        .find(|(name, _)| name == key)
        .and_then(|(_, value)| value.parse().ok())
}

fn mock_issues() -> Vec<Value> {
    vec![
        mock_issue(
            "CATCH-101",
            "Wire paginated issue search",
            "In Progress",
            "Major",
            Some("mock-user"),
            5,
            json!([{
                "id": "4-1",
                "text": "First page works, checking the short-page cutoff next.",
                "created": BASE_TIMESTAMP_MS + 4 * HOUR_MS,
                "author": {"login": "alice", "fullName": "Alice Example"}
            }]),
        ),
        mock_issue(
            "CATCH-102",
            "Flatten custom fields for display",
            "Open",
            "Normal",
            None,
            9,
            json!([]),
        ),
        mock_issue(
            "CATCH-103",
            "Retry transient 503s from the proxy",
            "Blocked",
            "Critical",
            Some("bob"),
            9,
            json!([
                {
                    "id": "4-2",
                    "text": "Waiting on the infra team to confirm the proxy timeout.",
                    "created": BASE_TIMESTAMP_MS + 7 * HOUR_MS,
                    "author": {"login": "bob", "fullName": "Bob Example"}
                },
                {
                    "id": "4-3",
                    "text": "@mock-user can you review the backoff numbers?",
                    "created": BASE_TIMESTAMP_MS + 8 * HOUR_MS,
                    "author": {"login": "carol"}
                }
            ]),
        ),
        mock_issue(
            "CATCH-104",
            "Summarize the week with the LLM",
            "Fixed",
            "Minor",
            Some("mock-user"),
            2,
            json!([]),
        ),
    ]
}

fn mock_issue(
    id: &str,
    summary: &str,
    state: &str,
    priority: &str,
    assignee: Option<&str>,
    updated_hours: i64,
    comments: Value,
) -> Value {
    let resolved = if state == "Fixed" {
        json!(BASE_TIMESTAMP_MS + updated_hours * HOUR_MS)
    } else {
        Value::Null
    };
    json!({
        "id": format!("2-{}", id.trim_start_matches("CATCH-")),
        "idReadable": id,
        "summary": summary,
        "description": format!("Mock description for {id}.\nUsed while no YouTrack server is configured."),
        "created": BASE_TIMESTAMP_MS,
        "updated": BASE_TIMESTAMP_MS + updated_hours * HOUR_MS,
        "resolved": resolved,
        "customFields": [
            {"name": "State", "value": {"name": state}},
            {"name": "Priority", "value": {"name": priority}},
            {"name": "Type", "value": {"name": "Task"}},
            {"name": "Assignee", "value": assignee.map(|login| json!({"login": login}))},
            {"name": "Subsystems", "value": [{"name": "cli"}, {"name": "api"}]}
        ],
        "comments": comments
    })
}
