use thiserror::Error;

pub(crate) const BODY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {method} {url}: {source}")]
    Network {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("YouTrack API error: {message} (status {status})")]
    Status { status: u16, message: String },

    #[error(
        "Invalid JSON response from API. Status: {status}. Body: {body}. \
         This might indicate an authentication issue or incorrect URL."
    )]
    InvalidJson { status: u16, body: String },

    #[error("Unexpected {what} payload: {source}")]
    UnexpectedPayload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(payload) => match payload.get("error_description").and_then(|value| value.as_str()) {
                Some(description) => description.to_string(),
                None => truncate_chars(&payload.to_string(), BODY_PREVIEW_CHARS),
            },
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => truncate_chars(body, BODY_PREVIEW_CHARS),
        };
        TransportError::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Network { source, .. } => source.status().map(|status| status.as_u16()),
            TransportError::Status { status, .. } | TransportError::InvalidJson { status, .. } => {
                Some(*status)
            }
            TransportError::UnexpectedPayload { .. } => None,
        }
    }
}

pub(crate) fn truncate_chars(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((index, _)) => value[..index].to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{truncate_chars, TransportError};

    #[test]
    fn uses_error_description_when_present() {
        let error = TransportError::from_status(
            401,
            r#"{"error":"Unauthorized","error_description":"Invalid token"}"#,
        );
        assert_eq!(error.status(), Some(401));
        assert_eq!(
            error.to_string(),
            "YouTrack API error: Invalid token (status 401)"
        );
    }

    #[test]
    fn falls_back_to_json_payload_then_text() {
        let json = TransportError::from_status(400, r#"{"error":"bad query"}"#);
        assert!(json.to_string().contains(r#"{"error":"bad query"}"#));

        let text = TransportError::from_status(502, "<html>Bad gateway</html>");
        assert!(text.to_string().contains("<html>Bad gateway</html>"));

        let empty = TransportError::from_status(500, "");
        assert!(empty.to_string().contains("empty response body"));

        let long_json = format!(r#"{{"error":"{}"}}"#, "x".repeat(5000));
        let TransportError::Status { message, .. } = TransportError::from_status(500, &long_json)
        else {
            panic!("expected status error");
        };
        assert_eq!(message.chars().count(), 500);
        assert!(message.starts_with(r#"{"error":"xxx"#));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 50), "short");
    }
}
