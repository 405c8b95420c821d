use serde_json::Value;
use thiserror::Error;

/// Failures of a call to the Slash API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never reached the server (DNS, refused connection, timeout).
    #[error("Cannot reach the server at {host}. Is it running?")]
    NetworkUnreachable { host: String },
    /// The server answered with a non-success status.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    /// A success response whose body did not match the expected shape.
    #[error("Unexpected response from server: {0}")]
    Decode(String),
    /// The request could not be built locally (bad mime type, unreadable file).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Build an `Api` error from a status and raw body, preferring the server's `detail`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail =
            detail_from_body(body).unwrap_or_else(|| format!("Request failed (HTTP {status})"));
        ApiError::Api { status, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extract `detail` from an error body. FastAPI validation errors send a list
/// of objects; their `msg` fields are joined.
fn detail_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = match value.get("detail")? {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                other => other.get("msg").and_then(Value::as_str).map(str::to_string),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => return None,
        other => other.to_string(),
    };
    let detail = detail.trim().to_string();
    (!detail.is_empty()).then_some(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string_is_used() {
        let err = ApiError::from_response(401, r#"{"detail":"invalid credentials"}"#);
        assert_eq!(err.to_string(), "invalid credentials");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_validation_list_is_joined() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"field required"},{"msg":"too short"}]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(err.to_string(), "field required; too short");
    }

    #[test]
    fn test_generic_fallback_for_plain_body() {
        let err = ApiError::from_response(500, "Internal Server Error");
        assert_eq!(err.to_string(), "Request failed (HTTP 500)");
    }

    #[test]
    fn test_null_detail_falls_back() {
        let err = ApiError::from_response(404, r#"{"detail":null}"#);
        assert_eq!(err.to_string(), "Request failed (HTTP 404)");
    }

    #[test]
    fn test_network_message_names_host() {
        let err = ApiError::NetworkUnreachable { host: "localhost:8000".to_string() };
        assert!(err.to_string().contains("localhost:8000"));
        assert_eq!(err.status(), None);
    }
}
