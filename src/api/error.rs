use reqwest::StatusCode;
use serde_json::Value;

/// Failure of a single API call.
///
/// `Status` carries the message the user should see: the server's `detail`
/// when it sent one, otherwise the generic fallback of the operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Could not reach the Nova server: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected response from the Nova server: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the stored token was rejected and the user has to log in again.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub(crate) fn from_response_body(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = extract_detail(body).unwrap_or_else(|| fallback.to_string());
        ApiError::Status { status, message }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err)
        }
    }
}

/// Pull a human-readable message out of a FastAPI error body.
///
/// `detail` is either a plain string or a list of validation errors, each with
/// a `msg` field. Anything else yields `None`.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let detail = value.get("detail")?;
    let message = match detail {
        Value::String(text) => text.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    (!message.is_empty()).then_some(message)
}
