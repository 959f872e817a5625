use serde::{Deserialize, Serialize};
use serde_json::Value;

// The method namespace is closed.
pub const METHOD_MODE_NEXT: &str = "mode.next";
pub const METHOD_MODE_PREV: &str = "mode.previous";
pub const METHOD_MODE_GET: &str = "mode.get";
pub const METHOD_CONTENT_GET: &str = "content.get";
pub const METHOD_OPEN_IN: &str = "launcher.openIn";

/// Request sent from a CLI invocation to the launcher.
///
/// Framing is one JSON object per line in both directions; JSON escapes
/// embedded newlines, so the line terminator never collides with payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Value::Null,
        }
    }

    pub fn with_params(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Response carrying exactly one of a result or an error message.
/// A response is terminal; the connection closes after it is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(message) => Err(message),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Params for `launcher.openIn`. An absent target means a full session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenInParams {
    pub category: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}
