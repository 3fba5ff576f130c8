//! Uniform `{ success, msg }` result envelope.
//!
//! Success and failure share the `msg` key; `success` tells them apart.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Hint};

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub msg: Value,
}

/// Serialized form of an [`Error`] inside `msg`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload<'a> {
    pub code: &'static str,
    pub message: &'a str,
    pub details: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'a str>,
    #[serde(skip_serializing_if = "no_hints")]
    pub hints: &'a [Hint],
}

fn no_hints(hints: &&[Hint]) -> bool {
    hints.is_empty()
}

impl Envelope {
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(msg) => Self { success: true, msg },
            Err(e) => Self::failure(
                &Error::internal_json(e.to_string(), Some("serialize result".to_string())),
                None,
            ),
        }
    }

    pub fn failure(err: &Error, stage: Option<&str>) -> Self {
        let payload = ErrorPayload {
            code: err.code.as_str(),
            message: &err.message,
            details: &err.details,
            stage,
            hints: &err.hints,
        };

        let msg = serde_json::to_value(&payload).unwrap_or_else(|_| {
            serde_json::json!({ "code": err.code.as_str(), "message": err.message })
        });

        Self {
            success: false,
            msg,
        }
    }

    /// Error code of a failure envelope.
    pub fn error_code(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.msg.get("code").and_then(Value::as_str)
    }
}
