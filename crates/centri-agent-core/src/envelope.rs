//! The `{result, error}` wrapper around every server API response.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::ErrorBody;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn err(code: u32, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    /// Unwrap the envelope; a populated `error` wins over any `result`.
    pub fn into_result(self, path: &str) -> Result<Option<T>, ApiError> {
        match self.error {
            Some(body) => Err(ApiError::from_body(body, path)),
            None => Ok(self.result),
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Like [`Envelope::into_result`], with a missing `result` read as `{}`.
    pub fn into_value(self, path: &str) -> Result<serde_json::Value, ApiError> {
        Ok(self
            .into_result(path)?
            .unwrap_or_else(|| serde_json::Value::Object(Default::default())))
    }
}
