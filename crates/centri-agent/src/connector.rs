//! Turns a path and a body into one authenticated POST.
//!
//! Injects the API key and content type on every call, maps non-2xx
//! statuses to [`TransportError::Status`], and parses the body as JSON.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use centri_agent_core::config::InvalidJsonPolicy;
use centri_agent_core::{Error, Result, TransportError};

use crate::transport::{HttpRequest, Transport};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Strip every trailing `/` so `base_url + "/method"` has a single slash.
pub fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

pub struct Connector {
    base_url: String,
    api_key: String,
    transport: Arc<dyn Transport>,
    invalid_json: InvalidJsonPolicy,
}

impl Connector {
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            api_key: api_key.into(),
            transport,
            invalid_json: InvalidJsonPolicy::default(),
        }
    }

    pub fn with_invalid_json(mut self, policy: InvalidJsonPolicy) -> Self {
        self.invalid_json = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport_id(&self) -> &str {
        self.transport.id()
    }

    /// POST `body` as JSON to `base_url + path` and return the parsed body.
    pub async fn send<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<serde_json::Value> {
        let body = serde_json::to_vec(body).map_err(Error::Encode)?;
        let request = HttpRequest {
            url: format!("{}{}", self.base_url, path),
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                (API_KEY_HEADER.into(), self.api_key.clone()),
            ],
            body,
        };

        debug!(path, transport = self.transport.id(), "Sending API request");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            warn!(path, status = response.status, "API request rejected");
            return Err(TransportError::Status {
                status: response.status,
                status_text: response.status_text,
            }
            .into());
        }

        match serde_json::from_slice(&response.body) {
            Ok(value) => Ok(value),
            Err(source) => match self.invalid_json {
                InvalidJsonPolicy::Fail => Err(Error::Decode {
                    path: path.to_string(),
                    source,
                }),
                InvalidJsonPolicy::Empty => {
                    warn!(path, error = %source, "Response is not JSON, treating as empty result");
                    Ok(serde_json::Value::Object(Default::default()))
                }
            },
        }
    }
}
