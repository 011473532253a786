//! reqwest-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use centri_agent_core::{Error, TransportError};

use crate::transport::{HttpRequest, HttpResponse, Transport};

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with its own connection pool. `None` means no timeout.
    pub fn new(timeout: Option<Duration>) -> centri_agent_core::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Reuse an existing reqwest client (and its pool).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn id(&self) -> &str {
        "reqwest"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        trace!(url = %request.url, %status, "HTTP response");

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("failed to read body: {e}")))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(String::from),
            body: body.to_vec(),
        })
    }
}
