//! The HTTP capability the connector is built on.
//!
//! Anything that can POST a body with headers and hand back a status and a
//! body can carry server API calls. [`crate::HttpTransport`] is the reqwest
//! implementation used by default.

use async_trait::async_trait;

use centri_agent_core::TransportError;

/// An outbound POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport identifier for logs (e.g., "reqwest").
    fn id(&self) -> &str;

    /// Perform one POST. Non-2xx statuses are returned, not raised; only a
    /// failure to obtain a response is an error.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
