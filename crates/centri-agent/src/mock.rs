//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use centri_agent_core::TransportError;

use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses and records every request it receives.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push_raw(status, body.to_string().into_bytes())
    }

    pub fn push_raw(&self, status: u16, body: Vec<u8>) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            status_text: None,
            body,
        }));
        self
    }

    pub fn push_error(&self, error: TransportError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> serde_json::Value {
        let requests = self.requests.lock().unwrap();
        let last = requests.last().expect("no request recorded");
        serde_json::from_slice(&last.body).expect("request body is JSON")
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn id(&self) -> &str {
        "mock"
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no response queued".into())))
    }
}
