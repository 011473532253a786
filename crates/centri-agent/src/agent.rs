//! One async method per server API method.
//!
//! Every method delegates to [`CentriAgent::request`], which sends through
//! the [`Connector`], unwraps the envelope, and fires the agent's hooks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use centri_agent_core::config::{AgentConfig, InvalidJsonPolicy};
use centri_agent_core::*;

use crate::connector::Connector;
use crate::hooks::{HookEvent, Hooks, ListenerId, RequestEvent, RequestObserver};
use crate::http::HttpTransport;
use crate::transport::Transport;

/// Client for the server HTTP API. Cheap to clone; clones share hooks and
/// the underlying transport.
#[derive(Clone)]
pub struct CentriAgent {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Connector,
    hooks: Hooks,
}

impl CentriAgent {
    /// Agent over the default reqwest transport, no timeout.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::builder(url, api_key).build()
    }

    pub fn builder(url: impl Into<String>, api_key: impl Into<String>) -> AgentBuilder {
        AgentBuilder {
            url: url.into(),
            api_key: api_key.into(),
            transport: None,
            timeout: None,
            invalid_json: InvalidJsonPolicy::default(),
            observers: Vec::new(),
        }
    }

    /// Build from a validated [`AgentConfig`].
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        config.validate()?;
        let url = config
            .resolve_url()
            .ok_or_else(|| Error::Config("no API url".into()))?;
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| Error::Config("no API key".into()))?;

        let mut builder = Self::builder(url, api_key).invalid_json(config.invalid_json);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        self.inner.connector.base_url()
    }

    pub fn hooks(&self) -> &Hooks {
        &self.inner.hooks
    }

    pub fn on_fulfilled<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RequestEvent) + Send + Sync + 'static,
    {
        self.inner.hooks.on_fulfilled(listener)
    }

    pub fn on_failed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RequestEvent) + Send + Sync + 'static,
    {
        self.inner.hooks.on_failed(listener)
    }

    /// Send a typed request to its method's path and decode the typed result.
    pub async fn request<R: ApiRequest>(&self, request: &R) -> Result<R::Response> {
        self.dispatch(R::METHOD.path(), request).await
    }

    /// Send an arbitrary JSON body to `path` (`"/info"` or `"info"`).
    ///
    /// Same envelope handling and hooks as the typed methods; the result is
    /// returned as raw JSON.
    pub async fn call(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self.dispatch(&path, body).await
    }

    async fn dispatch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let start = Instant::now();
        let outcome = self.exchange(path, body).await;
        let duration = start.elapsed();

        match &outcome {
            Ok(_) => {
                debug!(path, elapsed_ms = duration.as_millis() as u64, "API request fulfilled");
                self.notify(HookEvent::Fulfilled, path, duration, None);
            }
            Err(e) => {
                debug!(path, elapsed_ms = duration.as_millis() as u64, error = %e, "API request failed");
                self.notify(HookEvent::Failed, path, duration, Some(e.to_string()));
            }
        }
        outcome
    }

    async fn exchange<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let raw = self.inner.connector.send(path, body).await?;
        let envelope: Envelope = serde_json::from_value(raw).map_err(|source| Error::Decode {
            path: path.to_string(),
            source,
        })?;
        let result = envelope.into_value(path)?;
        serde_json::from_value(result).map_err(|source| Error::Decode {
            path: path.to_string(),
            source,
        })
    }

    fn notify(&self, event: HookEvent, path: &str, duration: Duration, error: Option<String>) {
        let info = RequestEvent {
            path: path.to_string(),
            duration,
            error,
        };
        self.inner.hooks.fire(event, &info);
    }

    /// Publish data into a channel.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishResponse> {
        self.request(request).await
    }

    /// Publish the same data into many channels.
    pub async fn broadcast(&self, request: &BroadcastRequest) -> Result<BroadcastResponse> {
        self.request(request).await
    }

    /// Subscribe a user's active sessions to a channel.
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<SubscribeResponse> {
        self.request(request).await
    }

    pub async fn unsubscribe(&self, request: &UnsubscribeRequest) -> Result<UnsubscribeResponse> {
        self.request(request).await
    }

    /// Disconnect a user, or one of their clients.
    pub async fn disconnect(&self, request: &DisconnectRequest) -> Result<DisconnectResponse> {
        self.request(request).await
    }

    /// Refresh a user's connection (e.g. extend its expiry).
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse> {
        self.request(request).await
    }

    /// Clients currently subscribed to a channel.
    pub async fn presence(&self, request: &PresenceRequest) -> Result<PresenceResponse> {
        self.request(request).await
    }

    pub async fn presence_stats(&self, request: &PresenceStatsRequest) -> Result<PresenceStatsResponse> {
        self.request(request).await
    }

    /// Channel history, optionally from a stream position.
    pub async fn history(&self, request: &HistoryRequest) -> Result<HistoryResponse> {
        self.request(request).await
    }

    pub async fn history_remove(&self, request: &HistoryRemoveRequest) -> Result<HistoryRemoveResponse> {
        self.request(request).await
    }

    /// Active channels, optionally filtered by pattern.
    pub async fn channels(&self, request: &ChannelsRequest) -> Result<ChannelsResponse> {
        self.request(request).await
    }

    /// Server node information.
    pub async fn info(&self, request: &InfoRequest) -> Result<InfoResponse> {
        self.request(request).await
    }

    /// Run several commands in one call. Replies come back in server order,
    /// unvalidated; see [`BatchResponse::check_alignment`].
    pub async fn batch(&self, request: &BatchRequest) -> Result<BatchResponse> {
        self.request(request).await
    }
}

/// Builder for [`CentriAgent`].
pub struct AgentBuilder {
    url: String,
    api_key: String,
    transport: Option<Arc<dyn Transport>>,
    timeout: Option<Duration>,
    invalid_json: InvalidJsonPolicy,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl AgentBuilder {
    /// Use a custom transport. A `timeout` set on the builder is then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn invalid_json(mut self, policy: InvalidJsonPolicy) -> Self {
        self.invalid_json = policy;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Result<CentriAgent> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.timeout)?),
        };
        let connector =
            Connector::new(&self.url, self.api_key, transport).with_invalid_json(self.invalid_json);

        let hooks = Hooks::new();
        for observer in self.observers {
            hooks.observe(observer);
        }

        debug!(
            base_url = connector.base_url(),
            transport = connector.transport_id(),
            "Agent created"
        );
        Ok(CentriAgent {
            inner: Arc::new(Inner { connector, hooks }),
        })
    }
}
