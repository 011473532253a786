//! Typed async client for the Centrifugo server HTTP API.
//!
//! [`CentriAgent`] exposes one method per server API method. All of them go
//! through a single dispatcher that POSTs JSON to `{base_url}/{method}` via a
//! pluggable [`Transport`], unwraps the `{result, error}` envelope, and
//! reports each call to the agent's [`Hooks`].
//!
//! ```no_run
//! # async fn run() -> centri_agent::Result<()> {
//! use centri_agent::{CentriAgent, PublishRequest};
//!
//! let agent = CentriAgent::new("http://localhost:8000/api", "api-key")?;
//! agent.on_failed(|event| eprintln!("{} failed after {:?}", event.path, event.duration));
//! agent
//!     .publish(&PublishRequest::new("news", serde_json::json!({"text": "hi"})))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod connector;
pub mod hooks;
pub mod http;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use agent::{AgentBuilder, CentriAgent};
pub use centri_agent_core::config::{AgentConfig, InvalidJsonPolicy};
pub use centri_agent_core::*;
pub use connector::Connector;
pub use hooks::{HookEvent, Hooks, ListenerId, RequestEvent, RequestObserver, TracingObserver};
pub use http::HttpTransport;
pub use transport::{HttpRequest, HttpResponse, Transport};
