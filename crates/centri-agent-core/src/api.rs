//! Request and response shapes for every server API method.
//!
//! Optional request fields are omitted from the JSON body when unset, so the
//! body sent over the wire is exactly what the caller built. Response fields
//! all have defaults because the server drops zero values.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchRequest, BatchResponse};
use crate::method::{ApiRequest, Method, Sealed};
use crate::types::{ChannelInfo, ClientInfo, NodeInfo, Publication, StreamPosition, SubscribeOverride};

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent field is `None`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

// --- publish ---

/// Reference: <https://centrifugal.dev/docs/server/server_api#publish>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub channel: String,
    /// `None` only for binary payloads; a JSON `null` is sent as `"data": null`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<bool>,
}

impl PublishRequest {
    pub fn new(channel: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            channel: channel.into(),
            data: Some(data),
            ..Default::default()
        }
    }

    /// Publish raw bytes; they travel base64-encoded in `b64data`.
    pub fn with_binary(channel: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            channel: channel.into(),
            b64data: Some(BASE64.encode(bytes)),
            ..Default::default()
        }
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn skip_history(mut self, skip: bool) -> Self {
        self.skip_history = Some(skip);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn delta(mut self, delta: bool) -> Self {
        self.delta = Some(delta);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
}

// --- broadcast ---

/// Same options as [`PublishRequest`], sent to several channels at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub channels: Vec<String>,
    /// `None` only for binary payloads; a JSON `null` is sent as `"data": null`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<bool>,
}

impl BroadcastRequest {
    pub fn new<I, S>(channels: I, data: serde_json::Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn with_binary<I, S>(channels: I, bytes: &[u8]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            b64data: Some(BASE64.encode(bytes)),
            ..Default::default()
        }
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// One entry per channel, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub responses: Vec<PublishResponse>,
}

// --- subscribe ---

/// Reference: <https://centrifugal.dev/docs/server/server_api#subscribe>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub user: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recover_since: Option<StreamPosition>,
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_options: Option<SubscribeOverride>,
}

impl SubscribeRequest {
    pub fn new(user: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            channel: channel.into(),
            ..Default::default()
        }
    }

    pub fn client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn recover_since(mut self, position: StreamPosition) -> Self {
        self.recover_since = Some(position);
        self
    }

    /// Attach binary channel info, base64-encoded into `b64info`.
    pub fn with_binary_info(mut self, bytes: &[u8]) -> Self {
        self.b64info = Some(BASE64.encode(bytes));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResponse {}

// --- unsubscribe ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub user: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl UnsubscribeRequest {
    pub fn new(user: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            channel: channel.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeResponse {}

// --- disconnect ---

/// Custom disconnect code and reason sent to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disconnect {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub reason: String,
}

/// Reference: <https://centrifugal.dev/docs/server/server_api#disconnect>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectRequest {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnect: Option<Disconnect>,
}

impl DisconnectRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn reason(mut self, code: u32, reason: impl Into<String>) -> Self {
        self.disconnect = Some(Disconnect {
            code,
            reason: reason.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub reason: String,
}

// --- refresh ---

/// Reference: <https://centrifugal.dev/docs/server/server_api#refresh>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
}

impl RefreshRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn expired(mut self, expired: bool) -> Self {
        self.expired = Some(expired);
        self
    }

    pub fn expire_at_time(mut self, at: DateTime<Utc>) -> Self {
        self.expire_at = Some(at.timestamp());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {}

// --- presence ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRequest {
    pub channel: String,
}

impl PresenceRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

/// Connected clients keyed by client ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenceResponse {
    #[serde(default)]
    pub presence: HashMap<String, ClientInfo>,
}

// --- presence_stats ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceStatsRequest {
    pub channel: String,
}

impl PresenceStatsRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceStatsResponse {
    #[serde(default)]
    pub num_clients: u32,
    #[serde(default)]
    pub num_users: u32,
}

// --- history ---

/// Reference: <https://centrifugal.dev/docs/server/server_api#history>
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<StreamPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
}

impl HistoryRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn since(mut self, position: StreamPosition) -> Self {
        self.since = Some(position);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub epoch: String,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub publications: Vec<Publication>,
}

impl HistoryResponse {
    /// Current top of the stream.
    pub fn position(&self) -> StreamPosition {
        StreamPosition::new(self.offset, self.epoch.clone())
    }
}

// --- history_remove ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRemoveRequest {
    pub channel: String,
}

impl HistoryRemoveRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRemoveResponse {}

// --- channels ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ChannelsRequest {
    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
        }
    }
}

/// Active channels keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsResponse {
    #[serde(default)]
    pub channels: HashMap<String, ChannelInfo>,
}

// --- info ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
}

macro_rules! api_requests {
    ($($request:ty => $method:ident, $response:ty;)*) => {
        $(
            impl Sealed for $request {}

            impl ApiRequest for $request {
                const METHOD: Method = Method::$method;
                type Response = $response;
            }
        )*
    };
}

api_requests! {
    PublishRequest => Publish, PublishResponse;
    BroadcastRequest => Broadcast, BroadcastResponse;
    SubscribeRequest => Subscribe, SubscribeResponse;
    UnsubscribeRequest => Unsubscribe, UnsubscribeResponse;
    DisconnectRequest => Disconnect, DisconnectResponse;
    RefreshRequest => Refresh, RefreshResponse;
    PresenceRequest => Presence, PresenceResponse;
    PresenceStatsRequest => PresenceStats, PresenceStatsResponse;
    HistoryRequest => History, HistoryResponse;
    HistoryRemoveRequest => HistoryRemove, HistoryRemoveResponse;
    ChannelsRequest => Channels, ChannelsResponse;
    InfoRequest => Info, InfoResponse;
    BatchRequest => Batch, BatchResponse;
}
