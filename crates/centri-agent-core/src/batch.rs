//! Batch commands and positionally aligned replies.
//!
//! On the wire a command is a one-key object naming its method:
//! `{"publish": {"channel": "news", "data": {}}}`. Replies use the same
//! tagging, with `{"error": {...}}` standing in for a failed command.

use serde::{Deserialize, Serialize};

use crate::api::*;
use crate::error::{ApiError, Error};
use crate::method::{ApiRequest, Method};
use crate::types::ErrorBody;

/// One command inside a batch. `batch` itself cannot be nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCommand {
    Publish(PublishRequest),
    Broadcast(BroadcastRequest),
    Subscribe(SubscribeRequest),
    Unsubscribe(UnsubscribeRequest),
    Disconnect(DisconnectRequest),
    Refresh(RefreshRequest),
    Presence(PresenceRequest),
    PresenceStats(PresenceStatsRequest),
    History(HistoryRequest),
    HistoryRemove(HistoryRemoveRequest),
    Channels(ChannelsRequest),
    Info(InfoRequest),
}

/// Result of one command, matching the command at the same position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchReply {
    Publish(PublishResponse),
    Broadcast(BroadcastResponse),
    Subscribe(SubscribeResponse),
    Unsubscribe(UnsubscribeResponse),
    Disconnect(DisconnectResponse),
    Refresh(RefreshResponse),
    Presence(PresenceResponse),
    PresenceStats(PresenceStatsResponse),
    History(HistoryResponse),
    HistoryRemove(HistoryRemoveResponse),
    Channels(ChannelsResponse),
    Info(InfoResponse),
    Error(ErrorBody),
}

macro_rules! batch_variants {
    ($($variant:ident($request:ty, $response:ty);)*) => {
        impl BatchCommand {
            pub fn method(&self) -> Method {
                match self {
                    $(BatchCommand::$variant(_) => Method::$variant,)*
                }
            }
        }

        impl BatchReply {
            /// Method this reply answers; `None` for an error reply.
            pub fn method(&self) -> Option<Method> {
                match self {
                    $(BatchReply::$variant(_) => Some(Method::$variant),)*
                    BatchReply::Error(_) => None,
                }
            }
        }

        $(
            impl From<$request> for BatchCommand {
                fn from(request: $request) -> Self {
                    BatchCommand::$variant(request)
                }
            }

            impl TryFrom<BatchReply> for $response {
                type Error = BatchReply;

                fn try_from(reply: BatchReply) -> Result<Self, BatchReply> {
                    match reply {
                        BatchReply::$variant(response) => Ok(response),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

batch_variants! {
    Publish(PublishRequest, PublishResponse);
    Broadcast(BroadcastRequest, BroadcastResponse);
    Subscribe(SubscribeRequest, SubscribeResponse);
    Unsubscribe(UnsubscribeRequest, UnsubscribeResponse);
    Disconnect(DisconnectRequest, DisconnectResponse);
    Refresh(RefreshRequest, RefreshResponse);
    Presence(PresenceRequest, PresenceResponse);
    PresenceStats(PresenceStatsRequest, PresenceStatsResponse);
    History(HistoryRequest, HistoryResponse);
    HistoryRemove(HistoryRemoveRequest, HistoryRemoveResponse);
    Channels(ChannelsRequest, ChannelsResponse);
    Info(InfoRequest, InfoResponse);
}

impl BatchReply {
    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            BatchReply::Error(body) => Some(body),
            _ => None,
        }
    }

    /// Take the typed response for request type `R` out of this reply.
    ///
    /// An error reply becomes [`Error::Api`]; a reply for another method
    /// becomes [`Error::UnexpectedReply`].
    pub fn into_response<R>(self) -> crate::Result<R::Response>
    where
        R: ApiRequest,
        R::Response: TryFrom<BatchReply, Error = BatchReply>,
    {
        if let BatchReply::Error(body) = self {
            return Err(Error::Api(ApiError::from_body(body, Method::Batch.path())));
        }
        <R::Response as TryFrom<BatchReply>>::try_from(self).map_err(|other| Error::UnexpectedReply {
            expected: R::METHOD,
            found: other.method(),
        })
    }
}

/// Commands executed by one `batch` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub commands: Vec<BatchCommand>,
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: impl Into<BatchCommand>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn push(&mut self, command: impl Into<BatchCommand>) {
        self.commands.push(command.into());
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<C: Into<BatchCommand>> FromIterator<C> for BatchRequest {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Replies in the order the server returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub replies: Vec<BatchReply>,
}

/// Replies that do not line up with the commands that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentError {
    #[error("batch sent {commands} commands but got {replies} replies")]
    Length { commands: usize, replies: usize },

    #[error("batch reply {index} answers {found}, expected {expected}")]
    Method {
        index: usize,
        expected: Method,
        found: Method,
    },
}

impl BatchResponse {
    /// Check that reply `i` answers command `i` for every position.
    ///
    /// Error replies match any command.
    pub fn check_alignment(&self, commands: &[BatchCommand]) -> Result<(), AlignmentError> {
        if commands.len() != self.replies.len() {
            return Err(AlignmentError::Length {
                commands: commands.len(),
                replies: self.replies.len(),
            });
        }
        for (index, (command, reply)) in commands.iter().zip(&self.replies).enumerate() {
            let Some(found) = reply.method() else {
                continue;
            };
            if found != command.method() {
                return Err(AlignmentError::Method {
                    index,
                    expected: command.method(),
                    found,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }
}
