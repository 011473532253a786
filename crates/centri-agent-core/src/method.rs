//! Server API method names and the request → response mapping.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The fixed set of server API methods.
///
/// Reference: <https://centrifugal.dev/docs/server/server_api>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Publish,
    Broadcast,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Refresh,
    Presence,
    PresenceStats,
    History,
    HistoryRemove,
    Channels,
    Info,
    Batch,
}

impl Method {
    pub const ALL: [Method; 13] = [
        Method::Publish,
        Method::Broadcast,
        Method::Subscribe,
        Method::Unsubscribe,
        Method::Disconnect,
        Method::Refresh,
        Method::Presence,
        Method::PresenceStats,
        Method::History,
        Method::HistoryRemove,
        Method::Channels,
        Method::Info,
        Method::Batch,
    ];

    /// Wire name of the method (also the last path segment).
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Publish => "publish",
            Method::Broadcast => "broadcast",
            Method::Subscribe => "subscribe",
            Method::Unsubscribe => "unsubscribe",
            Method::Disconnect => "disconnect",
            Method::Refresh => "refresh",
            Method::Presence => "presence",
            Method::PresenceStats => "presence_stats",
            Method::History => "history",
            Method::HistoryRemove => "history_remove",
            Method::Channels => "channels",
            Method::Info => "info",
            Method::Batch => "batch",
        }
    }

    /// Request path relative to the API base URL, e.g. `/presence_stats`.
    pub fn path(self) -> &'static str {
        match self {
            Method::Publish => "/publish",
            Method::Broadcast => "/broadcast",
            Method::Subscribe => "/subscribe",
            Method::Unsubscribe => "/unsubscribe",
            Method::Disconnect => "/disconnect",
            Method::Refresh => "/refresh",
            Method::Presence => "/presence",
            Method::PresenceStats => "/presence_stats",
            Method::History => "/history",
            Method::HistoryRemove => "/history_remove",
            Method::Channels => "/channels",
            Method::Info => "/info",
            Method::Batch => "/batch",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_start_matches('/');
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| crate::Error::UnknownMethod(s.to_string()))
    }
}

mod sealed {
    pub trait Sealed {}
}

pub(crate) use sealed::Sealed;

/// A typed server API request.
///
/// Implemented exactly once per [`Method`]; the set is closed.
pub trait ApiRequest: Serialize + Sealed {
    /// Method this request is sent to.
    const METHOD: Method;

    /// Shape of the envelope's `result` for this method.
    type Response: DeserializeOwned;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_slash_plus_name() {
        for method in Method::ALL {
            assert_eq!(method.path(), format!("/{}", method.as_str()));
        }
    }

    #[test]
    fn test_from_str_accepts_path_and_name() {
        assert_eq!("presence_stats".parse::<Method>().unwrap(), Method::PresenceStats);
        assert_eq!("/history_remove".parse::<Method>().unwrap(), Method::HistoryRemove);
        assert!("publish_all".parse::<Method>().is_err());
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        for method in Method::ALL {
            let json = serde_json::to_value(method).unwrap();
            assert_eq!(json, serde_json::Value::String(method.as_str().into()));
        }
    }
}
