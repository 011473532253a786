//! Request/response catalog, errors, and config for the Centrifugo server API.
//!
//! Every server API method has a request struct implementing [`ApiRequest`],
//! which ties it to its [`Method`] and its response type at compile time.

pub mod api;
pub mod batch;
pub mod config;
pub mod envelope;
pub mod error;
pub mod method;
pub mod types;

pub use api::*;
pub use batch::{AlignmentError, BatchCommand, BatchReply, BatchRequest, BatchResponse};
pub use envelope::Envelope;
pub use error::{ApiError, Error, Result, TransportError};
pub use method::{ApiRequest, Method};
pub use types::*;
