//! This module defines client/user visible errors that can be returned by a hashkv node.
//!
//! Note that a missing key is *not* an error: [`crate::node::Lookup::NotFound`] is a regular
//! outcome of a GET and never flows through this type.

use std::fmt::Display;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::utils::serde_hex_bytes;

pub type Result<T> = std::result::Result<T, Error>;

/// Error enum with all possible variants
#[derive(Debug, Serialize, Deserialize)]
pub enum Error {
    /// The node set or a config file is unusable (eg: empty node list). Never retryable.
    Configuration { reason: String },
    /// The storage backend could not be reached or reported a failure
    BackendUnavailable { reason: String },
    /// The node was configured to reject keys it doesn't own and received one
    WrongNode {
        #[serde(with = "serde_hex_bytes")]
        owner: Bytes,
    },
    InvalidRequest(InvalidRequest),
    Internal { reason: String },
    Io { reason: String },
}

impl Error {
    /// Returns true if this is an instance of a [`Error::BackendUnavailable`] variant
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Error::BackendUnavailable { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            reason: err.to_string(),
        }
    }
}

impl From<crate::storage_engine::Error> for Error {
    fn from(err: crate::storage_engine::Error) -> Self {
        Self::BackendUnavailable {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration {
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum InvalidRequest {
    MaxMessageSizeExceeded { max: u32, got: u32 },
    MessageReceivedWithoutRequestId,
    MessageRequestIdMustBeUtf8Encoded,
    UnableToConstructCommandFromMessage { expected_id: u8, got: u8 },
    InvalidJsonPayload(String),
    EmptyMessagePayload,
    UnrecognizedCommand { id: u8 },
}
