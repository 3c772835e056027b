use serde::{Deserialize, Serialize};

/// Concrete type for a [`crate::client::Client`] error
pub type Result<T> = std::result::Result<T, Error>;

/// Enum that represents a [`crate::client::Client`] error
///
/// Transport failures ([`Error::UnableToConnect`], [`Error::Timeout`], [`Error::Io`]) are out of the
/// node's control and may be retried by the caller. [`Error::Server`] carries whatever the node
/// answered (eg: [`crate::error::Error::BackendUnavailable`]).
#[derive(Debug, Serialize, Deserialize)]
pub enum Error {
    /// Variant returned when a client was unable to establish a tcp connection with a node
    UnableToConnect { reason: String },
    /// The node didn't answer within the client's request timeout
    Timeout { after_ms: u128 },
    /// Generic IO error (automatically converted from [`std::io::Error`])
    Io { reason: String },
    /// Variant returned if the client was unable to interpret the server response
    InvalidServerResponse { reason: String },
    /// The request was refused before being sent (eg: it doesn't fit in a single frame)
    InvalidRequest(crate::error::InvalidRequest),
    /// The node set the client was built with is unusable
    Configuration { reason: String },
    /// Error reported by the node that served the request
    Server(crate::error::Error),
    /// Tells the user of the Client library that it did something wrong (like calling connect twice)
    Logic { reason: String },
}

impl Error {
    /// Returns true for failures that happened on the way to (or back from) the node
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Error::UnableToConnect { .. } | Error::Timeout { .. } | Error::Io { .. }
        )
    }

    /// Returns true if the client that returned this error dropped its connection and
    /// has to reconnect before serving another request
    pub fn breaks_connection(&self) -> bool {
        self.is_transport_failure() || matches!(self, Error::InvalidServerResponse { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io {
            reason: value.to_string(),
        }
    }
}

impl From<crate::error::Error> for Error {
    fn from(value: crate::error::Error) -> Self {
        use crate::error::Error as TopLevelError;
        match value {
            TopLevelError::Io { reason } => Error::Io { reason },
            TopLevelError::Configuration { reason } => Error::Configuration { reason },
            TopLevelError::InvalidRequest(reason) => Error::InvalidRequest(reason),
            _ => Self::Server(value),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidServerResponse {
            reason: value.to_string(),
        }
    }
}
