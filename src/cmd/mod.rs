//! Module that contains all commands implemented by a hashkv node.
//!
//! # Design principals
//! Commands have 2 responsibilities:
//!  1. Parse request params (basically serde_json calls)
//!  2. Construct responses that are sent back to callers
//!
//! Everything else should be delegated to the [`crate::node::StorageNode`].
pub mod delete;
pub mod get;
pub mod put;

use bytes::Bytes;
use delete::Delete as DeleteCommand;
use get::Get as GetCommand;
use put::Put as PutCommand;
use serde::Serialize;
use strum_macros::{Display, FromRepr};
use tracing::{event, instrument, Level};

use crate::{
    error::{Error, InvalidRequest, Result},
    node::StorageNode,
    server::message::Message,
};

/// Command ids used to figure out the layout of the payload to be parsed from a [`Message`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum CommandId {
    Get = 1,
    Put = 2,
    Delete = 3,
}

/// Command definition - this enum contains all commands implemented by a node.
#[derive(Debug)]
pub enum Command {
    Get(GetCommand),
    Put(PutCommand),
    Delete(DeleteCommand),
}

/// macro that tries to construct a specific [`Command`] from a [`Message`]
macro_rules! try_from_message_with_payload {
    ($message:expr, $t:ident) => {{
        (|| {
            if $message.cmd_id != $t::cmd_id() {
                return Err(Error::InvalidRequest(
                    InvalidRequest::UnableToConstructCommandFromMessage {
                        expected_id: $t::cmd_id() as u8,
                        got: $message.cmd_id as u8,
                    },
                ));
            }

            if let Some(payload) = $message.payload {
                let s: $t = serde_json::from_slice(&payload).map_err(|e| {
                    Error::InvalidRequest(InvalidRequest::InvalidJsonPayload(e.to_string()))
                })?;
                Ok(s)
            } else {
                return Err(Error::InvalidRequest(InvalidRequest::EmptyMessagePayload));
            }
        })()
    }};
}

impl Command {
    /// Executes a given command against the provided [`StorageNode`]
    #[instrument(name = "cmd::execute", level = "info", skip(node))]
    pub async fn execute(self, node: &StorageNode) -> Message {
        match self {
            Command::Get(cmd) => cmd.execute(node).await.into(),
            Command::Put(cmd) => cmd.execute(node).await.into(),
            Command::Delete(cmd) => cmd.execute(node).await.into(),
        }
    }

    /// Tries to construct a [`Command`] from the provided [`Message`]
    ///
    /// # Errors
    /// returns an error if the payload doesn't conform with the specified [`Command`]
    #[instrument(level = "debug")]
    pub fn try_from_message(message: Message) -> Result<Command> {
        match message.cmd_id {
            CommandId::Get => Ok(Command::Get(try_from_message_with_payload!(
                message, GetCommand
            )?)),
            CommandId::Put => Ok(Command::Put(try_from_message_with_payload!(
                message, PutCommand
            )?)),
            CommandId::Delete => Ok(Command::Delete(try_from_message_with_payload!(
                message,
                DeleteCommand
            )?)),
        }
    }
}

/// Serializes a request or response into a [`Message`] payload.
///
/// Every type sent on the wire is made of strings (keys and values are hex encoded),
/// so json serialization can't fail for them.
pub(crate) fn json_payload<T: Serialize>(v: &T) -> Option<Bytes> {
    match serde_json::to_vec(v) {
        Ok(serialized) => Some(Bytes::from(serialized)),
        Err(err) => {
            event!(Level::ERROR, "Unable to serialize payload: {}", err);
            None
        }
    }
}

/// Error response for requests that can't be turned into a [`Command`] (eg: bad json payload)
pub struct FailedRequest {
    pub cmd_id: CommandId,
    pub err: Error,
}

impl crate::server::message::IntoMessage for FailedRequest {
    fn cmd_id(&self) -> CommandId {
        self.cmd_id
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(&Err::<(), &Error>(&self.err))
    }
}
