//! Delete [`crate::cmd::Command`]
//!
//! Deleting a key that doesn't exist is acked just like deleting an existing one.
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cmd::{json_payload, CommandId};
use crate::error::Result;
use crate::node::StorageNode;
use crate::server::message::IntoMessage;
use crate::utils::serde_hex_bytes;

#[derive(Debug, Serialize, Deserialize)]
pub struct Delete {
    #[serde(with = "serde_hex_bytes")]
    key: Bytes,
}

impl Delete {
    pub fn new(key: Bytes) -> Self {
        Self { key }
    }

    #[instrument(name = "cmd::delete", level = "info", skip(node))]
    pub async fn execute(self, node: &StorageNode) -> Result<DeleteResponse> {
        node.delete(&self.key).await?;
        Ok(DeleteResponse {
            message: "Ok".to_string(),
        })
    }

    pub fn cmd_id() -> CommandId {
        CommandId::Delete
    }
}

impl IntoMessage for Delete {
    fn cmd_id(&self) -> CommandId {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(self)
    }
}

/// [`Delete`] deserialized response payload (an ack)
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl IntoMessage for Result<DeleteResponse> {
    fn cmd_id(&self) -> CommandId {
        Delete::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(self)
    }
}
