//! Put [`crate::cmd::Command`] - creates or overwrites a key (last write wins)
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cmd::{json_payload, CommandId};
use crate::error::Result;
use crate::node::StorageNode;
use crate::server::message::IntoMessage;
use crate::utils::serde_hex_bytes;

#[derive(Debug, Serialize, Deserialize)]
pub struct Put {
    #[serde(with = "serde_hex_bytes")]
    key: Bytes,
    #[serde(with = "serde_hex_bytes")]
    value: Bytes,
}

impl Put {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    #[instrument(name = "cmd::put", level = "info", skip(self, node))]
    pub async fn execute(self, node: &StorageNode) -> Result<PutResponse> {
        node.put(self.key, self.value).await?;
        Ok(PutResponse {
            message: "Ok".to_string(),
        })
    }

    pub fn cmd_id() -> CommandId {
        CommandId::Put
    }
}

impl IntoMessage for Put {
    fn cmd_id(&self) -> CommandId {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(self)
    }
}

/// [`Put`] deserialized response payload (an ack)
#[derive(Debug, Serialize, Deserialize)]
pub struct PutResponse {
    pub message: String,
}

impl IntoMessage for Result<PutResponse> {
    fn cmd_id(&self) -> CommandId {
        Put::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(self)
    }
}
