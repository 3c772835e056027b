//! Get [`crate::cmd::Command`]
//!
//! A missing key is answered with [`GetResponse::NotFound`], a tagged variant that can't be
//! confused with a stored value - even one whose content is the string "Not found".
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cmd::{json_payload, CommandId};
use crate::error::Result;
use crate::node::{Lookup, StorageNode};
use crate::server::message::IntoMessage;
use crate::utils::serde_hex_bytes;

#[derive(Debug, Serialize, Deserialize)]
pub struct Get {
    #[serde(with = "serde_hex_bytes")]
    key: Bytes,
}

impl Get {
    pub fn new(key: Bytes) -> Self {
        Self { key }
    }

    #[instrument(name = "cmd::get", level = "info", skip(node))]
    pub async fn execute(self, node: &StorageNode) -> Result<GetResponse> {
        Ok(node.get(&self.key).await?.into())
    }

    pub fn cmd_id() -> CommandId {
        CommandId::Get
    }
}

impl IntoMessage for Get {
    fn cmd_id(&self) -> CommandId {
        Self::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(self)
    }
}

/// [`Get`] deserialized response payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GetResponse {
    Found {
        #[serde(with = "serde_hex_bytes")]
        value: Bytes,
    },
    NotFound,
}

impl From<Lookup> for GetResponse {
    fn from(lookup: Lookup) -> Self {
        match lookup {
            Lookup::Found(value) => Self::Found { value },
            Lookup::NotFound => Self::NotFound,
        }
    }
}

impl From<GetResponse> for Lookup {
    fn from(response: GetResponse) -> Self {
        match response {
            GetResponse::Found { value } => Self::Found(value),
            GetResponse::NotFound => Self::NotFound,
        }
    }
}

impl IntoMessage for Result<GetResponse> {
    fn cmd_id(&self) -> CommandId {
        Get::cmd_id()
    }

    fn payload(&self) -> Option<Bytes> {
        json_payload(self)
    }
}
