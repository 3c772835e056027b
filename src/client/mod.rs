//! Module that contains the Client API for all public commands implemented by a hashkv node.
//!
//! [`Client`] talks to a single node. [`routed::RoutedClient`] owns the node set, routes every key
//! to its owner and issues exactly one request against that node.
use crate::{
    cmd::{delete::DeleteResponse, get::GetResponse, put::PutResponse, CommandId},
    server::message::Message,
};

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;

pub mod db_client;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod routed;

use error::{Error, Result};

/// Trait that defines which functions a hashkv client needs to implement
#[async_trait]
pub trait Client {
    /// Starts a connection with a node
    async fn connect(&mut self) -> Result<()>;
    /// Get command interface
    async fn get(&mut self, key: Bytes) -> Result<GetResponse>;
    /// Put command interface
    async fn put(&mut self, key: Bytes, value: Bytes) -> Result<PutResponse>;
    /// Delete command interface
    async fn delete(&mut self, key: Bytes) -> Result<DeleteResponse>;
}

/// Factory is the abstraction that allows different [`Client`] implementations to be used by [`routed::RoutedClient`]
#[async_trait]
pub trait Factory {
    /// the factory method that receives an addr String and returns a connected trait object for [`Client`]
    async fn get(&self, addr: String) -> Result<Box<dyn Client + Send>>;
}

/// Turns a response [`Message`] into the expected response payload.
///
/// The payload is a json encoded `Result<T, crate::error::Error>`; an `Err` is returned as [`Error::Server`].
pub(crate) fn parse_response<T: DeserializeOwned>(
    response: Message,
    expected_cmd_id: CommandId,
) -> Result<T> {
    if response.cmd_id != expected_cmd_id {
        return Err(Error::InvalidServerResponse {
            reason: format!(
                "expected a {} response, got {}",
                expected_cmd_id, response.cmd_id
            ),
        });
    }

    let payload = response.payload.ok_or(Error::InvalidServerResponse {
        reason: "empty response payload".to_string(),
    })?;

    let result: std::result::Result<T, crate::error::Error> = serde_json::from_slice(&payload)?;
    result.map_err(Error::Server)
}
