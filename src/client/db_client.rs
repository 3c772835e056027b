//! A concrete [`Client`] implementation that talks to a node over TCP
//!
//! Every request is bounded by a timeout. A request that times out, fails with an IO error or gets
//! back a frame that doesn't answer it drops the connection, since the stream position is no longer
//! known. Such errors report [`Error::breaks_connection`] and the client has to `connect` again.
//! The client does not retry: callers decide their own retry policy.
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{event, instrument, Level};

use crate::cmd::delete::{Delete, DeleteResponse};
use crate::cmd::get::{Get, GetResponse};
use crate::cmd::put::{Put, PutResponse};
use crate::error::Error as NodeError;
use crate::server::message::{IntoMessage, Message};
use crate::utils::generate_random_ascii_string;

use super::error::{Error, Result};
use super::{parse_response, Client, Factory};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const REQUEST_ID_LEN: usize = 16;

/// DbClient handle
#[derive(Debug)]
pub struct DbClient {
    addr: String,
    request_timeout: Duration,
    /// state stores the [`DbClientState`] of this implementation
    state: DbClientState,
}

/// A [`DbClient`] can either be Connected or Disconnected
#[derive(Debug)]
enum DbClientState {
    Disconnected,
    Connected { connection: TcpStream },
}

impl DbClient {
    pub fn new(addr: String) -> Self {
        Self::with_timeout(addr, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(addr: String, request_timeout: Duration) -> Self {
        Self {
            addr,
            request_timeout,
            state: DbClientState::Disconnected,
        }
    }

    fn get_conn_mut(&mut self) -> Result<&mut TcpStream> {
        match &mut self.state {
            DbClientState::Connected { connection } => Ok(connection),
            DbClientState::Disconnected => Err(Error::Logic {
                reason: "DbClient is not connected, call `connect` first".to_string(),
            }),
        }
    }

    #[instrument(level = "debug", skip(self, cmd))]
    async fn request<C, T>(&mut self, cmd: C) -> Result<T>
    where
        C: IntoMessage + Send,
        T: DeserializeOwned,
    {
        let mut message = Message::from(cmd);
        message.request_id = generate_random_ascii_string(REQUEST_ID_LEN);
        let cmd_id = message.cmd_id;
        let request_id = message.request_id.clone();
        message.ensure_within_size_limit()?;
        let req = message.serialize();

        let request_timeout = self.request_timeout;
        let conn = self.get_conn_mut()?;
        let exchange = async {
            conn.write_all(&req).await?;
            Message::try_from_async_read(conn).await
        };

        let outcome = tokio::time::timeout(request_timeout, exchange).await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(NodeError::Io { reason })) => {
                self.state = DbClientState::Disconnected;
                return Err(Error::Io { reason });
            }
            Ok(Err(err)) => {
                // the node didn't send this error, the frame it sent couldn't be parsed
                self.state = DbClientState::Disconnected;
                return Err(Error::InvalidServerResponse {
                    reason: err.to_string(),
                });
            }
            Err(_) => {
                event!(Level::WARN, "request {} timed out", request_id);
                self.state = DbClientState::Disconnected;
                return Err(Error::Timeout {
                    after_ms: request_timeout.as_millis(),
                });
            }
        };

        if response.request_id != request_id {
            self.state = DbClientState::Disconnected;
            return Err(Error::InvalidServerResponse {
                reason: format!(
                    "response for request {} received while waiting for {}",
                    response.request_id, request_id
                ),
            });
        }

        parse_response(response, cmd_id)
    }
}

#[async_trait]
impl Client for DbClient {
    async fn connect(&mut self) -> Result<()> {
        match &self.state {
            DbClientState::Disconnected => {
                let connection =
                    tokio::time::timeout(self.request_timeout, TcpStream::connect(&self.addr))
                        .await
                        .map_err(|_| Error::Timeout {
                            after_ms: self.request_timeout.as_millis(),
                        })??;
                self.state = DbClientState::Connected { connection };
            }
            DbClientState::Connected { .. } => {
                return Err(Error::Logic {
                    reason: "called `connect` twice on a DbClient".to_string(),
                });
            }
        }

        Ok(())
    }

    async fn get(&mut self, key: Bytes) -> Result<GetResponse> {
        self.request(Get::new(key)).await
    }

    async fn put(&mut self, key: Bytes, value: Bytes) -> Result<PutResponse> {
        self.request(Put::new(key, value)).await
    }

    async fn delete(&mut self, key: Bytes) -> Result<DeleteResponse> {
        self.request(Delete::new(key)).await
    }
}

pub struct DbClientFactory {
    request_timeout: Duration,
}

impl DbClientFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for DbClientFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl Factory for DbClientFactory {
    async fn get(&self, addr: String) -> Result<Box<dyn Client + Send>> {
        let mut client = DbClient::with_timeout(addr, self.request_timeout);
        client.connect().await.map_err(|e| Error::UnableToConnect {
            reason: e.to_string(),
        })?;

        Ok(Box::new(client))
    }
}
