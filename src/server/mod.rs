//! This file contains 2 things
//!  1. the TCP listener implementation
//!    - It accepts tcp connections
//!    - tries to parse a [`Message`] out of the connection
//!    - tries to construct a [`Command`] out of the parsed Message
//!    - executes the command against the node's [`StorageNode`]
//!    - writes the response back to the client
//!  2. The Request protocol
//!    - currently a simple header (cmd,request_id,length) and a json encoded payload (see [`message`])
//!
//! Every connection is served by its own task, so requests coming from different connections are
//! handled concurrently. The only state they share is the storage engine.
use crate::cmd::{Command, FailedRequest};
use crate::error::Error;
use crate::node::{Ownership, StorageNode};
use crate::storage_engine::in_memory::InMemory;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
};
use tracing::{event, instrument, Level};

use self::config::Config;
use self::message::Message;

pub mod config;
pub mod message;

tokio::task_local! {
    /// Request id of the request being served by the current task
    pub static REQUEST_ID: String;
}

pub struct Server {
    client_listener: TcpListener,
    node: Arc<StorageNode>,
}

impl Server {
    pub async fn from_config(path: PathBuf) -> anyhow::Result<Self> {
        let c = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&c)?;
        Self::from_node_config(config).await
    }

    pub async fn from_node_config(config: Config) -> anyhow::Result<Self> {
        let client_listener =
            TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

        let storage_engine = match config.storage_engine {
            config::StorageEngine::InMemory { max_bytes: None } => Arc::new(InMemory::default()),
            config::StorageEngine::InMemory {
                max_bytes: Some(max_bytes),
            } => Arc::new(InMemory::with_capacity_limit(max_bytes)),
        };

        let mut node = StorageNode::new(storage_engine);
        if let Some(ownership) = config.ownership {
            node = node.with_ownership(Ownership::new(
                ownership.directory,
                Bytes::from(ownership.own_addr),
                ownership.misrouted_requests,
            )?);
        }

        Ok(Self {
            client_listener,
            node: Arc::new(node),
        })
    }

    pub fn client_listener_local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.client_listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` resolves
    pub async fn run(&mut self, shutdown: impl Future) -> anyhow::Result<()> {
        event!(
            Level::INFO,
            "Listener started on {:?}",
            self.client_listener.local_addr()
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.client_listener.accept() => {
                    let (tcp_stream, peer) = accepted?;
                    let node = self.node.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(tcp_stream, node).await {
                            event!(Level::WARN, "connection with {} closed: {}", peer, err);
                        }
                    });
                }
                _ = &mut shutdown => {
                    event!(Level::INFO, "Shutting down listener");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[instrument(level = "debug", skip(node))]
async fn handle_connection(mut tcp_stream: TcpStream, node: Arc<StorageNode>) -> anyhow::Result<()> {
    loop {
        let request = match Message::try_from_async_read(&mut tcp_stream).await {
            Ok(request) => request,
            Err(Error::Io { .. }) => {
                // peer closed the connection (or it broke). Either way there's no one to answer to
                event!(Level::DEBUG, "connection closed by peer");
                return Ok(());
            }
            Err(err) => {
                // a malformed frame leaves the stream in an unknown position, so drop the connection
                return Err(err.into());
            }
        };

        let request_id = request.request_id.clone();
        let response = REQUEST_ID
            .scope(request_id, async {
                let cmd_id = request.cmd_id;
                let message = match Command::try_from_message(request) {
                    Ok(cmd) => cmd.execute(&node).await,
                    Err(err) => {
                        event!(Level::WARN, "invalid request: {}", err);
                        Message::from(FailedRequest { cmd_id, err })
                    }
                };
                message.serialize()
            })
            .await;

        tcp_stream.write_all(&response).await?;
    }
}
