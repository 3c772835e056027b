//! Mock implementation for [`Client`]
//!
//! A [`MockClient`] serves requests with an in-process [`StorageNode`] instead of a TCP connection.
//! Requests still go through [`Message`] and [`Command`] so the payload encoding is exercised.
use crate::{
    cmd::{
        delete::{Delete, DeleteResponse},
        get::{Get, GetResponse},
        put::{Put, PutResponse},
        Command,
    },
    node::StorageNode,
    server::message::{IntoMessage, Message},
    storage_engine::{in_memory::InMemory, mock::FaultyStorageEngine},
    test_utils::fault::{Fault, When},
};

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::{
    error::{Error, Result},
    parse_response, Client, Factory as ClientFactory,
};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    connects: usize,
    requests: usize,
}

/// Per node call counters, shared between a [`MockClientFactory`] and the clients it builds
#[derive(Debug, Default, Clone)]
pub struct MockStats {
    inner: Arc<Mutex<HashMap<String, Counters>>>,
}

impl MockStats {
    pub fn connects(&self, addr: &str) -> usize {
        self.counters(addr).connects
    }

    pub fn requests(&self, addr: &str) -> usize {
        self.counters(addr).requests
    }

    fn counters(&self, addr: &str) -> Counters {
        self.inner
            .lock()
            .unwrap()
            .get(addr)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, addr: &str, f: impl FnOnce(&mut Counters)) {
        let mut guard = self.inner.lock().unwrap();
        f(guard.entry(addr.to_string()).or_default());
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockClientFaults {
    pub connect: Fault,
    pub request: Fault,
}

pub struct MockClient {
    addr: String,
    faults: MockClientFaults,
    stats: MockStats,
    node: StorageNode,
}

impl MockClient {
    async fn request<C: IntoMessage + Send, T: DeserializeOwned>(&mut self, cmd: C) -> Result<T> {
        self.stats.record(&self.addr, |c| c.requests += 1);
        if let When::Always = self.faults.request.when {
            return Err(Error::Io {
                reason: "Mocked error on request".to_string(),
            });
        }

        let message = Message::from(cmd);
        let cmd_id = message.cmd_id;
        let response = Command::try_from_message(message)?
            .execute(&self.node)
            .await;
        parse_response(response, cmd_id)
    }
}

#[async_trait]
impl Client for MockClient {
    async fn connect(&mut self) -> Result<()> {
        self.stats.record(&self.addr, |c| c.connects += 1);
        match self.faults.connect.when {
            When::Always => Err(Error::Io {
                reason: "Mocked error on connect".to_string(),
            }),
            When::Never => Ok(()),
        }
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

pub struct MockClientFactory {
    pub faults: MockClientFaults,
    pub stats: MockStats,
    nodes: HashMap<String, StorageNode>,
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn get(&self, addr: String) -> Result<Box<dyn Client + Send>> {
        let node = self
            .nodes
            .get(&addr)
            .cloned()
            .ok_or(Error::UnableToConnect {
                reason: format!("unknown node {}", addr),
            })?;

        let mut client = MockClient {
            addr,
            faults: self.faults.clone(),
            stats: self.stats.clone(),
            node,
        };
        client.connect().await.map_err(|e| Error::UnableToConnect {
            reason: e.to_string(),
        })?;
        Ok(Box::new(client))
    }
}

#[derive(Default)]
pub struct MockClientFactoryBuilder {
    faults: MockClientFaults,
    backend_fault: Fault,
    addrs: Vec<String>,
}

impl MockClientFactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each address gets its own [`StorageNode`] with its own backend
    pub fn with_nodes(mut self, addrs: &[&str]) -> Self {
        self.addrs = addrs.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_connection_fault(mut self, when: When) -> Self {
        self.faults.connect = Fault { when };
        self
    }

    pub fn with_request_fault(mut self, when: When) -> Self {
        self.faults.request = Fault { when };
        self
    }

    pub fn with_backend_fault(mut self, when: When) -> Self {
        self.backend_fault = Fault { when };
        self
    }

    pub fn build(self) -> MockClientFactory {
        let backend_fault = self.backend_fault;
        let nodes = self
            .addrs
            .into_iter()
            .map(|addr| {
                let node = match backend_fault.when {
                    When::Always => {
                        StorageNode::new(Arc::new(FaultyStorageEngine::new(When::Always)))
                    }
                    When::Never => StorageNode::new(Arc::new(InMemory::default())),
                };
                (addr, node)
            })
            .collect();

        MockClientFactory {
            faults: self.faults,
            stats: MockStats::default(),
            nodes,
        }
    }
}
