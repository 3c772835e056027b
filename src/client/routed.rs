//! [`RoutedClient`] is the caller side of the protocol: it owns a [`NodeSet`], picks the owner of
//! each key with [`crate::routing::route`] and issues a single request against that node.
//!
//! Connections are opened lazily (one per node) and reused. A client whose connection broke
//! (transport error or unreadable response) is discarded so that the next request to that node
//! reconnects, but the failed request itself is never retried here.
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{event, instrument, Level};

use crate::{
    cmd::{delete::DeleteResponse, get::GetResponse, put::PutResponse},
    routing::NodeSet,
};

use super::{
    error::{Error, Result},
    Client, Factory,
};

pub struct RoutedClient<F: Factory> {
    nodes: NodeSet,
    factory: F,
    clients: HashMap<Bytes, Box<dyn Client + Send>>,
}

impl<F: Factory> RoutedClient<F> {
    pub fn new(nodes: NodeSet, factory: F) -> Self {
        Self {
            nodes,
            factory,
            clients: HashMap::new(),
        }
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    /// Address of the node that owns `key`
    pub fn owner(&self, key: &[u8]) -> Result<Bytes> {
        Ok(self.nodes.owner(key)?)
    }

    #[instrument(level = "info", skip(self, value))]
    pub async fn put(&mut self, key: Bytes, value: Bytes) -> Result<PutResponse> {
        let owner = self.owner(&key)?;
        let client = self.client_for(&owner).await?;
        let res = client.put(key, value).await;
        self.evict_on_broken_connection(&owner, res)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn get(&mut self, key: Bytes) -> Result<GetResponse> {
        let owner = self.owner(&key)?;
        let client = self.client_for(&owner).await?;
        let res = client.get(key).await;
        self.evict_on_broken_connection(&owner, res)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn delete(&mut self, key: Bytes) -> Result<DeleteResponse> {
        let owner = self.owner(&key)?;
        let client = self.client_for(&owner).await?;
        let res = client.delete(key).await;
        self.evict_on_broken_connection(&owner, res)
    }

    async fn client_for(&mut self, addr: &Bytes) -> Result<&mut Box<dyn Client + Send>> {
        if !self.clients.contains_key(addr) {
            let stringified_addr = String::from_utf8(addr.to_vec()).map_err(|_| {
                Error::Configuration {
                    reason: "node addresses must be utf8 encoded".to_string(),
                }
            })?;
            event!(Level::DEBUG, "connecting to {}", stringified_addr);
            let client = self.factory.get(stringified_addr).await?;
            self.clients.insert(addr.clone(), client);
        }

        self.clients.get_mut(addr).ok_or(Error::Logic {
            reason: "client missing right after being inserted".to_string(),
        })
    }

    fn evict_on_broken_connection<T>(&mut self, addr: &Bytes, res: Result<T>) -> Result<T> {
        if let Err(err) = &res {
            if err.breaks_connection() {
                event!(
                    Level::WARN,
                    "dropping connection to {}: {}",
                    String::from_utf8_lossy(addr),
                    err
                );
                self.clients.remove(addr);
            }
        }

        res
    }
}
