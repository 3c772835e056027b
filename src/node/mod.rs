//! [`StorageNode`] is the request handler that sits in front of a node's [`StorageEngine`].
//!
//! Every operation performs exactly one backend call and translates its outcome into one of
//! `Ack`, [`Lookup::Found`], [`Lookup::NotFound`] or an [`Error`]. Backend failures are never
//! turned into a successful response.
//!
//! # Ownership
//! By default a node trusts its callers to only send it keys it owns (the caller routed the key
//! with [`crate::routing`]). A node can optionally be configured with the node directory and its
//! own address; with [`MisroutedRequests::Reject`] it recomputes the owner of every key and answers
//! misrouted requests with [`Error::WrongNode`] instead of touching the backend. This catches
//! callers whose node list drifted from the node's.
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{event, instrument, Level};

use crate::{
    error::{Error, Result},
    routing::NodeSet,
};

pub type StorageEngine = Arc<dyn crate::storage_engine::StorageEngine + Send + Sync + 'static>;

/// What a node does with a request for a key owned by another node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisroutedRequests {
    #[default]
    Accept,
    Reject,
}

/// The node's own view of the node set, used to verify key ownership
#[derive(Clone, Debug)]
pub struct Ownership {
    directory: NodeSet,
    own_addr: Bytes,
    policy: MisroutedRequests,
}

impl Ownership {
    /// # Errors
    /// Returns [`Error::Configuration`] if `own_addr` is not part of `directory`
    pub fn new(directory: NodeSet, own_addr: Bytes, policy: MisroutedRequests) -> Result<Self> {
        if !directory.contains(&own_addr) {
            return Err(Error::Configuration {
                reason: format!(
                    "Node address {} is not part of the node directory",
                    String::from_utf8_lossy(&own_addr)
                ),
            });
        }

        Ok(Self {
            directory,
            own_addr,
            policy,
        })
    }
}

pub enum OwnsKeyResponse {
    True,
    False { addr: Bytes },
}

/// Result of a GET. A missing key is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(Bytes),
    NotFound,
}

/// StorageNode connects a [`StorageEngine`] to the request protocol.
/// It holds no state other than the (shared) backend and the optional ownership configuration.
#[derive(Clone, Debug)]
pub struct StorageNode {
    storage_engine: StorageEngine,
    ownership: Option<Ownership>,
}

impl StorageNode {
    pub fn new(storage_engine: StorageEngine) -> Self {
        Self {
            storage_engine,
            ownership: None,
        }
    }

    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = Some(ownership);
        self
    }

    /// Creates or overwrites the record for `key` (last write wins)
    #[instrument(name = "node::put", level = "info", skip(self, value))]
    pub async fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
        self.verify_ownership(&key)?;
        self.storage_engine.put(key, value).await.map_err(|err| {
            event!(Level::ERROR, "backend put failed: {}", err);
            Error::from(err)
        })
    }

    #[instrument(name = "node::get", level = "info", skip(self))]
    pub async fn get(&self, key: &[u8]) -> Result<Lookup> {
        self.verify_ownership(key)?;
        match self.storage_engine.get(key).await {
            Ok(Some(value)) => Ok(Lookup::Found(value)),
            Ok(None) => Ok(Lookup::NotFound),
            Err(err) => {
                event!(Level::ERROR, "backend get failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Removes the record for `key` if present. Deleting an absent key is not an error.
    #[instrument(name = "node::delete", level = "info", skip(self))]
    pub async fn delete(&self, key: &[u8]) -> Result<()> {
        self.verify_ownership(key)?;
        self.storage_engine.delete(key).await.map_err(|err| {
            event!(Level::ERROR, "backend delete failed: {}", err);
            Error::from(err)
        })
    }

    /// Returns whether this node owns `key` according to its node directory.
    /// Nodes without a directory own every key they are asked about.
    pub fn owns_key(&self, key: &[u8]) -> Result<OwnsKeyResponse> {
        if let Some(ownership) = &self.ownership {
            let owner = ownership.directory.owner(key)?;
            if owner == ownership.own_addr {
                Ok(OwnsKeyResponse::True)
            } else {
                Ok(OwnsKeyResponse::False { addr: owner })
            }
        } else {
            Ok(OwnsKeyResponse::True)
        }
    }

    fn verify_ownership(&self, key: &[u8]) -> Result<()> {
        let policy = match &self.ownership {
            Some(ownership) => ownership.policy,
            None => return Ok(()),
        };

        if let OwnsKeyResponse::False { addr } = self.owns_key(key)? {
            event!(
                Level::WARN,
                "misrouted key, owner is {}",
                String::from_utf8_lossy(&addr)
            );
            if policy == MisroutedRequests::Reject {
                return Err(Error::WrongNode { owner: addr });
            }
        }

        Ok(())
    }
}
