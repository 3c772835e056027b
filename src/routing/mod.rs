//! Key routing: decides which node of a static [`NodeSet`] owns a given key.
//!
//! The owner of a key is computed as
//!
//! ```text
//! index = big_endian_uint(sha256(key)) mod len(nodes)
//! ```
//!
//! and is a pure function of the key and the *ordered* node list. Every caller that
//! agrees on the node list agrees on the owner, without talking to anyone.
//!
//! # Stability
//! Modulo routing has no stability property when the node list changes: adding or removing
//! a node remaps the owner of most keys, not just a fair share of them. This is only acceptable
//! because the node list is static for the lifetime of a deployment. If the node set ever needs
//! to grow or shrink online, this module should be replaced by ring based consistent hashing or
//! rendezvous (highest-random-weight) hashing, which only move a fraction of the keys proportional
//! to the change.
//!
//! # Versioning
//! The hash function and the digest-to-integer conversion are part of the wire contract between
//! clients and nodes. Changing either one is a protocol version bump (see [`ROUTING_ALGORITHM`]).
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Identifies the routing function implemented by [`route`].
pub const ROUTING_ALGORITHM: &str = "sha256-mod/v1";

/// Computes the index of the node that owns `key` inside `nodes`.
///
/// # Errors
/// Returns [`Error::Configuration`] if `nodes` is empty. An empty node set can't own anything
/// and the caller must not trust any routing decision made against it.
pub fn route<T>(key: &[u8], nodes: &[T]) -> Result<usize> {
    if nodes.is_empty() {
        return Err(Error::Configuration {
            reason: "Can't route a key against an empty node set".to_string(),
        });
    }

    Ok(digest_mod(&Sha256::digest(key), nodes.len()))
}

/// Reduces a big-endian unsigned integer (the digest) modulo `n`, one byte at a time.
///
/// This is the same as interpreting the whole digest as a 256 bit number and taking the
/// remainder, since `(a * 256 + b) mod n == ((a mod n) * 256 + b) mod n`.
fn digest_mod(digest: &[u8], n: usize) -> usize {
    let n = n as u128;
    let remainder = digest
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % n);
    remainder as usize
}

/// An ordered, non-empty list of node addresses.
///
/// The order is part of the routing contract: two callers must hold the same order
/// to route keys consistently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NodeDirectory", into = "NodeDirectory")]
pub struct NodeSet {
    nodes: Vec<Bytes>,
}

/// On-disk representation of a [`NodeSet`]: `{"nodes": ["127.0.0.1:3001", ...]}`
#[derive(Serialize, Deserialize)]
pub struct NodeDirectory {
    pub nodes: Vec<String>,
}

impl NodeSet {
    /// Builds a [`NodeSet`] out of the given addresses, preserving their order.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `nodes` is empty
    pub fn new<I, B>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let nodes: Vec<Bytes> = nodes.into_iter().map(Into::into).collect();
        if nodes.is_empty() {
            return Err(Error::Configuration {
                reason: "A node set must contain at least one node".to_string(),
            });
        }

        Ok(Self { nodes })
    }

    /// Loads the node directory file. This is meant to be called once at process start.
    pub async fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let c = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&c)?)
    }

    pub fn owner_index(&self, key: &[u8]) -> Result<usize> {
        route(key, &self.nodes)
    }

    /// Returns the address of the node that owns `key`
    pub fn owner(&self, key: &[u8]) -> Result<Bytes> {
        let index = self.owner_index(key)?;
        Ok(self.nodes[index].clone())
    }

    pub fn contains(&self, addr: &[u8]) -> bool {
        self.nodes.iter().any(|n| n.as_ref() == addr)
    }

    pub fn nodes(&self) -> &[Bytes] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a [`NodeSet`] can't be constructed empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl TryFrom<NodeDirectory> for NodeSet {
    type Error = Error;

    fn try_from(directory: NodeDirectory) -> Result<Self> {
        NodeSet::new(directory.nodes)
    }
}

impl From<NodeSet> for NodeDirectory {
    fn from(set: NodeSet) -> Self {
        Self {
            nodes: set
                .nodes
                .iter()
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .collect(),
        }
    }
}
