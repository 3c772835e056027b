//! Node configuration, loaded from a json file at startup.
//!
//! ```json
//! {
//!   "port": 3001,
//!   "storage_engine": { "in_memory": { "max_bytes": 104857600 } },
//!   "ownership": {
//!     "directory": { "nodes": ["127.0.0.1:3001", "127.0.0.1:3002"] },
//!     "own_addr": "127.0.0.1:3001",
//!     "misrouted_requests": "reject"
//!   }
//! }
//! ```
//!
//! `ownership` is optional. Without it the node accepts every key it receives.
use serde::{Deserialize, Serialize};

use crate::{node::MisroutedRequests, routing::NodeSet};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    pub storage_engine: StorageEngine,
    #[serde(default)]
    pub ownership: Option<Ownership>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageEngine {
    InMemory {
        /// Upper bound for the sum of key and value lengths held by the node
        #[serde(default)]
        max_bytes: Option<usize>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Ownership {
    pub directory: NodeSet,
    pub own_addr: String,
    #[serde(default)]
    pub misrouted_requests: MisroutedRequests,
}
