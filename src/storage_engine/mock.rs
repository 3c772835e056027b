//! A [`StorageEngine`] wrapper that fails on demand, used to exercise backend failure paths
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{in_memory::InMemory, Error, Result, StorageEngine};
use crate::test_utils::fault::{Fault, When};

#[derive(Debug, Default)]
pub struct FaultyStorageEngine {
    inner: InMemory,
    fault: Fault,
    n_calls: AtomicUsize,
}

impl FaultyStorageEngine {
    pub fn new(when: When) -> Self {
        Self {
            inner: InMemory::default(),
            fault: Fault { when },
            n_calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls that reached this engine (failed or not)
    pub fn n_calls(&self) -> usize {
        self.n_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        self.n_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault.when {
            When::Always => Err(Error::Internal {
                reason: "Mocked backend failure".to_string(),
            }),
            When::Never => Ok(()),
        }
    }
}

#[async_trait]
impl StorageEngine for FaultyStorageEngine {
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
        self.check()?;
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<Bytes>> {
        self.check()?;
        self.inner.keys().await
    }
}
