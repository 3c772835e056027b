//! An in-memory [`StorageEngine`] implementation
//!
//! This implementation uses a [`HashMap`] wrapped by a [`Mutex`] and does nothing fancy around performance.
//! It can optionally be bounded: when `max_bytes` is set, a put that would make the sum of all key and
//! value lengths exceed it is rejected with [`Error::CapacityExceeded`].
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{event, instrument, Level};

use super::{Error, Result, StorageEngine};

/// Byte accounting for an [`InMemory`] store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    pub used_bytes: usize,
    pub max_bytes: Option<usize>,
}

#[derive(Debug, Default)]
struct Store {
    data: HashMap<Bytes, Bytes>,
    used_bytes: usize,
}

/// The InMemory [`StorageEngine`] definition
#[derive(Clone, Debug, Default)]
pub struct InMemory {
    inner: Arc<Mutex<Store>>,
    max_bytes: Option<usize>,
}

impl InMemory {
    /// Constructs an [`InMemory`] store that holds at most `max_bytes` of keys and values
    pub fn with_capacity_limit(max_bytes: usize) -> Self {
        Self {
            inner: Default::default(),
            max_bytes: Some(max_bytes),
        }
    }

    pub fn usage(&self) -> Result<Usage> {
        let guard = self.acquire_lock()?;
        Ok(Usage {
            used_bytes: guard.used_bytes,
            max_bytes: self.max_bytes,
        })
    }

    /// private function used to acquire a lock over the [`Store`].
    /// A fail to acquire a lock is considered a [`Error::Logic`] since the only reason why
    /// an [`Error`] should be returned is in case of [`Mutex`] poisoning
    fn acquire_lock(&self) -> Result<MutexGuard<Store>> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::Logic {
                reason: "Unable to acquire lock for InMemory storage engine - poisoned..."
                    .to_string(),
            }),
        }
    }
}

#[async_trait]
impl StorageEngine for InMemory {
    #[instrument(name = "storage_engine::in_memory::get", level = "debug", skip(self))]
    async fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let guard = self.acquire_lock()?;
        Ok(guard.data.get(key).cloned())
    }

    #[instrument(name = "storage_engine::in_memory::put", level = "debug", skip(self, value))]
    async fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
        let mut guard = self.acquire_lock()?;
        let freed = guard
            .data
            .get(&key)
            .map_or(0, |existing| key.len() + existing.len());
        let required = guard.used_bytes - freed + key.len() + value.len();

        if let Some(max_bytes) = self.max_bytes {
            if required > max_bytes {
                event!(
                    Level::WARN,
                    "put rejected: {} bytes required, limit is {}",
                    required,
                    max_bytes
                );
                return Err(Error::CapacityExceeded {
                    max_bytes,
                    required,
                });
            }
        }

        guard.data.insert(key, value);
        guard.used_bytes = required;
        Ok(())
    }

    #[instrument(name = "storage_engine::in_memory::delete", level = "debug", skip(self))]
    async fn delete(&self, key: &[u8]) -> Result<()> {
        let mut guard = self.acquire_lock()?;
        if let Some(value) = guard.data.remove(key) {
            guard.used_bytes -= key.len() + value.len();
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn keys(&self) -> Result<Vec<Bytes>> {
        let guard = self.acquire_lock()?;
        Ok(guard.data.keys().map(Clone::clone).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemory, Usage};
    use crate::{
        storage_engine::{Error, StorageEngine},
        utils::generate_random_ascii_string,
    };
    use bytes::Bytes;
    use quickcheck::Arbitrary;

    #[tokio::test]
    async fn put_get_delete() {
        let store = InMemory::default();
        let key = Bytes::from("key");
        let value = Bytes::from("value");

        store.put(key.clone(), value.clone()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap(), value);

        store.delete(&key).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn override_key() {
        let store = InMemory::default();
        let key = Bytes::from("key");
        let value1 = Bytes::from("value");
        let value2 = Bytes::from("value2");

        store.put(key.clone(), value1.clone()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap(), value1);

        store.put(key.clone(), value2.clone()).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap(), value2);
    }

    #[tokio::test]
    async fn delete_absent_key() {
        let store = InMemory::default();
        store.delete(b"nope").await.unwrap();
        store.delete(b"nope").await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn capacity_limit() {
        let store = InMemory::with_capacity_limit(10);

        // 3 + 5 bytes
        store
            .put(Bytes::from("key"), Bytes::from("value"))
            .await
            .unwrap();

        let err = store
            .put(Bytes::from("k2"), Bytes::from("v2"))
            .await
            .err()
            .unwrap();
        match err {
            Error::CapacityExceeded {
                max_bytes,
                required,
            } => {
                assert_eq!(max_bytes, 10);
                assert_eq!(required, 12);
            }
            _ => panic!("Unexpected error: {}", err),
        }

        // overriding an existing key only accounts for the difference
        store
            .put(Bytes::from("key"), Bytes::from("val"))
            .await
            .unwrap();
        store.put(Bytes::from("k"), Bytes::from("v")).await.unwrap();
        assert_eq!(
            store.usage().unwrap(),
            Usage {
                used_bytes: 8,
                max_bytes: Some(10)
            }
        );

        store.delete(b"key").await.unwrap();
        assert_eq!(store.usage().unwrap().used_bytes, 2);
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestInput {
        key_values_thread_1: Vec<String>,
        key_values_thread_2: Vec<String>,
        key_values_thread_3: Vec<String>,
    }

    fn generate_random_deduped_string_keys(n_keys: usize) -> Vec<String> {
        let mut keys = Vec::with_capacity(n_keys);
        for _ in 0..n_keys {
            keys.push(generate_random_ascii_string(20))
        }
        keys.sort();
        keys.dedup();
        keys
    }

    impl Arbitrary for TestInput {
        fn arbitrary(_: &mut quickcheck::Gen) -> Self {
            let keys = generate_random_deduped_string_keys(600);
            let third = keys.len() / 3;

            Self {
                key_values_thread_1: Vec::from(&keys[0..third]),
                key_values_thread_2: Vec::from(&keys[third..2 * third]),
                key_values_thread_3: Vec::from(&keys[2 * third..]),
            }
        }
    }

    async fn put_get(store: InMemory, items: Vec<String>) -> anyhow::Result<usize> {
        let mut items_added = 0;

        for key in items.iter() {
            let key = Bytes::from(key.clone());
            store.put(key.clone(), key.clone()).await?;
            assert_eq!(store.get(&key).await?.unwrap(), key);
            items_added += 1;
        }

        Ok(items_added)
    }

    // asserts that concurrent puts/gets don't hang on the mutex and that every key lands
    #[quickcheck_async::tokio]
    async fn concurrency_test_put_get(input: TestInput) {
        let store = InMemory::default();
        let handles: Vec<_> = [
            input.key_values_thread_1.clone(),
            input.key_values_thread_2.clone(),
            input.key_values_thread_3.clone(),
        ]
        .into_iter()
        .map(|items| tokio::spawn(put_get(store.clone(), items)))
        .collect();

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap().unwrap();
        }

        assert_eq!(
            total,
            input.key_values_thread_1.len()
                + input.key_values_thread_2.len()
                + input.key_values_thread_3.len()
        );
        assert_eq!(store.keys().await.unwrap().len(), total);
    }
}
