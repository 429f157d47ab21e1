use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::store::{check_key, BlobError, BlobResult, BlobStore, StoredObject};

/// Process-local store. Contents vanish with the process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    objects: Arc<DashMap<String, StoredObject>>,
    puts: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls that reached this store, successful or not.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `get` calls that reached this store, successful or not.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        check_key(key)?;
        let object = StoredObject {
            key: key.to_string(),
            data,
            content_type: Some(content_type.to_string()).filter(|ct| !ct.is_empty()),
        };
        self.objects.insert(key.to_string(), object);
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        check_key(key)?;
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlobError::NotFound { key: key.to_string() })
    }
}
