use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::store::{BlobError, BlobResult, BlobStore, StoredObject};

/// Bounds applied to every call through a [`GuardedStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorePolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), retries: 1 }
    }
}

/// Adds per-attempt timeouts and a bounded retry on transient errors to any store.
#[derive(Clone, Debug)]
pub struct GuardedStore<S> {
    inner: S,
    policy: StorePolicy,
}

impl<S: BlobStore> GuardedStore<S> {
    pub fn new(inner: S, policy: StorePolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn run<T, F, Fut>(&self, op: &'static str, key: &str, mut call: F) -> BlobResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = BlobResult<T>> + Send,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(BlobError::Timeout { after: self.policy.timeout }),
            };
            match outcome {
                Err(e) if e.is_transient() && attempt < self.policy.retries => {
                    attempt += 1;
                    tracing::warn!(op, key, attempt, error = %e, "transient blob store failure, retrying");
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for GuardedStore<S> {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        self.run("put", key, || self.inner.put(key, data.clone(), content_type)).await
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        self.run("get", key, || self.inner.get(key)).await
    }
}
