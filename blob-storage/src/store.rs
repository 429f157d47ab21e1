use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::local_store::LocalFileBlobStore;
use crate::memory_store::MemoryBlobStore;
use crate::s3_store::S3BlobStore;

/// Longest key accepted by any backend. Matches the S3 object key limit.
pub const MAX_KEY_LEN: usize = 1024;

/// An object as it sits in the store: the payload plus the content type it was written with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub data: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("no object stored under key `{key}`")]
    NotFound { key: String },

    #[error("invalid object key `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("blob store did not answer within {after:?}")]
    Timeout { after: Duration },

    #[error("I/O error in the blob store")]
    Io(#[from] std::io::Error),

    #[error("object metadata could not be read")]
    Metadata(#[from] serde_json::Error),

    #[error("blob store backend error: {source}")]
    Backend {
        transient: bool,
        source: Box<dyn Error + Send + Sync>,
    },
}

impl BlobError {
    /// Whether repeating the same call has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            BlobError::Timeout { .. } => true,
            BlobError::Backend { transient, .. } => *transient,
            BlobError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            BlobError::NotFound { .. } | BlobError::InvalidKey { .. } | BlobError::Metadata(_) => {
                false
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound { .. })
    }
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Key-addressed object storage with write-then-read semantics.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under `key`, replacing whatever was there before.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()>;

    /// Fetches the object stored under `key`. Unknown keys yield [`BlobError::NotFound`].
    async fn get(&self, key: &str) -> BlobResult<StoredObject>;
}

/// Rejects keys no backend can address.
pub fn check_key(key: &str) -> BlobResult<()> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.len() > MAX_KEY_LEN {
        "key is longer than 1024 bytes"
    } else {
        return Ok(());
    };
    Err(BlobError::InvalidKey { key: key.to_string(), reason })
}

#[derive(Debug, Clone)]
pub enum BlobStores {
    Local(LocalFileBlobStore),
    Memory(MemoryBlobStore),
    S3(S3BlobStore),
}

impl BlobStores {
    /// Returns a reference to the inner value as a trait object.
    pub fn as_trait(&self) -> &dyn BlobStore {
        match self {
            BlobStores::Local(a) => a,
            BlobStores::Memory(b) => b,
            BlobStores::S3(c) => c,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            BlobStores::Local(_) => "local",
            BlobStores::Memory(_) => "memory",
            BlobStores::S3(_) => "s3",
        }
    }
}

#[async_trait]
impl BlobStore for BlobStores {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        self.as_trait().put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        self.as_trait().get(key).await
    }
}
