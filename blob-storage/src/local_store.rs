use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use crate::store::{check_key, BlobError, BlobResult, BlobStore, StoredObject};

/// Header stored in front of every object's payload.
#[derive(Serialize, Deserialize, Debug)]
struct ObjectMeta {
    key: String,
    content_type: Option<String>,
    size: u64,
}

const HEADER_LEN_BYTES: usize = 4;

/// Stores objects as files under a base directory.
///
/// File names are the SHA-256 of the key, fanned out by the first two hex digits, so keys
/// containing `/` or `..` never escape `base_path`. Each file is a big-endian `u32` header
/// length, the JSON [`ObjectMeta`], then the payload. Key, content type and bytes are
/// committed together by one rename.
#[derive(Clone, Debug)]
pub struct LocalFileBlobStore {
    base_path: PathBuf,
}

impl LocalFileBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Creates the base directory if needed.
    pub async fn open(base_path: impl Into<PathBuf>) -> BlobResult<Self> {
        let store = Self::new(base_path);
        fs::create_dir_all(&store.base_path).await?;
        Ok(store)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.base_path.join(&digest[..2]).join(format!("{}.obj", digest))
    }
}

fn encode_object(meta: &ObjectMeta, data: &[u8]) -> BlobResult<Vec<u8>> {
    let header = serde_json::to_vec(meta)?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "object header too large"))?;

    let mut buf = Vec::with_capacity(HEADER_LEN_BYTES + header.len() + data.len());
    buf.extend_from_slice(&header_len.to_be_bytes());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(data);
    Ok(buf)
}

fn corrupt(path: &Path, what: &str) -> BlobError {
    BlobError::Io(std::io::Error::new(
        ErrorKind::InvalidData,
        format!("{}: {}", path.display(), what),
    ))
}

fn decode_object(path: &Path, raw: Vec<u8>) -> BlobResult<(ObjectMeta, Bytes)> {
    let mut raw = Bytes::from(raw);
    if raw.len() < HEADER_LEN_BYTES {
        return Err(corrupt(path, "truncated header length"));
    }
    let mut len_bytes = [0u8; HEADER_LEN_BYTES];
    len_bytes.copy_from_slice(&raw[..HEADER_LEN_BYTES]);
    let header_len = u32::from_be_bytes(len_bytes) as usize;
    let rest = raw.split_off(HEADER_LEN_BYTES);
    if rest.len() < header_len {
        return Err(corrupt(path, "truncated header"));
    }

    let meta: ObjectMeta = serde_json::from_slice(&rest[..header_len])?;
    let data = rest.slice(header_len..);
    if data.len() as u64 != meta.size {
        return Err(corrupt(path, "payload size does not match header"));
    }
    Ok((meta, data))
}

/// Writes through a temporary sibling and renames it into place.
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl BlobStore for LocalFileBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        check_key(key)?;
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let meta = ObjectMeta {
            key: key.to_string(),
            content_type: Some(content_type.to_string()).filter(|ct| !ct.is_empty()),
            size: data.len() as u64,
        };
        write_atomic(&path, &encode_object(&meta, &data)?).await?;
        tracing::debug!(key, path = %path.display(), "wrote object to disk");
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        check_key(key)?;
        let path = self.object_path(key);

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::NotFound { key: key.to_string() });
            }
            Err(e) => return Err(e.into()),
        };
        let (meta, data) = decode_object(&path, raw)?;
        if meta.key != key {
            tracing::warn!(key, stored_key = %meta.key, "digest collision in local store");
            return Err(BlobError::NotFound { key: key.to_string() });
        }

        Ok(StoredObject { key: meta.key, data, content_type: meta.content_type })
    }
}
