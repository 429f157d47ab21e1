use std::path::PathBuf;
use std::time::Duration;

use blob_store::{
    BlobStores, LocalFileBlobStore, MemoryBlobStore, S3BlobStore, S3Settings, StaticCredentials,
    StorePolicy,
};
use thiserror::Error;
use url::Url;
use validator::{Validate, ValidationErrors};

use crate::keys::KeyStrategy;
use crate::links::RetrievalLinks;
use crate::params::{Args, StorageBackend};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("{flag} is required for {backend} storage")]
    Missing { flag: &'static str, backend: &'static str },

    #[error("--aws-access-key-id and --aws-secret-access-key must be set together")]
    PartialCredentials,

    #[error("public domain is not a usable base URL: {0}")]
    PublicDomain(#[from] url::ParseError),
}

#[derive(Clone, Debug)]
pub enum StorageConfig {
    S3(S3Settings),
    Local { dir: PathBuf },
    Memory,
}

impl StorageConfig {
    /// Opens the backend described by this config. Called once per process.
    pub async fn open(&self) -> std::io::Result<BlobStores> {
        Ok(match self {
            StorageConfig::S3(settings) => BlobStores::S3(S3BlobStore::connect(settings).await),
            StorageConfig::Local { dir } => BlobStores::Local(
                LocalFileBlobStore::open(dir.clone())
                    .await
                    .map_err(std::io::Error::other)?,
            ),
            StorageConfig::Memory => BlobStores::Memory(MemoryBlobStore::new()),
        })
    }
}

/// Validated, typed view of [`Args`].
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub http_addr: String,
    pub storage: StorageConfig,
    pub key_strategy: KeyStrategy,
    pub links: RetrievalLinks,
    pub store_policy: StorePolicy,
    pub max_upload_bytes: usize,
}

fn require(value: Option<String>, flag: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing { flag, backend: "s3" })
}

impl TryFrom<Args> for RelayConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        args.validate()?;

        let storage = match args.storage {
            StorageBackend::S3 => {
                let credentials = match (args.aws_access_key_id, args.aws_secret_access_key) {
                    (Some(access_key_id), Some(secret_access_key)) => {
                        Some(StaticCredentials { access_key_id, secret_access_key })
                    }
                    (None, None) => None,
                    _ => return Err(ConfigError::PartialCredentials),
                };
                StorageConfig::S3(S3Settings {
                    region: require(args.aws_region, "--aws-region")?,
                    bucket: require(args.s3_bucket, "--s3-bucket")?,
                    credentials,
                    endpoint_url: args.s3_endpoint,
                    force_path_style: args.s3_force_path_style,
                    create_bucket: args.s3_create_bucket,
                })
            }
            StorageBackend::Local => StorageConfig::Local { dir: PathBuf::from(args.data_dir) },
            StorageBackend::Memory => StorageConfig::Memory,
        };

        let links = match args.public_domain {
            Some(domain) => RetrievalLinks::absolute(Url::parse(&domain)?),
            None => RetrievalLinks::relative(),
        };

        Ok(Self {
            http_addr: args.http_addr,
            storage,
            key_strategy: args.key_strategy,
            links,
            store_policy: StorePolicy {
                timeout: Duration::from_secs(args.store_timeout_secs),
                retries: args.store_retries,
            },
            max_upload_bytes: args.max_upload_bytes,
        })
    }
}
