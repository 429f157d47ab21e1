use clap::{Parser, ValueEnum};
use validator::Validate;

use crate::keys::KeyStrategy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    S3,
    Local,
    Memory,
}

#[derive(Parser, Validate, Debug, Clone)]
#[clap(name = "file-relay-server", about = "Relays single-file uploads into object storage")]
pub struct Args {
    #[clap(long, env = "RELAY_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: String,

    #[clap(long, env = "RELAY_STORAGE", value_enum, default_value_t = StorageBackend::S3)]
    pub storage: StorageBackend,

    /// Directory for `--storage local`.
    #[clap(long, env = "RELAY_DATA_DIR", default_value = "relay-data")]
    pub data_dir: String,

    #[clap(long, env = "RELAY_AWS_REGION")]
    pub aws_region: Option<String>,
    #[clap(long, env = "RELAY_AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: Option<String>,
    #[clap(long, env = "RELAY_AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,
    #[clap(long, env = "RELAY_S3_BUCKET")]
    pub s3_bucket: Option<String>,
    /// Endpoint of an S3-compatible service (MinIO, Tigris, ...).
    #[clap(long, env = "RELAY_S3_ENDPOINT")]
    #[validate(url)]
    pub s3_endpoint: Option<String>,
    #[clap(long, env = "RELAY_S3_FORCE_PATH_STYLE")]
    pub s3_force_path_style: bool,
    #[clap(long, env = "RELAY_S3_CREATE_BUCKET")]
    pub s3_create_bucket: bool,

    /// Public origin used to build absolute retrieval links, e.g. `https://files.example.com`.
    #[clap(long, env = "RELAY_PUBLIC_DOMAIN")]
    #[validate(url)]
    pub public_domain: Option<String>,

    #[clap(long, env = "RELAY_KEY_STRATEGY", value_enum, default_value_t = KeyStrategy::Random)]
    pub key_strategy: KeyStrategy,

    #[clap(long, env = "RELAY_MAX_UPLOAD_BYTES", default_value_t = 25 * 1024 * 1024)]
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,

    #[clap(long, env = "RELAY_STORE_TIMEOUT_SECS", default_value_t = 30)]
    #[validate(range(min = 1))]
    pub store_timeout_secs: u64,

    #[clap(long, env = "RELAY_STORE_RETRIES", default_value_t = 1)]
    pub store_retries: u32,
}
