use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;

use crate::store::{check_key, BlobError, BlobResult, BlobStore, StoredObject};

/// Static access key pair. Without one the SDK's default provider chain is used.
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Everything needed to reach a bucket on AWS or an S3-compatible service.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub region: String,
    pub bucket: String,
    pub credentials: Option<StaticCredentials>,
    /// Overrides the AWS endpoint, e.g. `http://minio:9000` or a Tigris URL.
    pub endpoint_url: Option<String>,
    /// MinIO requires path-style addressing.
    pub force_path_style: bool,
    /// Create the bucket on first use if it does not exist.
    pub create_bucket: bool,
}

/// A `BlobStore` backed by an S3 bucket.
#[derive(Clone, Debug)]
pub struct S3BlobStore {
    s3_client: S3Client,
    bucket: String,
    create_bucket: bool,
    bucket_ready: Arc<tokio::sync::Mutex<bool>>,
}

/// Builds the shared client. Retries are left to `GuardedStore`.
pub async fn create_s3_client(settings: &S3Settings) -> S3Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .retry_config(RetryConfig::disabled());
    if let Some(creds) = &settings.credentials {
        loader = loader.credentials_provider(Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            None,
            None,
            "file-relay-config",
        ));
    }
    let base_config = loader.load().await;

    let mut builder = Builder::from(&base_config).force_path_style(settings.force_path_style);
    if let Some(endpoint) = &settings.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }
    S3Client::from_conf(builder.build())
}

/// Wraps an SDK failure, marking connection-level problems and 5xx answers as transient.
fn backend_error<E>(err: SdkError<E, HttpResponse>) -> BlobError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let transient = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => true,
        SdkError::ServiceError(service_err) => service_err.raw().status().as_u16() >= 500,
        _ => false,
    };
    BlobError::Backend { transient, source: Box::new(err) }
}

impl S3BlobStore {
    pub fn new(s3_client: S3Client, bucket: impl Into<String>, create_bucket: bool) -> Self {
        Self {
            s3_client,
            bucket: bucket.into(),
            create_bucket,
            bucket_ready: Arc::new(tokio::sync::Mutex::new(false)),
        }
    }

    pub async fn connect(settings: &S3Settings) -> Self {
        let client = create_s3_client(settings).await;
        Self::new(client, settings.bucket.clone(), settings.create_bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket_exists(&self) -> BlobResult<()> {
        if !self.create_bucket {
            return Ok(());
        }
        let mut ready = self.bucket_ready.lock().await;
        if *ready {
            return Ok(());
        }

        match self.s3_client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {}
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_not_found() => {
                tracing::info!(bucket = %self.bucket, "creating missing bucket");
                self.s3_client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(backend_error)?;
            }
            Err(e) => return Err(backend_error(e)),
        }
        *ready = true;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        check_key(key)?;
        self.ensure_bucket_exists().await?;

        let mut request = self
            .s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));
        if !content_type.is_empty() {
            request = request.content_type(content_type);
        }
        request.send().await.map_err(backend_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<StoredObject> {
        check_key(key)?;
        self.ensure_bucket_exists().await?;

        let resp = match self.s3_client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(resp) => resp,
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_no_such_key() => {
                return Err(BlobError::NotFound { key: key.to_string() });
            }
            Err(e) => return Err(backend_error(e)),
        };

        let content_type = resp.content_type().map(str::to_owned);
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Backend { transient: true, source: Box::new(e) })?
            .into_bytes();
        Ok(StoredObject { key: key.to_string(), data, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // Needs a reachable endpoint. For a local MinIO:
    //   RELAY_TEST_S3_ENDPOINT=http://localhost:9000 AWS_ACCESS_KEY_ID=... \
    //   AWS_SECRET_ACCESS_KEY=... cargo test -p blob-store -- --ignored
    fn settings_from_env() -> S3Settings {
        S3Settings {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: std::env::var("RELAY_TEST_S3_BUCKET").unwrap_or_else(|_| "file-relay-test".to_string()),
            credentials: None,
            endpoint_url: std::env::var("RELAY_TEST_S3_ENDPOINT").ok(),
            force_path_style: true,
            create_bucket: true,
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_s3_round_trip() {
        let store = S3BlobStore::connect(&settings_from_env()).await;
        let key = Uuid::new_v4().simple().to_string();

        store.put(&key, Bytes::from_static(b"this is test data"), "text/plain").await.expect("upload failed");
        let object = store.get(&key).await.expect("download failed");
        assert_eq!(object.data, Bytes::from_static(b"this is test data"));
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = StaticCredentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("AKIAEXAMPLE"));
        assert!(!printed.contains("wJalrXUtnFEMI"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_s3_unknown_key() {
        let store = S3BlobStore::connect(&settings_from_env()).await;
        let key = Uuid::new_v4().simple().to_string();

        let err = store.get(&key).await.unwrap_err();
        assert!(err.is_not_found(), "expected NotFound, got {err:?}");
    }
}
