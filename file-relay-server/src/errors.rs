use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use blob_store::BlobError;
use serde::Serialize;
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Debug, Error)]
pub enum RelayErr {
    #[error("No file uploaded")]
    NoFile,

    #[error("Only uploading one file is allowed")]
    TooManyFiles,

    #[error("Expected a multipart/form-data body: {0}")]
    NotMultipart(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("Failed to store file")]
    Store(#[source] BlobError),

    #[error("Missing key")]
    MissingKey,

    #[error("Failed to read file")]
    Fetch(#[source] BlobError),
}

fn store_status(e: &BlobError) -> StatusCode {
    match e {
        BlobError::NotFound { .. } => StatusCode::NOT_FOUND,
        BlobError::InvalidKey { .. } => StatusCode::BAD_REQUEST,
        BlobError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for RelayErr {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayErr::NoFile
            | RelayErr::TooManyFiles
            | RelayErr::NotMultipart(_)
            | RelayErr::Multipart(_)
            | RelayErr::MissingKey => StatusCode::BAD_REQUEST,
            RelayErr::Store(e) | RelayErr::Fetch(e) => store_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            // The upload endpoint speaks JSON.
            RelayErr::NoFile
            | RelayErr::TooManyFiles
            | RelayErr::NotMultipart(_)
            | RelayErr::Multipart(_) => HttpResponse::build(status).json(ErrorBody { error: &self.to_string() }),
            RelayErr::Store(e) => {
                let message = match e {
                    BlobError::InvalidKey { reason, .. } => format!("Invalid file name: {reason}"),
                    _ => self.to_string(),
                };
                HttpResponse::build(status).json(ErrorBody { error: &message })
            }
            RelayErr::MissingKey => HttpResponse::build(status)
                .insert_header(ContentType::plaintext())
                .body(self.to_string()),
            RelayErr::Fetch(e) => {
                let message = match e {
                    BlobError::NotFound { .. } => "File not found".to_string(),
                    BlobError::InvalidKey { reason, .. } => format!("Invalid key: {reason}"),
                    _ => self.to_string(),
                };
                HttpResponse::build(status)
                    .insert_header(ContentType::plaintext())
                    .body(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use std::time::Duration;

    async fn body_of(err: RelayErr) -> (StatusCode, String) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[actix_web::test]
    async fn test_upload_errors_are_json() {
        let (status, body) = body_of(RelayErr::NoFile).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"No file uploaded"}"#);

        let (status, body) = body_of(RelayErr::TooManyFiles).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"Only uploading one file is allowed"}"#);

        let (status, body) = body_of(RelayErr::Store(BlobError::Timeout { after: Duration::from_secs(3) })).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body, r#"{"error":"Failed to store file"}"#);
    }

    #[actix_web::test]
    async fn test_fetch_errors_are_plain_text() {
        let (status, body) = body_of(RelayErr::MissingKey).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing key");

        let (status, body) = body_of(RelayErr::Fetch(BlobError::NotFound { key: "k".into() })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "File not found");

        let backend = BlobError::Backend { transient: false, source: "access denied".into() };
        let (status, body) = body_of(RelayErr::Fetch(backend)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Failed to read file");
    }
}
