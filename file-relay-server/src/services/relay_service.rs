use std::sync::Arc;

use actix_web::http::header::{self, ContentType};
use actix_web::http::Method;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use blob_store::BlobStore;
use bytes::Bytes;
use multer::Multipart;
use serde::{Deserialize, Serialize};

use crate::errors::RelayErr;
use crate::keys::{cache_control, KeyStrategy};
use crate::links::RetrievalLinks;

pub const APP_TYPE_JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Multipart field that carries the upload.
pub const FILE_FIELD: &str = "file";

/// Shared by every worker: one store handle for the whole process.
pub struct RelayState {
    pub(crate) store: Arc<dyn BlobStore>,
    pub(crate) keys: KeyStrategy,
    pub(crate) links: RetrievalLinks,
}

impl RelayState {
    pub fn new(store: Arc<dyn BlobStore>, keys: KeyStrategy, links: RetrievalLinks) -> Self {
        Self { store, keys, links }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Deserialize)]
pub struct FileQuery {
    key: Option<String>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: String,
    data: Bytes,
}

/// Pulls exactly one `file` part out of the form. Anything else is skipped.
async fn read_single_file(multipart: &mut Multipart<'_>) -> Result<UploadedFile, RelayErr> {
    let mut found: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Parts without a filename are plain form values, not files.
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(ToString::to_string)
            .or_else(|| mime_guess::from_path(&file_name).first_raw().map(str::to_owned))
            .unwrap_or_else(|| OCTET_STREAM.to_string());
        let data = field.bytes().await?;

        // What a browser sends for a file input left empty, wherever it sits in the form.
        if file_name.is_empty() && data.is_empty() {
            continue;
        }
        if found.is_some() {
            return Err(RelayErr::TooManyFiles);
        }
        found = Some(UploadedFile {
            file_name: Some(file_name).filter(|n| !n.is_empty()),
            content_type,
            data,
        });
    }

    found.ok_or(RelayErr::NoFile)
}

#[post("/api/upload")]
pub async fn upload_file(
    req: HttpRequest,
    body: web::Bytes,
    shared_state: web::Data<RelayState>,
) -> Result<HttpResponse, RelayErr> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| RelayErr::NotMultipart("missing Content-Type".to_string()))?;
    let boundary = multer::parse_boundary(content_type).map_err(|e| RelayErr::NotMultipart(e.to_string()))?;

    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = Multipart::new(stream, boundary);
    let file = read_single_file(&mut multipart).await?;

    let key = shared_state.keys.derive(file.file_name.as_deref());
    let size = file.data.len();
    shared_state
        .store
        .put(&key, file.data, &file.content_type)
        .await
        .map_err(|e| {
            tracing::error!(key = %key, error = %e, "failed to store upload");
            RelayErr::Store(e)
        })?;

    tracing::info!(key = %key, size, content_type = %file.content_type, "stored upload");
    let resp = UploadResponse { url: shared_state.links.url_for(&key) };
    Ok(HttpResponse::Ok().content_type(APP_TYPE_JSON).json(resp))
}

#[get("/api/file")]
pub async fn fetch_file(
    query: web::Query<FileQuery>,
    shared_state: web::Data<RelayState>,
) -> Result<HttpResponse, RelayErr> {
    let key = query
        .into_inner()
        .key
        .filter(|k| !k.is_empty())
        .ok_or(RelayErr::MissingKey)?;

    let object = shared_state.store.get(&key).await.map_err(|e| {
        if e.is_not_found() {
            tracing::debug!(key = %key, "unknown key");
        } else {
            tracing::error!(key = %key, error = %e, "failed to read object");
        }
        RelayErr::Fetch(e)
    })?;

    let content_type = object
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| OCTET_STREAM.to_string());
    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .append_header((header::CACHE_CONTROL, cache_control(&key)))
        .body(object.data))
}

#[get("/api/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok()
        .content_type(APP_TYPE_JSON)
        .json(Health { status: "ok" })
}

/// Answers CORS preflights; everything else that reaches here is unknown.
async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        HttpResponse::NoContent()
            .append_header((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"))
            .finish()
    } else {
        HttpResponse::NotFound().insert_header(ContentType::plaintext()).body("Not found")
    }
}

/// Response headers that let browsers on any origin call the relay.
pub fn cors_headers() -> actix_web::middleware::DefaultHeaders {
    actix_web::middleware::DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, "*"))
}

/// Registers the relay's routes, its state and the upload size limit.
pub fn configure(cfg: &mut web::ServiceConfig, state: web::Data<RelayState>, max_upload_bytes: usize) {
    cfg.app_data(state)
        .app_data(web::PayloadConfig::new(max_upload_bytes))
        .service(upload_file)
        .service(fetch_file)
        .service(health)
        .default_service(web::to(fallback));
}
