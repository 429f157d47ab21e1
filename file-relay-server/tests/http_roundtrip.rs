use std::sync::Arc;

use actix_web::http::header;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpServer};
use blob_store::{GuardedStore, LocalFileBlobStore, StorePolicy};
use file_relay_server::keys::KeyStrategy;
use file_relay_server::links::RetrievalLinks;
use file_relay_server::{configure, cors_headers, RelayState, UploadResponse};

const BOUNDARY: &str = "----relay-roundtrip";

fn single_file_form(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[actix_web::test]
async fn test_upload_and_fetch_over_http() {
    let temp_dir = tempfile::tempdir().unwrap();
    let local = LocalFileBlobStore::open(temp_dir.path()).await.unwrap();
    let store = Arc::new(GuardedStore::new(local, StorePolicy::default()));
    let state = web::Data::new(RelayState::new(store, KeyStrategy::Random, RetrievalLinks::relative()));

    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(cors_headers())
            .configure(move |cfg| configure(cfg, state, 1024 * 1024))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let client = awc::Client::default();
    let jpeg: Vec<u8> = [&b"\xFF\xD8\xFF\xE0"[..], &[0u8; 4096][..], &b"\xFF\xD9"[..]].concat();

    let mut resp = client
        .post(format!("http://{addr}/api/upload"))
        .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .send_body(single_file_form("photo.jpg", "image/jpeg", &jpeg))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let upload: UploadResponse = resp.json().await.unwrap();
    assert!(upload.url.starts_with("/api/file?key="));

    let mut resp = client.get(format!("http://{addr}{}", upload.url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
    let body = resp.body().await.unwrap();
    assert_eq!(body.as_ref(), jpeg.as_slice());

    let resp = client
        .get(format!("http://{addr}/api/file?key=0123456789abcdef0123456789abcdef"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client.get(format!("http://{addr}/api/file")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    handle.stop(true).await;
}
