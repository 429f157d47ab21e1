//! HTTP relay that takes one uploaded file per request, writes it to a blob store, and
//! serves it back by key.

pub mod config;
pub mod errors;
pub mod keys;
pub mod links;
pub mod params;
pub mod services;

pub use services::relay_service::{configure, cors_headers, RelayState, UploadResponse};
