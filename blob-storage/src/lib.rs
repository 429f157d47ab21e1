//! Object storage for the file relay: a small async `BlobStore` trait and the backends
//! that implement it.

pub mod guard;
pub mod local_store;
pub mod memory_store;
pub mod s3_store;
pub mod store;

pub use guard::{GuardedStore, StorePolicy};
pub use local_store::LocalFileBlobStore;
pub use memory_store::MemoryBlobStore;
pub use s3_store::{S3BlobStore, S3Settings, StaticCredentials};
pub use store::{check_key, BlobError, BlobResult, BlobStore, BlobStores, StoredObject};
