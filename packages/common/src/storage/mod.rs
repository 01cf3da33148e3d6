mod error;
mod key;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3_store;

pub use error::StorageError;
pub use key::{generate_key, sanitize_name, validate_key};
pub use traits::BlobStore;
