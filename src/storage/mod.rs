//! Object storage for uploaded images.

mod local;

pub use local::LocalBlobStore;

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub public_url: String,
    pub content_type: String,
    pub size: usize,
}

/// A bucket of publicly readable objects addressed by slash-separated keys.
pub trait BlobStore: Send + Sync {
    /// Write an object and make it publicly readable.
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject, BlobError>;

    fn delete(&self, key: &str) -> Result<(), BlobError>;

    fn public_url(&self, key: &str) -> String;
}

/// Keys are relative, slash-separated and may not escape the bucket.
pub fn validate_key(key: &str) -> Result<(), BlobError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("uploads/abc_photo.png").is_ok());
        assert!(validate_key("photo.png").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("uploads/../secret").is_err());
        assert!(validate_key("uploads//x.png").is_err());
        assert!(validate_key("uploads\\x.png").is_err());
    }
}
