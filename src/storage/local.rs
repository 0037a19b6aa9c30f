use super::{validate_key, BlobError, BlobStore, StoredObject};
use std::path::{Path, PathBuf};

/// Blob store on the local filesystem. Everything under `root` is served
/// publicly under `public_base` by the web layer.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredObject, BlobError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename so a reader never sees a half-written object.
        let tmp = path.with_extension(format!("{}.part", uuid::Uuid::new_v4().simple()));
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(key, size = data.len(), "Stored object");
        Ok(StoredObject {
            key: key.to_string(),
            public_url: self.public_url(key),
            content_type: content_type.to_string(),
            size: data.len(),
        })
    }

    fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
