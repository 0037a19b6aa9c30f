//! Naming and sniffing of uploaded images.

use std::path::Path;
use uuid::Uuid;

pub const UPLOAD_PREFIX: &str = "uploads";

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Reduce a client-supplied filename to a safe ASCII name: path components
/// and whitespace become `_`, anything outside `[A-Za-z0-9._-]` is dropped
/// and leading/trailing dots and underscores are trimmed.
pub fn secure_filename(name: &str) -> String {
    let flattened: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Storage key for an upload: the sanitized name prefixed with a fresh
/// random token, under the uploads namespace.
pub fn upload_key(original_name: &str) -> String {
    let name = secure_filename(original_name);
    let name = if name.is_empty() { "upload".to_string() } else { name };
    format!("{}/{}_{}", UPLOAD_PREFIX, Uuid::new_v4().simple(), name)
}

pub fn has_allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// MIME type of `data` if its magic bytes are an accepted image format.
pub fn sniff_image(data: &[u8]) -> Option<&'static str> {
    infer::get(data)
        .map(|kind| kind.mime_type())
        .filter(|mime| ALLOWED_MIME_TYPES.contains(mime))
}

/// Content type to store an upload with: the sniffed type, then the declared
/// one, then a guess from the filename.
pub fn content_type_for(filename: &str, declared: Option<&str>, data: &[u8]) -> String {
    if let Some(mime) = sniff_image(data) {
        return mime.to_string();
    }
    match declared {
        Some(d) if !d.is_empty() && d != "application/octet-stream" => d.to_string(),
        _ => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_mluts.txt");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_upload_key_is_namespaced_and_unique() {
        let a = upload_key("photo.png");
        let b = upload_key("photo.png");
        assert!(a.starts_with("uploads/"));
        assert!(a.ends_with("_photo.png"));
        assert_ne!(a, b);
        assert_ne!(a, "photo.png");
        assert!(upload_key("???").ends_with("_upload"));
    }

    #[test]
    fn test_allowed_extensions() {
        assert!(has_allowed_extension("a.jpg"));
        assert!(has_allowed_extension("a.JPEG"));
        assert!(has_allowed_extension("a.png"));
        assert!(!has_allowed_extension("a.gif"));
        assert!(!has_allowed_extension("png"));
    }

    #[test]
    fn test_sniff_image() {
        assert_eq!(sniff_image(PNG), Some("image/png"));
        assert_eq!(sniff_image(JPEG), Some("image/jpeg"));
        assert_eq!(sniff_image(b"GIF89a......"), None);
        assert_eq!(sniff_image(b"plain text"), None);
    }

    #[test]
    fn test_content_type_prefers_sniffed_type() {
        assert_eq!(content_type_for("a.jpg", Some("image/jpeg"), PNG), "image/png");
        assert_eq!(content_type_for("a.png", None, b"??"), "image/png");
        assert_eq!(content_type_for("a.jpg", Some("image/jpeg"), b"??"), "image/jpeg");
    }
}
