use uuid::Uuid;

use super::error::StorageError;

const FALLBACK_NAME: &str = "file";
const MAX_NAME_CHARS: usize = 128;

/// Generate a collision-resistant object key for an uploaded file.
///
/// The key is `<prefix>/<uuid>_<name>` (or `<uuid>_<name>` without prefix),
/// where `name` is the sanitized original filename.
pub fn generate_key(prefix: Option<&str>, original_name: &str) -> String {
    let name = sanitize_name(original_name);
    let id = Uuid::new_v4();
    match prefix {
        Some(prefix) => format!("{}/{id}_{name}", prefix.trim_matches('/')),
        None => format!("{id}_{name}"),
    }
}

/// Reduce an arbitrary client-supplied filename to a safe flat name.
///
/// Directory components are stripped, control characters and separators
/// are replaced with `_`, and empty or hidden names fall back to `file`.
pub fn sanitize_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_control() || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Validate a key before handing it to a backend.
///
/// Rejects empty keys, absolute paths, backslashes, null bytes and any `..`
/// segment.
pub fn validate_key(key: &str) -> Result<&str, StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey("null byte in key".into()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!("'{key}' is not relative")));
    }
    if key.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(StorageError::InvalidKey(format!(
            "'{key}' contains an empty or '..' segment"
        )));
    }
    Ok(key)
}
