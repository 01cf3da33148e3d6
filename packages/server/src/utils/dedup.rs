use sha2::{Digest, Sha256};

/// Stable key identifying one reported detection of one task.
///
/// Re-delivered batch callbacks produce the same key, so already stored
/// detections can be skipped.
pub fn detection_key(task_id: i32, image_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(image_path.as_bytes());
    hex::encode(hasher.finalize())
}
