use crate::errors::{AppError, AppResult};
use crate::paths::{self, Collection};
use rand::Rng;
use std::path::Path;

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ALLOCATION_ATTEMPTS: usize = 32;

pub fn generate_id(prefix: &str, suffix_len: usize) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..suffix_len)
        .map(|_| ID_CHARSET[rng.random_range(0..ID_CHARSET.len())] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

// Collision avoidance is the retry loop itself: regenerate until no
// record file with that id exists.
pub fn allocate_record_id(
    root: &Path,
    collection: &Collection<'_>,
    prefix: &str,
    suffix_len: usize,
) -> AppResult<String> {
    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let candidate = generate_id(prefix, suffix_len);
        if !paths::record_path(root, collection, &candidate)?.exists() {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(format!(
        "could not allocate a free '{}' id after {} attempts",
        prefix, MAX_ALLOCATION_ATTEMPTS
    )))
}
