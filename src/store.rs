use crate::errors::{AppError, AppResult};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

pub fn read_record<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(path.to_string_lossy().to_string()));
        }
        Err(error) => return Err(AppError::Io(error.to_string())),
    };
    serde_json::from_slice(&bytes).map_err(|error| {
        AppError::Corrupt(format!("{}: {}", path.to_string_lossy(), error))
    })
}

// Callers that default a missing record must say so at the call site.
pub fn try_read_record<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    match read_record(path) {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(error) => Err(error),
    }
}

pub fn write_record_atomic<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let parent = path.parent().ok_or_else(|| {
        AppError::InvalidArgument(format!(
            "record path '{}' has no parent directory",
            path.to_string_lossy()
        ))
    })?;
    fs::create_dir_all(parent).map_err(|error| AppError::Io(error.to_string()))?;

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = temp_sibling(path);
    let result = write_and_rename(&tmp, path, &bytes);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, target: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut file = File::create(tmp).map_err(|error| AppError::Io(error.to_string()))?;
    file.write_all(bytes)
        .map_err(|error| AppError::Io(error.to_string()))?;
    file.sync_all()
        .map_err(|error| AppError::Io(error.to_string()))?;
    drop(file);
    fs::rename(tmp, target).map_err(|error| AppError::Io(error.to_string()))
}

// Unique temp name per writer: two concurrent writers race on the rename
// (last one wins), never on the temp file contents.
fn temp_sibling(path: &Path) -> PathBuf {
    let stem = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "record".to_string());
    path.with_file_name(format!(".{}.{}.tmp", stem, Uuid::new_v4().simple()))
}

pub fn delete_record(path: &Path) -> AppResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            Err(AppError::NotFound(path.to_string_lossy().to_string()))
        }
        Err(error) => Err(AppError::Io(error.to_string())),
    }
}

pub fn append_ndjson_locked<T: Serialize>(path: &Path, value: &T, wait: Duration) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| AppError::Io(error.to_string()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| AppError::Io(error.to_string()))?;

    lock_with_deadline(&file, path, wait)?;
    let line = serde_json::to_string(value)?;
    let outcome = writeln!(file, "{}", line).map_err(|error| AppError::Io(error.to_string()));
    let _ = FileExt::unlock(&file);
    outcome
}

fn lock_with_deadline(file: &File, path: &Path, wait: Duration) -> AppResult<()> {
    let deadline = Instant::now() + wait;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(error) => {
                if Instant::now() >= deadline {
                    tracing::warn!(
                        path = %path.to_string_lossy(),
                        error = %error,
                        "gave up waiting for append lock"
                    );
                    return Err(AppError::LockBusy(path.to_string_lossy().to_string()));
                }
                std::thread::sleep(LOCK_POLL_INTERVAL);
            }
        }
    }
}

pub fn read_ndjson<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(AppError::Io(error.to_string())),
    };

    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|error| AppError::Io(error.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(entry) => entries.push(entry),
            Err(error) => {
                tracing::warn!(path = %path.to_string_lossy(), error = %error, "skipping malformed log line");
            }
        }
    }
    Ok(entries)
}
