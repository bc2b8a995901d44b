use crate::errors::AppResult;
use crate::store;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

// One summary entry per live record, ordered by sort_key() descending.
// sort_key() is an RFC 3339 stamp, so string order is time order.
pub trait IndexedSummary: Serialize + DeserializeOwned + Clone {
    fn key(&self) -> &str;
    fn sort_key(&self) -> &str;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
struct IndexFile<T> {
    entries: Vec<T>,
}

pub fn load<T: IndexedSummary>(index_path: &Path) -> AppResult<Vec<T>> {
    let file: Option<IndexFile<T>> = store::try_read_record(index_path)?;
    Ok(file.map(|value| value.entries).unwrap_or_default())
}

pub fn upsert<T: IndexedSummary>(index_path: &Path, entry: T) -> AppResult<Vec<T>> {
    let mut entries: Vec<T> = load(index_path)?;
    match entries.iter_mut().find(|existing| existing.key() == entry.key()) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
    entries.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));
    store::write_record_atomic(index_path, &IndexFile { entries })?;
    load(index_path)
}

pub fn remove<T: IndexedSummary>(index_path: &Path, key: &str) -> AppResult<Vec<T>> {
    let mut entries: Vec<T> = load(index_path)?;
    entries.retain(|existing| existing.key() != key);
    store::write_record_atomic(index_path, &IndexFile { entries })?;
    load(index_path)
}
