use crate::clock;
use crate::config::PortalConfig;
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::paths::{self, Collection};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::Reminders;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecord {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub due_at: String,
    pub done: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSummary {
    pub id: String,
    pub title: String,
    pub due_at: String,
    pub done: bool,
    pub updated_at: String,
}

impl IndexedSummary for ReminderSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

fn summarize(record: &ReminderRecord) -> ReminderSummary {
    ReminderSummary {
        id: record.id.clone(),
        title: record.title.clone(),
        due_at: record.due_at.clone(),
        done: record.done,
        updated_at: record.updated_at.clone(),
    }
}

pub fn create(
    root: &Path,
    config: &PortalConfig,
    title: &str,
    notes: &str,
    due_at: &str,
) -> AppResult<ReminderRecord> {
    let now = clock::now_stamp();
    let record = ReminderRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "REM", config.record_id_suffix_len)?,
        title: title.to_string(),
        notes: notes.to_string(),
        due_at: due_at.to_string(),
        done: false,
        created_at: now.clone(),
        updated_at: now,
    };
    save(root, record)
}

pub fn save(root: &Path, mut record: ReminderRecord) -> AppResult<ReminderRecord> {
    if record.id.is_empty() {
        return Err(AppError::InvalidArgument(
            "reminder save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(&paths::index_path(root, &COLLECTION)?, summarize(&record))?;
    Ok(record)
}

pub fn load(root: &Path, id: &str) -> AppResult<ReminderRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn list(root: &Path) -> AppResult<Vec<ReminderSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn mark_done(root: &Path, id: &str) -> AppResult<ReminderRecord> {
    let mut record = load(root, id)?;
    record.done = true;
    save(root, record)
}

pub fn delete(root: &Path, id: &str) -> AppResult<()> {
    store::delete_record(&paths::record_path(root, &COLLECTION, id)?)?;
    index::remove::<ReminderSummary>(&paths::index_path(root, &COLLECTION)?, id)?;
    Ok(())
}
