use crate::clock;
use crate::config::PortalConfig;
use crate::entities::departments;
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::paths::{self, Collection};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::TenderArchives;

// Closed tenders filed for the record; immutable after archiving, so the
// index orders by createdAt rather than updatedAt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderArchiveRecord {
    pub id: String,
    pub department_id: String,
    pub title: String,
    pub reference_no: String,
    pub awarded_to: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderArchiveSummary {
    pub id: String,
    pub title: String,
    pub reference_no: String,
    pub created_at: String,
}

impl IndexedSummary for TenderArchiveSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.created_at
    }
}

pub fn archive(
    root: &Path,
    config: &PortalConfig,
    department_id: &str,
    title: &str,
    reference_no: &str,
    awarded_to: Option<String>,
) -> AppResult<TenderArchiveRecord> {
    departments::load_department(root, department_id)?;
    if reference_no.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "tender reference number is required".to_string(),
        ));
    }

    let record = TenderArchiveRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "TND", config.record_id_suffix_len)?,
        department_id: department_id.to_string(),
        title: title.to_string(),
        reference_no: reference_no.trim().to_string(),
        awarded_to,
        created_at: clock::now_stamp(),
    };
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(
        &paths::index_path(root, &COLLECTION)?,
        TenderArchiveSummary {
            id: record.id.clone(),
            title: record.title.clone(),
            reference_no: record.reference_no.clone(),
            created_at: record.created_at.clone(),
        },
    )?;
    Ok(record)
}

pub fn load(root: &Path, id: &str) -> AppResult<TenderArchiveRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn list(root: &Path) -> AppResult<Vec<TenderArchiveSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}
