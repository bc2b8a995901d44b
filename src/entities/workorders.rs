use crate::clock;
use crate::config::PortalConfig;
use crate::entities::departments;
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::paths::{self, Collection};
use crate::status::{StatusBearing, StatusFlow, StatusHistoryEntry, WORKORDER_STAGES};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::Workorders;

pub fn flow() -> StatusFlow {
    StatusFlow::new(WORKORDER_STAGES)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkorderRecord {
    pub id: String,
    pub department_id: String,
    pub contractor_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub issued_at: Option<String>,
    pub in_progress_at: Option<String>,
    pub completed_at: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl StatusBearing for WorkorderRecord {
    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn set_stage_time(&mut self, stage: &str, at: Option<String>) {
        match stage {
            "issued" => self.issued_at = at,
            "in-progress" => self.in_progress_at = at,
            "completed" => self.completed_at = at,
            _ => {}
        }
    }

    fn history_mut(&mut self) -> &mut Vec<StatusHistoryEntry> {
        &mut self.status_history
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkorderSummary {
    pub id: String,
    pub department_id: String,
    pub title: String,
    pub status: String,
    pub updated_at: String,
}

impl IndexedSummary for WorkorderSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

fn summarize(record: &WorkorderRecord) -> WorkorderSummary {
    WorkorderSummary {
        id: record.id.clone(),
        department_id: record.department_id.clone(),
        title: record.title.clone(),
        status: record.status.clone(),
        updated_at: record.updated_at.clone(),
    }
}

pub fn create(
    root: &Path,
    config: &PortalConfig,
    department_id: &str,
    title: &str,
    description: &str,
) -> AppResult<WorkorderRecord> {
    departments::load_department(root, department_id)?;

    let now = clock::now_stamp();
    let record = WorkorderRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "WO", config.record_id_suffix_len)?,
        department_id: department_id.to_string(),
        contractor_id: None,
        title: title.to_string(),
        description: description.to_string(),
        status: flow().initial().to_string(),
        issued_at: None,
        in_progress_at: None,
        completed_at: None,
        status_history: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    };
    save(root, record)
}

pub fn save(root: &Path, mut record: WorkorderRecord) -> AppResult<WorkorderRecord> {
    if record.id.is_empty() {
        return Err(AppError::InvalidArgument(
            "workorder save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(&paths::index_path(root, &COLLECTION)?, summarize(&record))?;
    Ok(record)
}

pub fn load(root: &Path, id: &str) -> AppResult<WorkorderRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn list(root: &Path) -> AppResult<Vec<WorkorderSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn assign_contractor(root: &Path, id: &str, contractor_id: &str) -> AppResult<WorkorderRecord> {
    crate::entities::contractors::load(root, contractor_id)?;
    let mut record = load(root, id)?;
    record.contractor_id = Some(contractor_id.to_string());
    save(root, record)
}

pub fn transition(
    root: &Path,
    id: &str,
    target: &str,
    actor: &str,
    confirm_rollback: bool,
) -> AppResult<WorkorderRecord> {
    let mut record = load(root, id)?;
    flow().transition(&mut record, target, actor, confirm_rollback)?;
    save(root, record)
}

pub fn delete(root: &Path, id: &str) -> AppResult<()> {
    store::delete_record(&paths::record_path(root, &COLLECTION, id)?)?;
    index::remove::<WorkorderSummary>(&paths::index_path(root, &COLLECTION)?, id)?;
    Ok(())
}
