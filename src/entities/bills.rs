use crate::clock;
use crate::config::PortalConfig;
use crate::entities::contractors;
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::paths::{self, Collection};
use crate::status::{StatusBearing, StatusFlow, StatusHistoryEntry, BILL_STAGES};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub fn flow() -> StatusFlow {
    StatusFlow::new(BILL_STAGES)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillRecord {
    pub id: String,
    pub contractor_id: String,
    pub title: String,
    pub amount_paise: i64,
    pub status: String,
    pub submitted_at: Option<String>,
    pub approved_at: Option<String>,
    pub paid_at: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
}

impl StatusBearing for BillRecord {
    fn status(&self) -> &str {
        &self.status
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn set_stage_time(&mut self, stage: &str, at: Option<String>) {
        match stage {
            "submitted" => self.submitted_at = at,
            "approved" => self.approved_at = at,
            "paid" => self.paid_at = at,
            _ => {}
        }
    }

    fn history_mut(&mut self) -> &mut Vec<StatusHistoryEntry> {
        &mut self.status_history
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    pub id: String,
    pub title: String,
    pub status: String,
    pub amount_paise: i64,
    pub updated_at: String,
}

impl IndexedSummary for BillSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

fn summarize(record: &BillRecord) -> BillSummary {
    BillSummary {
        id: record.id.clone(),
        title: record.title.clone(),
        status: record.status.clone(),
        amount_paise: record.amount_paise,
        updated_at: record.updated_at.clone(),
    }
}

pub fn create(
    root: &Path,
    config: &PortalConfig,
    contractor_id: &str,
    title: &str,
    amount_paise: i64,
) -> AppResult<BillRecord> {
    // The contractor record anchors the tenant directory.
    contractors::load(root, contractor_id)?;
    if amount_paise <= 0 {
        return Err(AppError::InvalidArgument(format!(
            "bill amount must be positive, got {}",
            amount_paise
        )));
    }

    let collection = Collection::Bills { contractor_id };
    let now = clock::now_stamp();
    let record = BillRecord {
        id: ids::allocate_record_id(root, &collection, "BILL", config.record_id_suffix_len)?,
        contractor_id: contractor_id.to_string(),
        title: title.to_string(),
        amount_paise,
        status: flow().initial().to_string(),
        submitted_at: None,
        approved_at: None,
        paid_at: None,
        status_history: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    };
    save(root, record)
}

pub fn save(root: &Path, mut record: BillRecord) -> AppResult<BillRecord> {
    if record.id.is_empty() || record.contractor_id.is_empty() {
        return Err(AppError::InvalidArgument(
            "bill save requires bill and contractor ids".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let collection = Collection::Bills {
        contractor_id: &record.contractor_id,
    };
    let path = paths::record_path(root, &collection, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(&paths::index_path(root, &collection)?, summarize(&record))?;
    Ok(record)
}

pub fn load(root: &Path, contractor_id: &str, bill_id: &str) -> AppResult<BillRecord> {
    let collection = Collection::Bills { contractor_id };
    store::read_record(&paths::record_path(root, &collection, bill_id)?)
}

pub fn list(root: &Path, contractor_id: &str) -> AppResult<Vec<BillSummary>> {
    let collection = Collection::Bills { contractor_id };
    index::load(&paths::index_path(root, &collection)?)
}

// Status moves only through the flow engine; a failed validation leaves
// the stored record untouched.
pub fn transition(
    root: &Path,
    contractor_id: &str,
    bill_id: &str,
    target: &str,
    actor: &str,
    confirm_rollback: bool,
) -> AppResult<BillRecord> {
    let mut record = load(root, contractor_id, bill_id)?;
    flow().transition(&mut record, target, actor, confirm_rollback)?;
    save(root, record)
}

pub fn delete(root: &Path, contractor_id: &str, bill_id: &str) -> AppResult<()> {
    let collection = Collection::Bills { contractor_id };
    store::delete_record(&paths::record_path(root, &collection, bill_id)?)?;
    index::remove::<BillSummary>(&paths::index_path(root, &collection)?, bill_id)?;
    Ok(())
}
