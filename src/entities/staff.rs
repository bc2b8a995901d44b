use crate::clock;
use crate::config::PortalConfig;
use crate::errors::{AppError, AppResult};
use crate::identity;
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::passwords;
use crate::paths::{self, Collection};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::Employees;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub active: bool,
    pub suspended: bool,
    #[serde(default)]
    pub must_reset_password: bool,
    #[serde(default)]
    pub failed_logins: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub active: bool,
    pub updated_at: String,
}

impl IndexedSummary for EmployeeSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

// One fixed record, no index entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperadminRecord {
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub permissions: Vec<String>,
}

fn summarize(record: &EmployeeRecord) -> EmployeeSummary {
    EmployeeSummary {
        id: record.id.clone(),
        username: record.username.clone(),
        display_name: record.display_name.clone(),
        active: record.active,
        updated_at: record.updated_at.clone(),
    }
}

pub fn create(root: &Path, config: &PortalConfig, input: NewEmployee) -> AppResult<EmployeeRecord> {
    let username = identity::normalize_identifier(&input.username);
    if username.is_empty() {
        return Err(AppError::InvalidArgument(
            "employee username cannot be empty".to_string(),
        ));
    }
    if find_by_username(root, &username)?.is_some() {
        return Err(AppError::InvalidArgument(format!(
            "an employee named '{}' already exists",
            username
        )));
    }

    let now = clock::now_stamp();
    let record = EmployeeRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "EMP", config.record_id_suffix_len)?,
        username,
        display_name: input.display_name,
        password_hash: passwords::hash_password(&input.password)?,
        permissions: input.permissions,
        active: true,
        suspended: false,
        must_reset_password: true,
        failed_logins: 0,
        created_at: now.clone(),
        updated_at: now,
    };
    save(root, record)
}

pub fn save(root: &Path, mut record: EmployeeRecord) -> AppResult<EmployeeRecord> {
    if record.id.is_empty() {
        return Err(AppError::InvalidArgument(
            "employee save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(&paths::index_path(root, &COLLECTION)?, summarize(&record))?;
    Ok(record)
}

pub fn load(root: &Path, id: &str) -> AppResult<EmployeeRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn find_by_username(root: &Path, username: &str) -> AppResult<Option<EmployeeRecord>> {
    let normalized = identity::normalize_identifier(username);
    let entries: Vec<EmployeeSummary> = index::load(&paths::index_path(root, &COLLECTION)?)?;
    match entries.iter().find(|entry| entry.username == normalized) {
        Some(entry) => Ok(Some(load(root, &entry.id)?)),
        None => Ok(None),
    }
}

pub fn list(root: &Path) -> AppResult<Vec<EmployeeSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn delete(root: &Path, id: &str) -> AppResult<()> {
    store::delete_record(&paths::record_path(root, &COLLECTION, id)?)?;
    index::remove::<EmployeeSummary>(&paths::index_path(root, &COLLECTION)?, id)?;
    Ok(())
}

pub fn load_superadmin(root: &Path) -> AppResult<SuperadminRecord> {
    store::read_record(&paths::superadmin_path(root))
}

pub fn save_superadmin(root: &Path, mut record: SuperadminRecord) -> AppResult<SuperadminRecord> {
    record.username = identity::normalize_identifier(&record.username);
    record.updated_at = clock::now_stamp();
    store::write_record_atomic(&paths::superadmin_path(root), &record)?;
    Ok(record)
}

pub fn seed_superadmin(root: &Path, username: &str, password: &str) -> AppResult<SuperadminRecord> {
    save_superadmin(
        root,
        SuperadminRecord {
            username: username.to_string(),
            display_name: "Portal Administrator".to_string(),
            password_hash: passwords::hash_password(password)?,
            updated_at: clock::now_stamp(),
        },
    )
}
