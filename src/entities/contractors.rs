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

const COLLECTION: Collection<'static> = Collection::Contractors;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorRecord {
    pub id: String,
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub password_hash: String,
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
pub struct ContractorSummary {
    pub id: String,
    pub name: String,
    pub mobile: String,
    pub active: bool,
    pub updated_at: String,
}

impl IndexedSummary for ContractorSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

#[derive(Debug, Clone)]
pub struct NewContractor {
    pub name: String,
    pub mobile: String,
    pub email: Option<String>,
    pub password: String,
}

fn summarize(record: &ContractorRecord) -> ContractorSummary {
    ContractorSummary {
        id: record.id.clone(),
        name: record.name.clone(),
        mobile: record.mobile.clone(),
        active: record.active,
        updated_at: record.updated_at.clone(),
    }
}

pub fn create(root: &Path, config: &PortalConfig, input: NewContractor) -> AppResult<ContractorRecord> {
    let mobile = identity::normalize_mobile(&input.mobile);
    if mobile.len() != 10 {
        return Err(AppError::InvalidArgument(format!(
            "mobile '{}' does not normalize to 10 digits",
            input.mobile
        )));
    }
    if find_by_mobile(root, &mobile)?.is_some() {
        return Err(AppError::InvalidArgument(format!(
            "a contractor with mobile {} already exists",
            mobile
        )));
    }

    let now = clock::now_stamp();
    let record = ContractorRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "CON", config.record_id_suffix_len)?,
        name: input.name,
        mobile,
        email: input.email,
        password_hash: passwords::hash_password(&input.password)?,
        active: true,
        suspended: false,
        must_reset_password: false,
        failed_logins: 0,
        created_at: now.clone(),
        updated_at: now,
    };
    save(root, record)
}

// Record first, then the index entry. The pair is two independent atomic
// writes; a failure between them leaves them divergent (documented).
pub fn save(root: &Path, mut record: ContractorRecord) -> AppResult<ContractorRecord> {
    if record.id.is_empty() {
        return Err(AppError::InvalidArgument(
            "contractor save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(&paths::index_path(root, &COLLECTION)?, summarize(&record))?;
    Ok(record)
}

pub fn load(root: &Path, id: &str) -> AppResult<ContractorRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn find_by_mobile(root: &Path, mobile: &str) -> AppResult<Option<ContractorRecord>> {
    let normalized = identity::normalize_mobile(mobile);
    let entries: Vec<ContractorSummary> = index::load(&paths::index_path(root, &COLLECTION)?)?;
    match entries.iter().find(|entry| entry.mobile == normalized) {
        Some(entry) => Ok(Some(load(root, &entry.id)?)),
        None => Ok(None),
    }
}

pub fn list(root: &Path) -> AppResult<Vec<ContractorSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn delete(root: &Path, id: &str) -> AppResult<()> {
    store::delete_record(&paths::record_path(root, &COLLECTION, id)?)?;
    index::remove::<ContractorSummary>(&paths::index_path(root, &COLLECTION)?, id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp portal root")
    }

    fn sample() -> NewContractor {
        NewContractor {
            name: "Sharma Constructions".to_string(),
            mobile: "+91 98765 43210".to_string(),
            email: Some("office@sharma.example".to_string()),
            password: "first-login-pass".to_string(),
        }
    }

    #[test]
    fn create_normalizes_mobile_and_indexes_the_record() {
        let root = temp_root();
        let config = PortalConfig::default();
        let record = create(root.path(), &config, sample()).expect("create");

        assert!(record.id.starts_with("CON-"));
        assert_eq!(record.mobile, "9876543210");
        assert!(record.active);

        let listed = list(root.path()).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
    }

    #[test]
    fn duplicate_mobile_is_rejected() {
        let root = temp_root();
        let config = PortalConfig::default();
        create(root.path(), &config, sample()).expect("first");
        let result = create(root.path(), &config, sample());
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn lookup_by_mobile_accepts_unnormalized_input() {
        let root = temp_root();
        let config = PortalConfig::default();
        let created = create(root.path(), &config, sample()).expect("create");

        let found = find_by_mobile(root.path(), "098765 43210")
            .expect("lookup")
            .expect("present");
        assert_eq!(found.id, created.id);
        assert!(find_by_mobile(root.path(), "9999999999")
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn resave_updates_the_index_entry_in_place() {
        let root = temp_root();
        let config = PortalConfig::default();
        let mut record = create(root.path(), &config, sample()).expect("create");
        record.name = "Sharma & Sons".to_string();
        save(root.path(), record).expect("resave");

        let listed = list(root.path()).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Sharma & Sons");
    }

    #[test]
    fn delete_removes_record_and_index_entry() {
        let root = temp_root();
        let config = PortalConfig::default();
        let record = create(root.path(), &config, sample()).expect("create");

        delete(root.path(), &record.id).expect("delete");
        assert!(matches!(
            load(root.path(), &record.id),
            Err(AppError::NotFound(_))
        ));
        assert!(list(root.path()).expect("list").is_empty());
    }

    #[test]
    fn save_without_id_is_invalid() {
        let root = temp_root();
        let record = ContractorRecord {
            id: String::new(),
            name: "x".to_string(),
            mobile: "9876543210".to_string(),
            email: None,
            password_hash: "h".to_string(),
            active: true,
            suspended: false,
            must_reset_password: false,
            failed_logins: 0,
            created_at: clock::now_stamp(),
            updated_at: clock::now_stamp(),
        };
        assert!(matches!(
            save(root.path(), record),
            Err(AppError::InvalidArgument(_))
        ));
    }
}
