use crate::clock;
use crate::errors::{AppError, AppResult};
use crate::identity::{self, DeptLoginId};
use crate::index::{self, IndexedSummary};
use crate::passwords;
use crate::paths::{self, Collection};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::Departments;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeptRole {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<DeptRole>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub updated_at: String,
}

impl IndexedSummary for DepartmentSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentUserRecord {
    pub full_user_id: String,
    pub short_id: String,
    pub role_id: String,
    pub dept_id: String,
    pub display_name: String,
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
pub struct DepartmentUserSummary {
    pub full_user_id: String,
    pub display_name: String,
    pub role_id: String,
    pub active: bool,
    pub updated_at: String,
}

impl IndexedSummary for DepartmentUserSummary {
    fn key(&self) -> &str {
        &self.full_user_id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

// Department and member ids are admin-chosen slugs: they appear inside
// compound login identifiers, which normalize to lowercase.
fn validate_slug(value: &str) -> AppResult<()> {
    let ok = value.len() >= 2
        && value.len() <= 32
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        && value.as_bytes()[0].is_ascii_alphanumeric();
    if ok {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "'{}' is not a valid lowercase slug",
            value
        )))
    }
}

pub fn create_department(
    root: &Path,
    id: &str,
    name: &str,
    roles: Vec<DeptRole>,
) -> AppResult<DepartmentRecord> {
    validate_slug(id)?;
    for role in &roles {
        validate_slug(&role.id)?;
    }
    let path = paths::record_path(root, &COLLECTION, id)?;
    if path.exists() {
        return Err(AppError::InvalidArgument(format!(
            "department '{}' already exists",
            id
        )));
    }

    let now = clock::now_stamp();
    save_department(
        root,
        DepartmentRecord {
            id: id.to_string(),
            name: name.to_string(),
            roles,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        },
    )
}

pub fn save_department(root: &Path, mut record: DepartmentRecord) -> AppResult<DepartmentRecord> {
    if record.id.is_empty() {
        return Err(AppError::InvalidArgument(
            "department save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(
        &paths::index_path(root, &COLLECTION)?,
        DepartmentSummary {
            id: record.id.clone(),
            name: record.name.clone(),
            active: record.active,
            updated_at: record.updated_at.clone(),
        },
    )?;
    Ok(record)
}

pub fn load_department(root: &Path, id: &str) -> AppResult<DepartmentRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn list_departments(root: &Path) -> AppResult<Vec<DepartmentSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn role_of<'a>(department: &'a DepartmentRecord, role_id: &str) -> Option<&'a DeptRole> {
    department.roles.iter().find(|role| role.id == role_id)
}

pub fn create_user(
    root: &Path,
    dept_id: &str,
    short_id: &str,
    role_id: &str,
    display_name: &str,
    password: &str,
) -> AppResult<DepartmentUserRecord> {
    let short_id = identity::normalize_identifier(short_id);
    validate_slug(&short_id)?;

    let department = load_department(root, dept_id)?;
    if role_of(&department, role_id).is_none() {
        return Err(AppError::RoleMissing(format!(
            "department '{}' has no role '{}'",
            dept_id, role_id
        )));
    }

    let full = format!("{}.{}.{}", short_id, role_id, department.id);
    // Round-trips through the same parser logins use.
    let parsed = DeptLoginId::parse(&full)?;
    let collection = Collection::DepartmentUsers {
        dept_id: &department.id,
    };
    if paths::record_path(root, &collection, &parsed.full)?.exists() {
        return Err(AppError::InvalidArgument(format!(
            "department user '{}' already exists",
            parsed.full
        )));
    }

    let now = clock::now_stamp();
    save_user(
        root,
        DepartmentUserRecord {
            full_user_id: parsed.full,
            short_id: parsed.user_short_id,
            role_id: parsed.role_id,
            dept_id: parsed.dept_id,
            display_name: display_name.to_string(),
            password_hash: passwords::hash_password(password)?,
            active: true,
            suspended: false,
            must_reset_password: true,
            failed_logins: 0,
            created_at: now.clone(),
            updated_at: now,
        },
    )
}

pub fn save_user(root: &Path, mut record: DepartmentUserRecord) -> AppResult<DepartmentUserRecord> {
    if record.full_user_id.is_empty() {
        return Err(AppError::InvalidArgument(
            "department user save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let collection = Collection::DepartmentUsers {
        dept_id: &record.dept_id,
    };
    let path = paths::record_path(root, &collection, &record.full_user_id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(
        &paths::index_path(root, &collection)?,
        DepartmentUserSummary {
            full_user_id: record.full_user_id.clone(),
            display_name: record.display_name.clone(),
            role_id: record.role_id.clone(),
            active: record.active,
            updated_at: record.updated_at.clone(),
        },
    )?;
    Ok(record)
}

pub fn load_user(root: &Path, dept_id: &str, full_user_id: &str) -> AppResult<DepartmentUserRecord> {
    let collection = Collection::DepartmentUsers { dept_id };
    store::read_record(&paths::record_path(root, &collection, full_user_id)?)
}

pub fn list_users(root: &Path, dept_id: &str) -> AppResult<Vec<DepartmentUserSummary>> {
    let collection = Collection::DepartmentUsers { dept_id };
    index::load(&paths::index_path(root, &collection)?)
}

pub fn delete_user(root: &Path, dept_id: &str, full_user_id: &str) -> AppResult<()> {
    let collection = Collection::DepartmentUsers { dept_id };
    store::delete_record(&paths::record_path(root, &collection, full_user_id)?)?;
    index::remove::<DepartmentUserSummary>(&paths::index_path(root, &collection)?, full_user_id)?;
    Ok(())
}
