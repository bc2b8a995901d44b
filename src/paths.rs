use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};

pub const SUPERADMIN_FILE: &str = "superadmin.json";
pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection<'a> {
    Contractors,
    Employees,
    Departments,
    DepartmentUsers { dept_id: &'a str },
    Bills { contractor_id: &'a str },
    Workorders,
    Suggestions,
    Reminders,
    Templates,
    TenderArchives,
}

pub fn collection_dir(root: &Path, collection: &Collection<'_>) -> AppResult<PathBuf> {
    let dir = match collection {
        Collection::Contractors => root.join("contractors"),
        Collection::Employees => root.join("employees"),
        Collection::Departments => root.join("departments"),
        Collection::DepartmentUsers { dept_id } => {
            validate_component(dept_id)?;
            root.join("departments").join(dept_id).join("users")
        }
        Collection::Bills { contractor_id } => {
            validate_component(contractor_id)?;
            root.join("contractors").join(contractor_id).join("bills")
        }
        Collection::Workorders => root.join("workorders"),
        Collection::Suggestions => root.join("suggestions"),
        Collection::Reminders => root.join("reminders"),
        Collection::Templates => root.join("templates"),
        Collection::TenderArchives => root.join("tenders"),
    };
    Ok(dir)
}

pub fn record_path(root: &Path, collection: &Collection<'_>, id: &str) -> AppResult<PathBuf> {
    validate_component(id)?;
    Ok(collection_dir(root, collection)?.join(format!("{}.json", id)))
}

pub fn index_path(root: &Path, collection: &Collection<'_>) -> AppResult<PathBuf> {
    Ok(collection_dir(root, collection)?.join(INDEX_FILE))
}

pub fn superadmin_path(root: &Path) -> PathBuf {
    root.join(SUPERADMIN_FILE)
}

pub fn ratelimit_path(root: &Path, key: &str) -> AppResult<PathBuf> {
    if key.len() != 64 || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AppError::InvalidArgument(format!(
            "rate-limit key must be a sha256 hex digest, got '{}'",
            key
        )));
    }
    Ok(root.join("ratelimits").join(format!("{}.json", key)))
}

pub fn audit_dir(root: &Path) -> PathBuf {
    root.join("audit")
}

// Ids land directly in file names; reject anything outside the id charset
// instead of mangling it, so (collection, id) -> path stays injective.
pub fn validate_component(value: &str) -> AppResult<()> {
    if value.is_empty() || value.len() > 128 {
        return Err(AppError::InvalidArgument(format!(
            "identifier '{}' must be 1..=128 characters",
            value
        )));
    }
    if value.starts_with('.') {
        return Err(AppError::InvalidArgument(format!(
            "identifier '{}' must not start with '.'",
            value
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
    {
        return Err(AppError::InvalidArgument(format!(
            "identifier '{}' contains unsupported characters",
            value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn distinct_ids_map_to_distinct_paths() {
        let root = Path::new("/data/portal");
        let a = record_path(root, &Collection::Contractors, "CON-A1B2C3").expect("path");
        let b = record_path(root, &Collection::Contractors, "CON-A1B2C4").expect("path");
        assert_ne!(a, b);
    }

    #[test]
    fn tenant_scoped_bills_nest_under_the_contractor() {
        let root = Path::new("/data/portal");
        let path = record_path(
            root,
            &Collection::Bills {
                contractor_id: "CON-A1B2C3",
            },
            "BILL-9X8Y7Z",
        )
        .expect("path");
        assert_eq!(
            path,
            root.join("contractors/CON-A1B2C3/bills/BILL-9X8Y7Z.json")
        );
    }

    #[test]
    fn compound_department_user_ids_are_valid_components() {
        assert!(validate_component("abc.admin.dep1").is_ok());
    }

    #[test]
    fn traversal_and_separator_ids_are_rejected() {
        for bad in ["", "..", "a/b", "a\\b", ".hidden", "x y"] {
            assert!(validate_component(bad).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn ratelimit_path_requires_hex_digest() {
        let root = Path::new("/data/portal");
        let key = "a".repeat(64);
        assert!(ratelimit_path(root, &key).is_ok());
        assert!(ratelimit_path(root, "not-a-digest").is_err());
        assert!(ratelimit_path(root, &"z".repeat(64)).is_err());
    }
}
