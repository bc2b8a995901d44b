use crate::clock;
use crate::config::PortalConfig;
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::paths::{self, Collection};
use crate::store;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::Templates;

// Notice/letter templates are stored verbatim; placeholder substitution
// belongs to the rendering layer, not the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub updated_at: String,
}

impl IndexedSummary for TemplateSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.updated_at
    }
}

pub fn create(root: &Path, config: &PortalConfig, name: &str, body: &str) -> AppResult<TemplateRecord> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "template name is required".to_string(),
        ));
    }
    let now = clock::now_stamp();
    let record = TemplateRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "TPL", config.record_id_suffix_len)?,
        name: name.trim().to_string(),
        body: body.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    save(root, record)
}

pub fn save(root: &Path, mut record: TemplateRecord) -> AppResult<TemplateRecord> {
    if record.id.is_empty() {
        return Err(AppError::InvalidArgument(
            "template save requires an id".to_string(),
        ));
    }
    record.updated_at = clock::now_stamp();
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(
        &paths::index_path(root, &COLLECTION)?,
        TemplateSummary {
            id: record.id.clone(),
            name: record.name.clone(),
            updated_at: record.updated_at.clone(),
        },
    )?;
    Ok(record)
}

pub fn load(root: &Path, id: &str) -> AppResult<TemplateRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn list(root: &Path) -> AppResult<Vec<TemplateSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn delete(root: &Path, id: &str) -> AppResult<()> {
    store::delete_record(&paths::record_path(root, &COLLECTION, id)?)?;
    index::remove::<TemplateSummary>(&paths::index_path(root, &COLLECTION)?, id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_bodies_are_stored_verbatim() {
        let root = tempfile::tempdir().expect("temp portal root");
        let config = PortalConfig::default();
        let body = "Dear {contractorName},\n\nYour bill {billId} has been approved.";

        let template = create(root.path(), &config, "Bill approval notice", body)
            .expect("create");
        let loaded = load(root.path(), &template.id).expect("load");
        assert_eq!(loaded.body, body);

        let listed = list(root.path()).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Bill approval notice");
    }

    #[test]
    fn unnamed_templates_are_refused() {
        let root = tempfile::tempdir().expect("temp portal root");
        assert!(create(root.path(), &PortalConfig::default(), "  ", "x").is_err());
    }
}
