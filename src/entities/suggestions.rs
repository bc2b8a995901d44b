use crate::audit::{self, ClientInfo};
use crate::clock;
use crate::config::PortalConfig;
use crate::errors::{AppError, AppResult};
use crate::ids;
use crate::index::{self, IndexedSummary};
use crate::paths::{self, Collection};
use crate::ratelimit::{self, RateDecision};
use crate::store;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

const COLLECTION: Collection<'static> = Collection::Suggestions;
const SUBMISSION_SCOPE: &str = "public-suggestion";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub id: String,
    pub subject: String,
    pub message: String,
    pub submitter_name: Option<String>,
    pub contact: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSummary {
    pub id: String,
    pub subject: String,
    pub created_at: String,
}

impl IndexedSummary for SuggestionSummary {
    fn key(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.created_at
    }
}

#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub subject: String,
    pub message: String,
    pub submitter_name: Option<String>,
    pub contact: Option<String>,
}

// Public endpoint: the limiter gates the write and every submission
// consumes one slot of the window. Limiter failures fail the request.
pub fn submit(
    root: &Path,
    config: &PortalConfig,
    client: &ClientInfo,
    input: NewSuggestion,
) -> AppResult<SuggestionRecord> {
    if input.subject.trim().is_empty() || input.message.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "suggestion subject and message are required".to_string(),
        ));
    }

    let key = ratelimit::fingerprint(&client.ip, &client.user_agent, SUBMISSION_SCOPE);
    match ratelimit::evaluate(root, &config.suggestion_limits, &key)? {
        RateDecision::Allowed => {}
        RateDecision::Blocked { until } => {
            audit_denied(root, config, client, json!({"until": until}));
            return Err(AppError::LockedOut { until });
        }
        RateDecision::Exhausted => {
            audit_denied(root, config, client, json!({}));
            return Err(AppError::RateLimited(
                "suggestion window exhausted".to_string(),
            ));
        }
    }

    let now = clock::now_stamp();
    let record = SuggestionRecord {
        id: ids::allocate_record_id(root, &COLLECTION, "SUG", config.record_id_suffix_len)?,
        subject: input.subject.trim().to_string(),
        message: input.message,
        submitter_name: input.submitter_name,
        contact: input.contact,
        created_at: now,
    };
    let path = paths::record_path(root, &COLLECTION, &record.id)?;
    store::write_record_atomic(&path, &record)?;
    index::upsert(
        &paths::index_path(root, &COLLECTION)?,
        SuggestionSummary {
            id: record.id.clone(),
            subject: record.subject.clone(),
            created_at: record.created_at.clone(),
        },
    )?;

    ratelimit::record_attempt(root, &config.suggestion_limits, &key, false)?;
    audit::append(
        root,
        config.lock_wait_ms,
        audit::build_event(
            "suggestion_submitted",
            "public",
            client,
            "success",
            json!({"id": record.id}),
        ),
    );
    Ok(record)
}

fn audit_denied(root: &Path, config: &PortalConfig, client: &ClientInfo, payload: serde_json::Value) {
    audit::append(
        root,
        config.lock_wait_ms,
        audit::build_event("rate_limited", "public", client, "denied", payload),
    );
}

pub fn load(root: &Path, id: &str) -> AppResult<SuggestionRecord> {
    store::read_record(&paths::record_path(root, &COLLECTION, id)?)
}

pub fn list(root: &Path) -> AppResult<Vec<SuggestionSummary>> {
    index::load(&paths::index_path(root, &COLLECTION)?)
}

pub fn delete(root: &Path, id: &str) -> AppResult<()> {
    store::delete_record(&paths::record_path(root, &COLLECTION, id)?)?;
    index::remove::<SuggestionSummary>(&paths::index_path(root, &COLLECTION)?, id)?;
    Ok(())
}
