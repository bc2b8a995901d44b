use crate::clock;
use crate::errors::AppResult;
use crate::paths;
use crate::store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    pub event: String,
    pub actor: String,
    pub ip: String,
    pub user_agent: String,
    pub outcome: String,
    pub occurred_at: String,
    pub payload: Value,
}

pub fn build_event(
    event: &str,
    actor: &str,
    client: &ClientInfo,
    outcome: &str,
    payload: Value,
) -> AuditEvent {
    AuditEvent {
        id: format!("aud_{}", Uuid::new_v4().simple()),
        event: event.to_string(),
        actor: actor.to_string(),
        ip: client.ip.clone(),
        user_agent: client.user_agent.clone(),
        outcome: outcome.to_string(),
        occurred_at: clock::now_stamp(),
        payload,
    }
}

// Best-effort: the audit trail never blocks the primary response.
pub fn append(root: &Path, lock_wait_ms: u64, event: AuditEvent) {
    let date = clock::now().format("%Y-%m-%d").to_string();
    let path = paths::audit_dir(root).join(format!("{}.ndjson", date));
    if let Err(error) = store::append_ndjson_locked(
        &path,
        &event,
        Duration::from_millis(lock_wait_ms),
    ) {
        tracing::warn!(
            event = %event.event,
            actor = %event.actor,
            error = %error,
            "audit append failed"
        );
    }
}

pub fn events_for_day(root: &Path, date: &str) -> AppResult<Vec<AuditEvent>> {
    let path = paths::audit_dir(root).join(format!("{}.ndjson", date));
    store::read_ndjson(&path)
}

pub fn today_stamp() -> String {
    clock::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ClientInfo {
        ClientInfo {
            ip: "203.0.113.9".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }

    #[test]
    fn appended_events_read_back_in_order() {
        let root = tempfile::tempdir().expect("temp root");
        append(
            root.path(),
            500,
            build_event("login_failed", "clerk01", &client(), "denied", json!({})),
        );
        append(
            root.path(),
            500,
            build_event(
                "login_success",
                "clerk01",
                &client(),
                "success",
                json!({"role": "employee"}),
            ),
        );

        let events = events_for_day(root.path(), &today_stamp()).expect("events");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "login_failed");
        assert_eq!(events[1].event, "login_success");
        assert_eq!(events[1].ip, "203.0.113.9");
    }

    #[test]
    fn append_failure_is_swallowed() {
        let root = tempfile::tempdir().expect("temp root");
        let audit_path = paths::audit_dir(root.path());
        std::fs::write(&audit_path, b"not a directory").expect("block audit dir");

        // Must not panic or propagate.
        append(
            root.path(),
            100,
            build_event("login_failed", "clerk01", &client(), "denied", json!({})),
        );
    }

    #[test]
    fn missing_day_file_reads_as_empty() {
        let root = tempfile::tempdir().expect("temp root");
        let events = events_for_day(root.path(), "1999-01-01").expect("events");
        assert!(events.is_empty());
    }
}
