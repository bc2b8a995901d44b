use crate::clock;
use crate::config::RateLimitPolicy;
use crate::errors::AppResult;
use crate::paths;
use crate::store;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

// One state file per fingerprint. Attempts are epoch seconds; stale ones
// are pruned lazily on every read/write, never by a background sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitState {
    #[serde(default)]
    pub attempts: Vec<i64>,
    #[serde(default)]
    pub blocked_until: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Exhausted,
    Blocked { until: i64 },
}

// Lockouts scope to device + identity, not per account and not per IP.
pub fn fingerprint(ip: &str, user_agent: &str, identity: &str) -> String {
    sha256_hex(&format!("{}|{}|{}", ip, user_agent, identity))
}

pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

impl RateLimitState {
    pub fn prune(&mut self, policy: &RateLimitPolicy, now: i64) {
        self.attempts
            .retain(|recorded| now - recorded <= policy.window_seconds);
    }

    pub fn decide(&self, policy: &RateLimitPolicy, now: i64) -> RateDecision {
        if let Some(until) = self.blocked_until {
            if until > now {
                return RateDecision::Blocked { until };
            }
        }
        if self.attempts.len() >= policy.max_attempts {
            RateDecision::Exhausted
        } else {
            RateDecision::Allowed
        }
    }

    pub fn register_failure(&mut self, policy: &RateLimitPolicy, now: i64) {
        self.prune(policy, now);
        self.attempts.push(now);
        if self.attempts.len() >= policy.max_attempts {
            self.blocked_until = Some(now + policy.block_seconds);
        }
    }

    pub fn register_success(&mut self) {
        self.attempts.clear();
        self.blocked_until = None;
    }
}

fn load_state(root: &Path, key: &str) -> AppResult<RateLimitState> {
    let path = paths::ratelimit_path(root, key)?;
    // First contact has no file; anything unreadable is an error so the
    // guarded path fails closed.
    Ok(store::try_read_record(&path)?.unwrap_or_default())
}

fn persist_state(root: &Path, key: &str, state: &RateLimitState) -> AppResult<()> {
    let path = paths::ratelimit_path(root, key)?;
    store::write_record_atomic(&path, state)
}

pub fn evaluate(root: &Path, policy: &RateLimitPolicy, key: &str) -> AppResult<RateDecision> {
    let now = clock::epoch_seconds();
    let mut state = load_state(root, key)?;
    state.prune(policy, now);
    persist_state(root, key, &state)?;
    Ok(state.decide(policy, now))
}

pub fn allowed(root: &Path, policy: &RateLimitPolicy, key: &str) -> AppResult<bool> {
    Ok(matches!(evaluate(root, policy, key)?, RateDecision::Allowed))
}

pub fn record_attempt(
    root: &Path,
    policy: &RateLimitPolicy,
    key: &str,
    success: bool,
) -> AppResult<()> {
    let now = clock::epoch_seconds();
    let mut state = load_state(root, key)?;
    if success {
        state.register_success();
    } else {
        state.register_failure(policy, now);
    }
    persist_state(root, key, &state)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RateLimitPolicy = RateLimitPolicy {
        window_seconds: 900,
        max_attempts: 3,
        block_seconds: 1800,
    };

    #[test]
    fn fingerprint_is_stable_and_scoped() {
        let a = fingerprint("10.0.0.1", "Mozilla/5.0", "9876543210");
        let b = fingerprint("10.0.0.1", "Mozilla/5.0", "9876543210");
        let other_device = fingerprint("10.0.0.2", "Mozilla/5.0", "9876543210");
        assert_eq!(a, b);
        assert_ne!(a, other_device);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn three_failures_block_until_deadline_passes() {
        let mut state = RateLimitState::default();
        let t0 = 1_700_000_000;
        for offset in 0..3 {
            state.register_failure(&POLICY, t0 + offset);
        }

        let until = state.blocked_until.expect("deadline set");
        assert_eq!(until, t0 + 2 + POLICY.block_seconds);
        assert!(matches!(
            state.decide(&POLICY, t0 + 10),
            RateDecision::Blocked { .. }
        ));
        assert!(matches!(
            state.decide(&POLICY, until - 1),
            RateDecision::Blocked { .. }
        ));

        // Past the deadline the stale attempts have also left the window.
        let mut later = state.clone();
        later.prune(&POLICY, until + 1);
        assert_eq!(later.decide(&POLICY, until + 1), RateDecision::Allowed);
    }

    #[test]
    fn success_wipes_the_penalty() {
        let mut state = RateLimitState::default();
        let t0 = 1_700_000_000;
        for offset in 0..3 {
            state.register_failure(&POLICY, t0 + offset);
        }
        state.register_success();

        assert!(state.attempts.is_empty());
        assert_eq!(state.blocked_until, None);
        assert_eq!(state.decide(&POLICY, t0 + 5), RateDecision::Allowed);
    }

    #[test]
    fn attempts_age_out_of_the_window() {
        let mut state = RateLimitState::default();
        let t0 = 1_700_000_000;
        state.register_failure(&POLICY, t0);
        state.register_failure(&POLICY, t0 + 1);

        state.prune(&POLICY, t0 + POLICY.window_seconds + 2);
        assert!(state.attempts.is_empty());
        assert_eq!(
            state.decide(&POLICY, t0 + POLICY.window_seconds + 2),
            RateDecision::Allowed
        );
    }

    #[test]
    fn window_full_without_deadline_reads_as_exhausted() {
        let mut state = RateLimitState {
            attempts: vec![1_700_000_000, 1_700_000_001, 1_700_000_002],
            blocked_until: None,
        };
        state.prune(&POLICY, 1_700_000_010);
        assert_eq!(
            state.decide(&POLICY, 1_700_000_010),
            RateDecision::Exhausted
        );
    }

    #[test]
    fn evaluate_persists_the_pruned_state() {
        let root = tempfile::tempdir().expect("temp root");
        let key = fingerprint("10.0.0.1", "curl/8.0", "login-probe");

        record_attempt(root.path(), &POLICY, &key, false).expect("record");
        assert!(allowed(root.path(), &POLICY, &key).expect("allowed"));

        let path = paths::ratelimit_path(root.path(), &key).expect("path");
        let state: RateLimitState = store::read_record(&path).expect("state file");
        assert_eq!(state.attempts.len(), 1);
    }

    #[test]
    fn corrupt_state_file_fails_closed() {
        let root = tempfile::tempdir().expect("temp root");
        let key = fingerprint("10.0.0.1", "curl/8.0", "login-probe");
        let path = paths::ratelimit_path(root.path(), &key).expect("path");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, b"{broken").expect("seed corrupt state");

        assert!(allowed(root.path(), &POLICY, &key).is_err());
    }

    #[test]
    fn store_level_lockout_roundtrip() {
        let root = tempfile::tempdir().expect("temp root");
        let key = fingerprint("203.0.113.9", "Mozilla/5.0", "con-9876543210");

        for _ in 0..3 {
            assert!(allowed(root.path(), &POLICY, &key).expect("allowed"));
            record_attempt(root.path(), &POLICY, &key, false).expect("record failure");
        }
        assert!(!allowed(root.path(), &POLICY, &key).expect("blocked"));

        record_attempt(root.path(), &POLICY, &key, true).expect("record success");
        assert!(allowed(root.path(), &POLICY, &key).expect("cleared"));
    }
}
