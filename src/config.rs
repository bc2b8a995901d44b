use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub window_seconds: i64,
    pub max_attempts: usize,
    pub block_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortalConfig {
    pub login_limits: RateLimitPolicy,
    pub password_reset_limits: RateLimitPolicy,
    pub suggestion_limits: RateLimitPolicy,
    pub csrf_rotation_days: i64,
    pub lock_wait_ms: u64,
    pub record_id_suffix_len: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_limits: RateLimitPolicy {
                window_seconds: 900,
                max_attempts: 5,
                block_seconds: 1800,
            },
            password_reset_limits: RateLimitPolicy {
                window_seconds: 900,
                max_attempts: 5,
                block_seconds: 1800,
            },
            suggestion_limits: RateLimitPolicy {
                window_seconds: 3600,
                max_attempts: 3,
                block_seconds: 3600,
            },
            csrf_rotation_days: 7,
            lock_wait_ms: 3000,
            record_id_suffix_len: 6,
        }
    }
}
