pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod entities;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod index;
pub mod passwords;
pub mod paths;
pub mod ratelimit;
pub mod session;
pub mod status;
pub mod store;

pub use audit::{AuditEvent, ClientInfo};
pub use auth::{authenticate, change_password, request_password_reset, verify_csrf, LoginRequest};
pub use config::{PortalConfig, RateLimitPolicy};
pub use errors::{AppError, AppResult};
pub use session::{PortalRole, Session};
pub use status::{StatusBearing, StatusFlow, StatusHistoryEntry};

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
