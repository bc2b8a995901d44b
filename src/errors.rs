use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("CORRUPT_RECORD: {0}")]
    Corrupt(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("LOCK_BUSY: {0}")]
    LockBusy(String),
    #[error("INVALID_TRANSITION: {0}")]
    InvalidTransition(String),
    #[error("RATE_LIMITED: {0}")]
    RateLimited(String),
    #[error("LOCKED_OUT: blocked until {until}")]
    LockedOut { until: i64 },
    #[error("INVALID_IDENTIFIER: {0}")]
    InvalidIdentifier(String),
    #[error("BAD_CREDENTIALS")]
    BadCredentials,
    #[error("INACTIVE_ACCOUNT")]
    InactiveAccount,
    #[error("SUSPENDED_ACCOUNT")]
    SuspendedAccount,
    #[error("ROLE_MISSING: {0}")]
    RoleMissing(String),
    #[error("IDENTIFIER_MISMATCH")]
    IdentifierMismatch,
    #[error("CSRF_MISMATCH")]
    CsrfMismatch,
    #[error("INVALID_ARGUMENT: {0}")]
    InvalidArgument(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    // One string for every credential-path failure so responses cannot be
    // used to enumerate accounts.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadCredentials
            | Self::NotFound(_)
            | Self::InactiveAccount
            | Self::SuspendedAccount
            | Self::RoleMissing(_)
            | Self::IdentifierMismatch
            | Self::InvalidIdentifier(_) => "Invalid credentials.",
            Self::RateLimited(_) | Self::LockedOut { .. } => {
                "Too many attempts. Please try again later."
            }
            Self::CsrfMismatch => "Your session has expired. Please reload and try again.",
            _ => "Something went wrong. Please try again.",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn auth_failures_collapse_to_one_message() {
        let variants = [
            AppError::BadCredentials,
            AppError::NotFound("contractor CON-A1B2C3".to_string()),
            AppError::InactiveAccount,
            AppError::SuspendedAccount,
            AppError::RoleMissing("clerk".to_string()),
            AppError::IdentifierMismatch,
            AppError::InvalidIdentifier("missing segment".to_string()),
        ];
        for variant in variants {
            assert_eq!(variant.user_message(), "Invalid credentials.");
        }
    }

    #[test]
    fn internal_detail_stays_out_of_user_message() {
        let error = AppError::Io("permission denied: /var/portal/contractors".to_string());
        assert!(!error.user_message().contains("/var/portal"));
    }
}
