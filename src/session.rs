use crate::clock;
use crate::errors::{AppError, AppResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::DateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const CSRF_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortalRole {
    Superadmin,
    Employee,
    DepartmentUser,
    Contractor,
}

impl PortalRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Employee => "employee",
            Self::DepartmentUser => "department-user",
            Self::Contractor => "contractor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfToken {
    pub token: String,
    pub minted_at: String,
}

// An explicit value owned by the HTTP collaborator, passed in and out of
// auth operations. Holds a projection of the principal, never the hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub role: PortalRole,
    pub principal_id: String,
    pub display_name: String,
    pub permissions: Vec<String>,
    pub must_reset_password: bool,
    csrf: Option<CsrfToken>,
}

impl Session {
    pub fn issue(
        role: PortalRole,
        principal_id: &str,
        display_name: &str,
        permissions: Vec<String>,
        must_reset_password: bool,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            role,
            principal_id: principal_id.to_string(),
            display_name: display_name.to_string(),
            permissions,
            must_reset_password,
            csrf: None,
        }
    }

    pub fn regenerate_id(&mut self) {
        self.session_id = Uuid::new_v4().to_string();
    }

    // Minted lazily, rotated once older than the configured period.
    pub fn csrf_token(&mut self, rotation_days: i64) -> String {
        let now = clock::now();
        let fresh = match &self.csrf {
            Some(existing) => DateTime::parse_from_rfc3339(&existing.minted_at)
                .map(|minted| now - minted < chrono::Duration::days(rotation_days))
                .unwrap_or(false),
            None => false,
        };
        if !fresh {
            self.csrf = Some(CsrfToken {
                token: mint_token(),
                minted_at: clock::stamp(now),
            });
        }
        self.csrf.as_ref().map(|c| c.token.clone()).unwrap_or_default()
    }

    pub fn verify_csrf(&self, presented: &str) -> AppResult<()> {
        let Some(current) = &self.csrf else {
            return Err(AppError::CsrfMismatch);
        };
        if constant_time_eq(&current.token, presented) {
            Ok(())
        } else {
            Err(AppError::CsrfMismatch)
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate_csrf(&mut self, minted_at: &str) {
        if let Some(csrf) = &mut self.csrf {
            csrf.minted_at = minted_at.to_string();
        }
    }
}

fn mint_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

// Compares fixed-width digests, so timing does not leak the position of
// the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    Sha256::digest(a.as_bytes()) == Sha256::digest(b.as_bytes())
}
