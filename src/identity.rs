use crate::errors::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;

static DEPT_LOGIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]{2,24})\.([a-z0-9_-]{2,32})\.([a-z0-9_-]{2,32})$").expect("valid regex")
});

pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// Mobile logins arrive with spaces, dashes, or a country prefix; storage
// keys on the bare 10-digit subscriber number.
pub fn normalize_mobile(raw: &str) -> String {
    let digits: String = raw.chars().filter(|ch| ch.is_ascii_digit()).collect();
    if digits.len() == 12 && digits.starts_with("91") {
        digits[2..].to_string()
    } else if digits.len() == 11 && digits.starts_with('0') {
        digits[1..].to_string()
    } else {
        digits
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeptLoginId {
    pub full: String,
    pub user_short_id: String,
    pub role_id: String,
    pub dept_id: String,
}

impl DeptLoginId {
    // Validated before any storage access; a malformed identifier is its
    // own failure kind, distinct from a wrong password.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let normalized = normalize_identifier(raw);
        let captures = DEPT_LOGIN_PATTERN.captures(&normalized).ok_or_else(|| {
            AppError::InvalidIdentifier(format!(
                "department login must look like short.role.dept, got '{}'",
                normalized
            ))
        })?;
        Ok(Self {
            full: normalized.clone(),
            user_short_id: captures[1].to_string(),
            role_id: captures[2].to_string(),
            dept_id: captures[3].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_identifier_splits_into_parts() {
        let parsed = DeptLoginId::parse("abc.admin.dep1").expect("parse");
        assert_eq!(parsed.user_short_id, "abc");
        assert_eq!(parsed.role_id, "admin");
        assert_eq!(parsed.dept_id, "dep1");
        assert_eq!(parsed.full, "abc.admin.dep1");
    }

    #[test]
    fn upper_case_input_normalizes_identically() {
        let upper = DeptLoginId::parse("ABC.Admin.DEP1").expect("parse upper");
        let lower = DeptLoginId::parse("abc.admin.dep1").expect("parse lower");
        assert_eq!(upper, lower);
    }

    #[test]
    fn missing_segment_fails_before_storage() {
        assert!(matches!(
            DeptLoginId::parse("abc.admin"),
            Err(AppError::InvalidIdentifier(_))
        ));
        assert!(DeptLoginId::parse("a.b.c.d").is_err());
        assert!(DeptLoginId::parse("").is_err());
    }

    #[test]
    fn identifier_normalization_trims_and_lowers() {
        assert_eq!(normalize_identifier("  Clerk01  "), "clerk01");
    }

    #[test]
    fn mobile_numbers_normalize_to_ten_digits() {
        assert_eq!(normalize_mobile("+91 98765 43210"), "9876543210");
        assert_eq!(normalize_mobile("098765-43210"), "9876543210");
        assert_eq!(normalize_mobile("9876543210"), "9876543210");
    }
}
