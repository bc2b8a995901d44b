use crate::audit::{self, ClientInfo};
use crate::config::PortalConfig;
use crate::entities::{contractors, departments, staff};
use crate::errors::{AppError, AppResult};
use crate::identity::{self, DeptLoginId};
use crate::passwords;
use crate::ratelimit::{self, RateDecision};
use crate::session::{PortalRole, Session};
use serde_json::json;
use std::path::Path;

const CONTRACTOR_PERMISSIONS: &[&str] = &["bills.read", "bills.submit"];

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub role: PortalRole,
    pub identifier: String,
    pub password: String,
    pub client: ClientInfo,
}

// The limiter is consulted before any credential work: a blocked caller
// never reaches password verification, and the audit trail shows only a
// rate_limited entry for the attempt.
pub fn authenticate(root: &Path, config: &PortalConfig, request: &LoginRequest) -> AppResult<Session> {
    let identity = match request.role {
        PortalRole::Contractor => identity::normalize_mobile(&request.identifier),
        _ => identity::normalize_identifier(&request.identifier),
    };

    let parsed_dept_login = match request.role {
        PortalRole::DepartmentUser => match DeptLoginId::parse(&request.identifier) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                audit_login(root, config, &identity, &request.client, "denied", "login_failed", &error);
                return Err(error);
            }
        },
        _ => None,
    };

    let key = ratelimit::fingerprint(
        &request.client.ip,
        &request.client.user_agent,
        &format!("{}:{}", request.role.as_str(), identity),
    );

    match ratelimit::evaluate(root, &config.login_limits, &key)? {
        RateDecision::Allowed => {}
        RateDecision::Blocked { until } => {
            audit::append(
                root,
                config.lock_wait_ms,
                audit::build_event(
                    "rate_limited",
                    &identity,
                    &request.client,
                    "denied",
                    json!({"role": request.role.as_str(), "until": until}),
                ),
            );
            return Err(AppError::LockedOut { until });
        }
        RateDecision::Exhausted => {
            audit::append(
                root,
                config.lock_wait_ms,
                audit::build_event(
                    "rate_limited",
                    &identity,
                    &request.client,
                    "denied",
                    json!({"role": request.role.as_str()}),
                ),
            );
            return Err(AppError::RateLimited("login window exhausted".to_string()));
        }
    }

    let outcome = match request.role {
        PortalRole::Superadmin => login_superadmin(root, &identity, &request.password),
        PortalRole::Employee => login_employee(root, &identity, &request.password),
        PortalRole::DepartmentUser => login_department_user(
            root,
            parsed_dept_login.as_ref().expect("parsed above"),
            &request.password,
        ),
        PortalRole::Contractor => login_contractor(root, &identity, &request.password),
    };

    match outcome {
        Ok(session) => {
            ratelimit::record_attempt(root, &config.login_limits, &key, true)?;
            audit::append(
                root,
                config.lock_wait_ms,
                audit::build_event(
                    "login_success",
                    &identity,
                    &request.client,
                    "success",
                    json!({"role": request.role.as_str(), "principal": session.principal_id}),
                ),
            );
            Ok(session)
        }
        Err(error) => {
            ratelimit::record_attempt(root, &config.login_limits, &key, false)?;
            audit_login(root, config, &identity, &request.client, "denied", "login_failed", &error);
            Err(error)
        }
    }
}

fn audit_login(
    root: &Path,
    config: &PortalConfig,
    identity: &str,
    client: &ClientInfo,
    outcome: &str,
    event: &str,
    error: &AppError,
) {
    // The internal kind is kept server-side; responses carry only the
    // collapsed user_message().
    audit::append(
        root,
        config.lock_wait_ms,
        audit::build_event(event, identity, client, outcome, json!({"kind": error.to_string()})),
    );
}

fn login_superadmin(root: &Path, identity: &str, password: &str) -> AppResult<Session> {
    let record = staff::load_superadmin(root)?;
    // Both checks run unconditionally so a username miss costs the same
    // as a password miss.
    let username_ok = crate::session::constant_time_eq(identity, &record.username);
    let password_ok = passwords::verify_password(password, &record.password_hash);
    if !username_ok || !password_ok {
        return Err(AppError::BadCredentials);
    }
    Ok(Session::issue(
        PortalRole::Superadmin,
        &record.username,
        &record.display_name,
        vec!["*".to_string()],
        false,
    ))
}

fn login_employee(root: &Path, identity: &str, password: &str) -> AppResult<Session> {
    let Some(mut record) = staff::find_by_username(root, identity)? else {
        return Err(AppError::NotFound(format!("employee '{}'", identity)));
    };
    if !record.active {
        return Err(AppError::InactiveAccount);
    }
    if record.suspended {
        return Err(AppError::SuspendedAccount);
    }
    if !passwords::verify_password(password, &record.password_hash) {
        record.failed_logins += 1;
        staff::save(root, record)?;
        return Err(AppError::BadCredentials);
    }

    if record.failed_logins > 0 {
        record.failed_logins = 0;
        record = staff::save(root, record)?;
    }
    Ok(Session::issue(
        PortalRole::Employee,
        &record.id,
        &record.display_name,
        record.permissions.clone(),
        record.must_reset_password,
    ))
}

fn login_department_user(
    root: &Path,
    parsed: &DeptLoginId,
    password: &str,
) -> AppResult<Session> {
    let department = departments::load_department(root, &parsed.dept_id)?;
    let Some(role) = departments::role_of(&department, &parsed.role_id) else {
        return Err(AppError::RoleMissing(parsed.role_id.clone()));
    };
    let permissions = role.permissions.clone();

    let mut record = departments::load_user(root, &parsed.dept_id, &parsed.full)?;
    // A record copied or renamed across departments must not authenticate
    // under the borrowed path.
    if record.full_user_id != parsed.full || record.dept_id != parsed.dept_id {
        return Err(AppError::IdentifierMismatch);
    }
    if !record.active {
        return Err(AppError::InactiveAccount);
    }
    if record.suspended {
        return Err(AppError::SuspendedAccount);
    }
    if !passwords::verify_password(password, &record.password_hash) {
        record.failed_logins += 1;
        departments::save_user(root, record)?;
        return Err(AppError::BadCredentials);
    }

    if record.failed_logins > 0 {
        record.failed_logins = 0;
        record = departments::save_user(root, record)?;
    }
    Ok(Session::issue(
        PortalRole::DepartmentUser,
        &record.full_user_id,
        &record.display_name,
        permissions,
        record.must_reset_password,
    ))
}

fn login_contractor(root: &Path, mobile: &str, password: &str) -> AppResult<Session> {
    let Some(mut record) = contractors::find_by_mobile(root, mobile)? else {
        return Err(AppError::NotFound(format!("contractor mobile '{}'", mobile)));
    };
    if !record.active {
        return Err(AppError::InactiveAccount);
    }
    if record.suspended {
        return Err(AppError::SuspendedAccount);
    }
    if !passwords::verify_password(password, &record.password_hash) {
        record.failed_logins += 1;
        contractors::save(root, record)?;
        return Err(AppError::BadCredentials);
    }

    if record.failed_logins > 0 {
        record.failed_logins = 0;
        record = contractors::save(root, record)?;
    }
    Ok(Session::issue(
        PortalRole::Contractor,
        &record.id,
        &record.name,
        CONTRACTOR_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
        record.must_reset_password,
    ))
}

// Public "forgot password" entry point. The response never reveals
// whether the account exists; the flagging outcome lives only in the
// audit trail.
pub fn request_password_reset(
    root: &Path,
    config: &PortalConfig,
    role: PortalRole,
    identifier: &str,
    client: &ClientInfo,
) -> AppResult<()> {
    if role == PortalRole::Superadmin {
        return Err(AppError::InvalidArgument(
            "superadmin credentials are reset out of band".to_string(),
        ));
    }

    let identity = match role {
        PortalRole::Contractor => identity::normalize_mobile(identifier),
        _ => identity::normalize_identifier(identifier),
    };
    let key = ratelimit::fingerprint(
        &client.ip,
        &client.user_agent,
        &format!("reset:{}:{}", role.as_str(), identity),
    );

    match ratelimit::evaluate(root, &config.password_reset_limits, &key)? {
        RateDecision::Allowed => {}
        RateDecision::Blocked { until } => {
            audit::append(
                root,
                config.lock_wait_ms,
                audit::build_event(
                    "rate_limited",
                    &identity,
                    client,
                    "denied",
                    json!({"role": role.as_str(), "scope": "password_reset", "until": until}),
                ),
            );
            return Err(AppError::LockedOut { until });
        }
        RateDecision::Exhausted => {
            audit::append(
                root,
                config.lock_wait_ms,
                audit::build_event(
                    "rate_limited",
                    &identity,
                    client,
                    "denied",
                    json!({"role": role.as_str(), "scope": "password_reset"}),
                ),
            );
            return Err(AppError::RateLimited(
                "password reset window exhausted".to_string(),
            ));
        }
    }
    // Every request consumes one slot of the window.
    ratelimit::record_attempt(root, &config.password_reset_limits, &key, false)?;

    let flagged = flag_for_reset(root, role, &identity)?;
    audit::append(
        root,
        config.lock_wait_ms,
        audit::build_event(
            "password_reset_requested",
            &identity,
            client,
            "success",
            json!({"role": role.as_str(), "accountFound": flagged}),
        ),
    );
    Ok(())
}

fn flag_for_reset(root: &Path, role: PortalRole, identity: &str) -> AppResult<bool> {
    match role {
        PortalRole::Employee => {
            let Some(mut record) = staff::find_by_username(root, identity)? else {
                return Ok(false);
            };
            record.must_reset_password = true;
            staff::save(root, record)?;
            Ok(true)
        }
        PortalRole::DepartmentUser => {
            let Ok(parsed) = DeptLoginId::parse(identity) else {
                return Ok(false);
            };
            match departments::load_user(root, &parsed.dept_id, &parsed.full) {
                Ok(mut record) => {
                    record.must_reset_password = true;
                    departments::save_user(root, record)?;
                    Ok(true)
                }
                Err(AppError::NotFound(_)) => Ok(false),
                Err(error) => Err(error),
            }
        }
        PortalRole::Contractor => {
            let Some(mut record) = contractors::find_by_mobile(root, identity)? else {
                return Ok(false);
            };
            record.must_reset_password = true;
            contractors::save(root, record)?;
            Ok(true)
        }
        PortalRole::Superadmin => Ok(false),
    }
}

// State-changing requests present the session's current token; mismatches
// are audited before the request is aborted.
pub fn verify_csrf(
    root: &Path,
    config: &PortalConfig,
    session: &Session,
    presented: &str,
    client: &ClientInfo,
) -> AppResult<()> {
    match session.verify_csrf(presented) {
        Ok(()) => Ok(()),
        Err(error) => {
            audit::append(
                root,
                config.lock_wait_ms,
                audit::build_event(
                    "csrf_mismatch",
                    &session.principal_id,
                    client,
                    "denied",
                    json!({"role": session.role.as_str()}),
                ),
            );
            Err(error)
        }
    }
}

pub fn change_password(
    root: &Path,
    session: &Session,
    current: &str,
    new: &str,
) -> AppResult<()> {
    if new.len() < 8 {
        return Err(AppError::InvalidArgument(
            "new password must be at least 8 characters".to_string(),
        ));
    }

    match session.role {
        PortalRole::Superadmin => {
            let mut record = staff::load_superadmin(root)?;
            if !passwords::verify_password(current, &record.password_hash) {
                return Err(AppError::BadCredentials);
            }
            record.password_hash = passwords::hash_password(new)?;
            staff::save_superadmin(root, record)?;
        }
        PortalRole::Employee => {
            let mut record = staff::load(root, &session.principal_id)?;
            if !passwords::verify_password(current, &record.password_hash) {
                return Err(AppError::BadCredentials);
            }
            record.password_hash = passwords::hash_password(new)?;
            record.must_reset_password = false;
            staff::save(root, record)?;
        }
        PortalRole::DepartmentUser => {
            let parsed = DeptLoginId::parse(&session.principal_id)?;
            let mut record = departments::load_user(root, &parsed.dept_id, &parsed.full)?;
            if !passwords::verify_password(current, &record.password_hash) {
                return Err(AppError::BadCredentials);
            }
            record.password_hash = passwords::hash_password(new)?;
            record.must_reset_password = false;
            departments::save_user(root, record)?;
        }
        PortalRole::Contractor => {
            let mut record = contractors::load(root, &session.principal_id)?;
            if !passwords::verify_password(current, &record.password_hash) {
                return Err(AppError::BadCredentials);
            }
            record.password_hash = passwords::hash_password(new)?;
            record.must_reset_password = false;
            contractors::save(root, record)?;
        }
    }
    Ok(())
}
