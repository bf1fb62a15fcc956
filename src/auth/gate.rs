//! Authorization Gate
//! Mission: Allow or deny a verified principal against a required role

use crate::auth::models::Principal;

/// With no required role, any valid principal passes (authenticated but
/// unrestricted). With one, membership is an exact, case-sensitive match
/// on the role name. No hierarchy or inheritance.
pub fn authorize(principal: &Principal, required_role: Option<&str>) -> bool {
    match required_role {
        None => true,
        Some(role) => principal.roles.iter().any(|r| r == role),
    }
}
