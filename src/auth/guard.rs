//! Navigation guard.
//!
//! A pure function of `(is_loading, is_authenticated, role, allowed_roles)`.
//! While the session is still being restored the guard makes no decision at
//! all, so nothing redirects against a half-initialized state.

use serde::Serialize;

use super::context::AuthState;
use crate::db::Role;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardDecision {
    Loading,
    Authorized,
    RedirectToLogin,
    RedirectToRoleHome(Role),
}

impl GuardDecision {
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GuardDecision::Loading | GuardDecision::Authorized => None,
            GuardDecision::RedirectToLogin => Some(LOGIN_PATH),
            GuardDecision::RedirectToRoleHome(role) => Some(role.home_path()),
        }
    }
}

pub fn evaluate(
    is_loading: bool,
    is_authenticated: bool,
    role: Option<Role>,
    allowed_roles: &[Role],
) -> GuardDecision {
    if is_loading {
        return GuardDecision::Loading;
    }
    let role = match (is_authenticated, role) {
        (true, Some(role)) => role,
        _ => return GuardDecision::RedirectToLogin,
    };
    if !allowed_roles.contains(&role) {
        return GuardDecision::RedirectToRoleHome(role);
    }
    GuardDecision::Authorized
}

pub fn guard(state: &AuthState, allowed_roles: &[Role]) -> GuardDecision {
    evaluate(
        state.is_loading,
        state.is_authenticated,
        state.role(),
        allowed_roles,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Option<Role>; 3] = [None, Some(Role::User), Some(Role::Admin)];

    fn allowed_sets() -> Vec<Vec<Role>> {
        vec![
            vec![],
            vec![Role::User],
            vec![Role::Admin],
            vec![Role::User, Role::Admin],
        ]
    }

    #[test]
    fn test_loading_never_redirects() {
        for authenticated in [false, true] {
            for role in ROLES {
                for allowed in allowed_sets() {
                    assert_eq!(
                        evaluate(true, authenticated, role, &allowed),
                        GuardDecision::Loading
                    );
                }
            }
        }
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        for role in ROLES {
            for allowed in allowed_sets() {
                let decision = evaluate(false, false, role, &allowed);
                assert_eq!(decision, GuardDecision::RedirectToLogin);
                assert_eq!(decision.redirect_target(), Some("/login"));
            }
        }
    }

    #[test]
    fn test_full_table() {
        for role in [Role::User, Role::Admin] {
            for allowed in allowed_sets() {
                let decision = evaluate(false, true, Some(role), &allowed);
                let expected = if allowed.contains(&role) {
                    GuardDecision::Authorized
                } else {
                    GuardDecision::RedirectToRoleHome(role)
                };
                assert_eq!(decision, expected, "role={:?} allowed={:?}", role, allowed);
                // Pure: same inputs, same answer.
                assert_eq!(decision, evaluate(false, true, Some(role), &allowed));
            }
        }
    }

    #[test]
    fn test_role_home_targets() {
        assert_eq!(
            evaluate(false, true, Some(Role::Admin), &[Role::User]).redirect_target(),
            Some("/admin/dashboard")
        );
        assert_eq!(
            evaluate(false, true, Some(Role::User), &[Role::Admin]).redirect_target(),
            Some("/dashboard")
        );
        assert_eq!(
            evaluate(false, true, Some(Role::User), &[Role::User]).redirect_target(),
            None
        );
    }

    #[test]
    fn test_authenticated_without_role_goes_to_login() {
        assert_eq!(
            evaluate(false, true, None, &[Role::User]),
            GuardDecision::RedirectToLogin
        );
    }

    #[test]
    fn test_decision_wire_names() {
        assert_eq!(
            serde_json::to_value(GuardDecision::Authorized).unwrap(),
            "AUTHORIZED"
        );
        assert_eq!(
            serde_json::to_value(GuardDecision::RedirectToRoleHome(Role::Admin)).unwrap(),
            serde_json::json!({"REDIRECT_TO_ROLE_HOME": "admin"})
        );
    }
}
