//! Route table consulted by the guard.

use serde::Serialize;

use super::context::AuthState;
use super::guard::{guard, GuardDecision};
use crate::db::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Roles(Vec<Role>),
}

#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub access: Access,
}

impl Route {
    pub fn public(path: &str) -> Self {
        Self {
            path: path.to_string(),
            access: Access::Public,
        }
    }

    pub fn protected(path: &str, roles: &[Role]) -> Self {
        Self {
            path: path.to_string(),
            access: Access::Roles(roles.to_vec()),
        }
    }
}

/// Outcome of navigating to a path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub path: String,
    pub decision: GuardDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl Navigation {
    fn new(path: &str, decision: GuardDecision) -> Self {
        Self {
            path: path.to_string(),
            decision,
            redirect_to: decision.redirect_target().map(str::to_string),
        }
    }

    pub fn renders(&self) -> bool {
        self.decision == GuardDecision::Authorized
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let user = [Role::User];
        let admin = [Role::Admin];
        Self::new(vec![
            Route::public("/login"),
            Route::protected("/dashboard", &user),
            Route::protected("/schedule", &user),
            Route::protected("/attendance-report", &user),
            Route::protected("/profile", &user),
            Route::protected("/leave", &user),
            Route::protected("/admin/dashboard", &admin),
            Route::protected("/admin/schedule", &admin),
            Route::protected("/admin/profile", &admin),
            Route::protected("/admin/attendance", &admin),
            Route::protected("/admin/leaves", &admin),
            Route::protected("/admin/users", &admin),
            Route::protected("/admin/users/new", &admin),
        ])
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn find(&self, path: &str) -> Option<&Route> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    /// Decide what happens when `path` is requested in `state`.
    ///
    /// `/` and unknown paths send the visitor to the home of `fallback_role`
    /// (the persisted role, `user` when none), and the guard of that home
    /// then applies.
    pub fn navigate(&self, path: &str, state: &AuthState, fallback_role: Option<Role>) -> Navigation {
        let normalized = normalize(path);
        match self.find(&normalized) {
            Some(Route {
                access: Access::Public,
                ..
            }) => Navigation::new(&normalized, GuardDecision::Authorized),
            Some(Route {
                access: Access::Roles(roles),
                ..
            }) => Navigation::new(&normalized, guard(state, roles)),
            None => {
                if state.is_loading {
                    return Navigation::new(&normalized, GuardDecision::Loading);
                }
                let role = state.role().or(fallback_role).unwrap_or(Role::User);
                let home = role.home_path();
                let at_home = match self.find(home) {
                    Some(Route {
                        access: Access::Roles(roles),
                        ..
                    }) => guard(state, roles),
                    _ => GuardDecision::Authorized,
                };
                match at_home {
                    GuardDecision::Authorized => {
                        Navigation::new(&normalized, GuardDecision::RedirectToRoleHome(role))
                    }
                    other => Navigation::new(&normalized, other),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::User;
    use chrono::NaiveDate;

    fn signed_in(role: Role) -> AuthState {
        AuthState::resolved(Some(User {
            id: "1".to_string(),
            name: "Someone".to_string(),
            email: "someone@mlvisiotrack.com".to_string(),
            role,
            department: "Ops".to_string(),
            profile_picture: None,
            join_date: NaiveDate::from_ymd_opt(2022, 1, 10).unwrap(),
            registration_number: None,
            admin_level: None,
            bio: None,
        }))
    }

    #[test]
    fn test_admin_session_navigation() {
        let table = RouteTable::default();
        let state = signed_in(Role::Admin);

        let nav = table.navigate("/admin/dashboard", &state, None);
        assert!(nav.renders());

        let nav = table.navigate("/dashboard", &state, None);
        assert_eq!(nav.decision, GuardDecision::RedirectToRoleHome(Role::Admin));
        assert_eq!(nav.redirect_to.as_deref(), Some("/admin/dashboard"));
    }

    #[test]
    fn test_no_session_redirects_every_protected_route_to_login() {
        let table = RouteTable::default();
        let state = AuthState::resolved(None);
        for route in table.routes() {
            let nav = table.navigate(&route.path, &state, None);
            match route.access {
                Access::Public => assert!(nav.renders()),
                Access::Roles(_) => {
                    assert_eq!(nav.decision, GuardDecision::RedirectToLogin);
                    assert_eq!(nav.redirect_to.as_deref(), Some("/login"));
                }
            }
        }
    }

    #[test]
    fn test_loading_state_holds_everything() {
        let table = RouteTable::default();
        let state = AuthState::loading();
        assert_eq!(
            table.navigate("/admin/users", &state, None).decision,
            GuardDecision::Loading
        );
        assert_eq!(
            table.navigate("/", &state, Some(Role::Admin)).decision,
            GuardDecision::Loading
        );
    }

    #[test]
    fn test_root_and_unknown_paths_go_home() {
        let table = RouteTable::default();

        let nav = table.navigate("/", &signed_in(Role::User), None);
        assert_eq!(nav.redirect_to.as_deref(), Some("/dashboard"));

        let nav = table.navigate("/nowhere", &signed_in(Role::Admin), None);
        assert_eq!(nav.redirect_to.as_deref(), Some("/admin/dashboard"));

        // Logged out: the home would bounce to login anyway.
        let nav = table.navigate("/", &AuthState::resolved(None), Some(Role::Admin));
        assert_eq!(nav.decision, GuardDecision::RedirectToLogin);
    }

    #[test]
    fn test_paths_are_normalized() {
        let table = RouteTable::default();
        let state = signed_in(Role::User);
        assert!(table.navigate("/dashboard/", &state, None).renders());
        assert!(table.navigate("profile?tab=bio", &state, None).renders());
        assert_eq!(normalize(""), "/");
    }
}
