//! Client-side authentication: shared auth state and the navigation guard.

mod context;
mod guard;
mod routes;

pub use context::{use_auth, AuthContext, AuthError, AuthProvider, AuthState};
pub use guard::{evaluate, guard, GuardDecision, LOGIN_PATH};
pub use routes::{Access, Navigation, Route, RouteTable};
