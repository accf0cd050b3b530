//! Process-wide authentication state.
//!
//! `AuthProvider` owns the lifecycle: it is created in the loading state,
//! restores the persisted session in `initialize`, and installs an
//! `AuthContext` handle into the extension map handed to the view root.
//! Views obtain the handle through `use_auth`, which refuses to work when no
//! provider was installed.

use axum::http::Extensions;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::db::{Role, User};
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Error)]
pub enum AuthError {
    /// The context was consumed outside of an installed provider.
    #[error("auth context used outside of an AuthProvider")]
    MissingProvider,
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
        }
    }

    pub fn resolved(user: Option<User>) -> Self {
        Self {
            is_authenticated: user.is_some(),
            user,
            is_loading: false,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

#[derive(Debug)]
struct Inner {
    store: SessionStore,
    state: watch::Sender<AuthState>,
}

/// Cheap, clonable handle to the shared auth state.
#[derive(Debug, Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Persist the session, then publish the new user.
    pub fn login(&self, user: User, token: &str) -> Result<(), AuthError> {
        self.inner.store.save(&user, token)?;
        tracing::info!(user_id = %user.id, role = %user.role, "Signed in");
        self.inner.state.send_replace(AuthState::resolved(Some(user)));
        Ok(())
    }

    /// Forget the session. The in-memory state is cleared even if the
    /// persisted keys could not be removed.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.inner.state.send_replace(AuthState::resolved(None));
        self.inner.store.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }
}

pub struct AuthProvider {
    context: AuthContext,
}

impl AuthProvider {
    pub fn new(store: SessionStore) -> Self {
        let (state, _) = watch::channel(AuthState::loading());
        Self {
            context: AuthContext {
                inner: Arc::new(Inner { store, state }),
            },
        }
    }

    /// Restore the persisted session and leave the loading state.
    pub fn initialize(&self) -> AuthState {
        let user = self.context.inner.store.load().map(|s| s.user);
        let state = AuthState::resolved(user);
        self.context.inner.state.send_replace(state.clone());
        tracing::debug!(authenticated = state.is_authenticated, "Auth state restored");
        state
    }

    pub fn context(&self) -> AuthContext {
        self.context.clone()
    }

    /// Make the context reachable from everything below the view root.
    pub fn install(&self, extensions: &mut Extensions) {
        extensions.insert(self.context());
    }
}

/// Fetch the installed auth context.
pub fn use_auth(extensions: &Extensions) -> Result<AuthContext, AuthError> {
    extensions
        .get::<AuthContext>()
        .cloned()
        .ok_or(AuthError::MissingProvider)
}
