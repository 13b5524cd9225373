use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;
use crate::storage::{LocalStorage, StorageError, SESSION_KEY, USERS_KEY};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => AuthError::Network(msg),
            ApiError::Status { message, .. } => AuthError::Rejected(message),
            ApiError::Decode(msg) => AuthError::Rejected(msg),
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// True until the saved session has been looked for.
    pub restoring: bool,
    /// True while a sign-in/sign-up request is in flight.
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            restoring: true,
            loading: false,
        }
    }
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns the active session. Clone is cheap; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
    storage: LocalStorage,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: LocalStorage) -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            api,
            storage,
            state: Arc::new(tx),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Load the persisted session, if any. A corrupt entry is discarded.
    pub fn restore(&self) -> Option<User> {
        let user = match self.storage.get::<User>(SESSION_KEY) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "discarding unreadable saved session");
                if let Err(e) = self.storage.remove(SESSION_KEY) {
                    warn!(error = %e, "failed to remove saved session");
                }
                None
            }
        };
        if let Some(u) = &user {
            info!(email = %u.email, "restored saved session");
        }
        self.state.send_modify(|s| {
            s.user = user.clone();
            s.restoring = false;
        });
        user
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required".into()));
        }

        self.state.send_modify(|s| s.loading = true);
        let result = self.api.sign_in(email, password).await;
        self.state.send_modify(|s| s.loading = false);

        match result {
            Ok(user) => {
                info!(email = %user.email, "signed in");
                self.activate(&user);
                Ok(user)
            }
            Err(ApiError::Status { status, message }) if matches!(status, 400 | 401 | 403 | 404) => {
                info!(status, %message, "sign-in rejected");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                Err(e.into())
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        validate_sign_up(email, password, name)?;
        let email = email.trim().to_lowercase();
        let name = name.trim();

        self.state.send_modify(|s| s.loading = true);
        let result = self.api.sign_up(&email, password, name).await;
        self.state.send_modify(|s| s.loading = false);

        let user = result.map_err(|e| {
            warn!(error = %e, "sign-up failed");
            AuthError::from(e)
        })?;
        info!(email = %user.email, "account created");
        self.activate(&user);
        Ok(user)
    }

    /// Clear the session and its persisted copy.
    pub fn sign_out(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "failed to remove saved session");
        }
        self.state.send_modify(|s| s.user = None);
        info!("signed out");
    }

    /// Number of distinct users that have signed in on this machine.
    pub fn registered_user_count(&self) -> usize {
        self.cached_users().len()
    }

    fn activate(&self, user: &User) {
        if let Err(e) = self.storage.set(SESSION_KEY, user) {
            warn!(error = %e, "failed to persist session");
        }
        if let Err(e) = self.remember(user) {
            warn!(error = %e, "failed to update user cache");
        }
        self.state.send_modify(|s| s.user = Some(user.clone()));
    }

    fn cached_users(&self) -> Vec<User> {
        match self.storage.get::<Vec<User>>(USERS_KEY) {
            Ok(users) => users.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable user cache");
                Vec::new()
            }
        }
    }

    fn remember(&self, user: &User) -> Result<(), StorageError> {
        let mut users = self.cached_users();
        match users
            .iter_mut()
            .find(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.storage.set(USERS_KEY, &users)
    }
}

/// Local checks run before sign-up touches the network.
pub fn validate_sign_up(email: &str, password: &str, name: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
        return Err(AuthError::Validation("All fields are required".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::RecordKey;

    // Nothing listens on the discard port, so any request that slips
    // through fails with a network error instead of a validation error.
    fn store(dir: &std::path::Path) -> SessionStore {
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        SessionStore::new(api, LocalStorage::new(dir))
    }

    fn user(email: &str) -> User {
        User {
            id: RecordKey::Text("u1".into()),
            email: email.into(),
            name: Some("Ops".into()),
            role: None,
            token: None,
            user_metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn sign_up_validation() {
        assert_eq!(
            validate_sign_up("a@b.c", "12345", "Ann"),
            Err(AuthError::Validation("Password must be at least 6 characters long".into()))
        );
        assert_eq!(
            validate_sign_up(" ", "123456", "Ann"),
            Err(AuthError::Validation("All fields are required".into()))
        );
        assert!(validate_sign_up("a@b.c", "123456", "Ann").is_ok());
    }

    #[tokio::test]
    async fn short_password_fails_before_any_request() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let err = store.sign_up("ops@example.com", "abc", "Ops").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref m) if m.contains("at least 6")));
        assert!(!store.snapshot().loading);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        let err = store.sign_in("ops@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)));
        assert!(store.current_user().is_none());
    }

    #[test]
    fn restore_marks_completion_and_loads_saved_user() {
        let tmp = tempfile::tempdir().unwrap();
        LocalStorage::new(tmp.path()).set(SESSION_KEY, &user("ops@example.com")).unwrap();

        let store = store(tmp.path());
        assert!(store.snapshot().restoring);

        let restored = store.restore();
        assert_eq!(restored.map(|u| u.email), Some("ops@example.com".to_string()));
        let state = store.snapshot();
        assert!(!state.restoring);
        assert!(state.is_signed_in());
    }

    #[test]
    fn restore_discards_corrupt_session() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(format!("{SESSION_KEY}.json")), "garbage").unwrap();

        let store = store(tmp.path());
        assert!(store.restore().is_none());
        assert!(!store.snapshot().restoring);
        assert!(!tmp.path().join(format!("{SESSION_KEY}.json")).exists());
    }

    #[test]
    fn sign_out_clears_memory_and_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        store.activate(&user("ops@example.com"));
        assert!(store.current_user().is_some());

        store.sign_out();
        assert!(store.current_user().is_none());
        assert_eq!(LocalStorage::new(tmp.path()).get::<User>(SESSION_KEY).unwrap(), None);
        // the user cache survives sign-out
        assert_eq!(store.registered_user_count(), 1);
    }

    #[test]
    fn user_cache_deduplicates_by_email() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store(tmp.path());
        store.activate(&user("ops@example.com"));
        store.activate(&user("OPS@example.com"));
        store.activate(&user("other@example.com"));
        assert_eq!(store.registered_user_count(), 2);
    }
}
