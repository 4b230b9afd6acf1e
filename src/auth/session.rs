//! Usage: Authenticated session value and the process-wide swappable session handle.

use crate::auth::scope::Scope;
use crate::shared::mutex_ext::RwLockExt;
use crate::shared::security::mask_token;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, RwLock};

pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

#[derive(Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub scopes: BTreeSet<String>,
    pub user: Option<Value>,
}

impl AuthSession {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            scopes: BTreeSet::new(),
            user: None,
        }
    }

    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scopes.contains(scope.as_str())
    }

    /// Scopes from `required` that this session was not granted.
    pub fn missing_scopes(&self, required: &[Scope]) -> Vec<Scope> {
        required
            .iter()
            .copied()
            .filter(|scope| !self.has_scope(*scope))
            .collect()
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &mask_token(&self.access_token))
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("user", &self.user.as_ref().map(|_| "<account>"))
            .finish()
    }
}

/// Cloneable handle to the active session. Writers swap whole values, readers get snapshots.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Arc<AuthSession>>>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<AuthSession>> {
        self.inner.read_or_recover().clone()
    }

    /// Returns the previous session, if any.
    pub fn replace(&self, session: impl Into<Arc<AuthSession>>) -> Option<Arc<AuthSession>> {
        self.inner.write_or_recover().replace(session.into())
    }

    pub fn clear(&self) -> Option<Arc<AuthSession>> {
        self.inner.write_or_recover().take()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read_or_recover().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str, scopes: &[&str]) -> AuthSession {
        AuthSession {
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            ..AuthSession::new(token)
        }
    }

    #[test]
    fn debug_output_masks_token() {
        let rendered = format!("{:?}", session("abcdef1234567890", &["public"]));
        assert!(!rendered.contains("abcdef1234567890"));
        assert!(rendered.contains("public"));
    }

    #[test]
    fn missing_scopes_lists_only_ungranted() {
        let s = session("t", &["public", "private"]);
        assert_eq!(
            s.missing_scopes(&[Scope::Public, Scope::Upload, Scope::Private]),
            vec![Scope::Upload]
        );
    }

    #[test]
    fn handle_swaps_whole_sessions() {
        let handle = SessionHandle::new();
        assert!(handle.current().is_none());

        handle.replace(session("first", &[]));
        let snapshot = handle.current().expect("session");

        let previous = handle.replace(session("second", &["public"])).expect("previous");
        assert_eq!(previous.access_token, "first");
        // A snapshot taken before the swap stays intact.
        assert_eq!(snapshot.access_token, "first");
        assert_eq!(handle.current().expect("session").access_token, "second");
    }

    #[test]
    fn clones_share_state_and_clear_removes() {
        let handle = SessionHandle::new();
        let other = handle.clone();
        handle.replace(session("t", &[]));
        assert!(other.is_authenticated());

        other.clear();
        assert!(!handle.is_authenticated());
    }

    #[test]
    fn authorization_header_uses_bearer() {
        assert_eq!(session("tok", &[]).authorization_header(), "Bearer tok");
    }
}
