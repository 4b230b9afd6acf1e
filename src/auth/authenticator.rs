//! Usage: Run grant requests through the dispatcher and swap the shared session on success.

use crate::auth::grants::AuthGrant;
use crate::auth::scope::Scope;
use crate::auth::session::{AuthSession, SessionHandle};
use crate::auth::token_exchange::session_from_payload;
use crate::client::dispatcher::Dispatcher;
use crate::client::error_code::LocalErrorCode;
use crate::client::request::Request;
use crate::client::response::NullResponse;
use crate::shared::blocking;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::security::mask_token;
use crate::shared::time::now_unix_seconds;
use serde_json::Value;
use std::sync::Arc;

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Clone)]
pub struct Authenticator {
    dispatcher: Dispatcher,
    // Serializes re-authentication so concurrent grants swap sessions one at a time.
    reauth: Arc<tokio::sync::Mutex<()>>,
    clock: Clock,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Authenticator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            reauth: Arc::new(tokio::sync::Mutex::new(())),
            clock: Arc::new(now_unix_seconds),
        }
    }

    /// Replaces the unix-seconds clock used for pin code expiry.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn session(&self) -> &SessionHandle {
        self.dispatcher.session()
    }

    pub(crate) fn now(&self) -> i64 {
        (self.clock)()
    }

    pub async fn client_credentials(&self, scopes: Vec<Scope>) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::ClientCredentials { scopes }).await
    }

    pub async fn code_grant(
        &self,
        code: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::CodeGrant {
            code: code.into(),
            redirect_uri: redirect_uri.into(),
        })
        .await
    }

    pub async fn log_in(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
        scopes: Vec<Scope>,
    ) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::Password {
            email: email.into(),
            password: password.into(),
            scopes,
        })
        .await
    }

    pub async fn join(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        scopes: Vec<Scope>,
    ) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::Join {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            scopes,
        })
        .await
    }

    pub async fn facebook_log_in(
        &self,
        facebook_token: impl Into<String>,
        scopes: Vec<Scope>,
    ) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::FacebookLogIn {
            facebook_token: facebook_token.into(),
            scopes,
        })
        .await
    }

    pub async fn facebook_join(
        &self,
        facebook_token: impl Into<String>,
        scopes: Vec<Scope>,
    ) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::FacebookJoin {
            facebook_token: facebook_token.into(),
            scopes,
        })
        .await
    }

    pub async fn app_token_exchange(
        &self,
        access_token: impl Into<String>,
    ) -> ApiResult<Arc<AuthSession>> {
        self.authenticate(AuthGrant::AppTokenExchange {
            access_token: access_token.into(),
        })
        .await
    }

    /// Runs any session-producing grant and installs the resulting session.
    pub async fn authenticate(&self, grant: AuthGrant) -> ApiResult<Arc<AuthSession>> {
        if matches!(grant, AuthGrant::DeleteToken | AuthGrant::PinCodeInitiate { .. }) {
            return Err(ApiError::local(
                LocalErrorCode::RequestMalformed,
                format!("{} does not produce a session", grant.kind()),
            ));
        }

        let _guard = self.reauth.lock().await;
        let payload = self.exchange(grant.request()).await.map_err(|err| {
            tracing::warn!(grant = grant.kind(), code = err.code(), "authentication failed: {}", err);
            err
        })?;
        self.install_session_locked(grant.kind(), &payload).await
    }

    /// Deletes the token server-side, then drops the local session and cached responses whatever
    /// the outcome.
    pub async fn log_out(&self) -> ApiResult<()> {
        let _guard = self.reauth.lock().await;
        let result = self
            .dispatcher
            .execute_final::<NullResponse>(AuthGrant::DeleteToken.request())
            .await;

        if let Some(previous) = self.session().clear() {
            tracing::info!(token = %mask_token(&previous.access_token), "session cleared");
        }
        self.clear_response_cache().await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!(code = err.code(), "token delete failed; local session cleared anyway: {}", err);
                Err(err)
            }
        }
    }

    /// Final payload of a network-only request; a stream that ends without one is `NoResponse`.
    pub(crate) async fn exchange(&self, request: Request) -> ApiResult<Value> {
        let mut stream = self.dispatcher.execute::<Value>(request);
        while let Some(item) = stream.next_response().await {
            match item {
                Ok(response) if response.is_final_response => return Ok(response.json),
                Ok(_) => {}
                Err(_) if stream.ended_without_response() => break,
                Err(err) => return Err(err),
            }
        }
        Err(ApiError::local(
            LocalErrorCode::NoResponse,
            "authentication request finished without a response",
        ))
    }

    /// Caller must hold the re-authentication lock.
    async fn install_session_locked(&self, grant: &str, payload: &Value) -> ApiResult<Arc<AuthSession>> {
        let session = Arc::new(session_from_payload(payload)?);
        let previous = self.session().replace(Arc::clone(&session));
        // Cache keys carry no account identity.
        if previous.is_some_and(|p| p.access_token != session.access_token) {
            self.clear_response_cache().await;
        }
        tracing::info!(
            grant,
            token = %mask_token(&session.access_token),
            scopes = session.scopes.len(),
            "session installed"
        );
        Ok(session)
    }

    pub(crate) async fn install_session(&self, grant: &str, payload: &Value) -> ApiResult<Arc<AuthSession>> {
        let _guard = self.reauth.lock().await;
        self.install_session_locked(grant, payload).await
    }

    async fn clear_response_cache(&self) {
        let cache = Arc::clone(self.dispatcher.cache());
        if let Err(err) = blocking::run("response_cache_clear", move || cache.clear()).await {
            tracing::warn!("response cache clear failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::{MemoryResponseCache, ResponseCache};
    use crate::client::fingerprint::Fingerprint;
    use crate::client::request::Method;
    use crate::client::transport::TransportError;
    use crate::test_support::{
        empty_response, test_settings, token_payload, MockTransport,
    };
    use serde_json::json;

    fn authenticator() -> (Authenticator, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Dispatcher::new(
            test_settings(),
            transport.clone(),
            Arc::new(MemoryResponseCache::default()),
            SessionHandle::new(),
        );
        (Authenticator::new(dispatcher), transport)
    }

    #[tokio::test]
    async fn log_in_installs_session() {
        let (auth, transport) = authenticator();
        transport.push_json(200, token_payload("tok-1", "public private"));

        let session = auth
            .log_in("a@b.com", "pw", vec![Scope::Public, Scope::Private])
            .await
            .expect("logged in");

        assert_eq!(session.access_token, "tok-1");
        assert_eq!(
            auth.session().current().expect("active").access_token,
            "tok-1"
        );

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Post);
        assert!(sent[0].url.ends_with("/oauth/authorize/password"));
        assert!(sent[0]
            .header("authorization")
            .is_some_and(|v| v.starts_with("Basic ")));
    }

    #[tokio::test]
    async fn missing_token_is_auth_token_and_keeps_previous_session() {
        let (auth, transport) = authenticator();
        auth.session().replace(AuthSession::new("old"));
        transport.push_json(200, json!({"token_type": "bearer"}));

        let err = auth
            .client_credentials(vec![Scope::Public])
            .await
            .expect_err("no token");
        assert!(err.is_local(LocalErrorCode::AuthToken));
        assert_eq!(auth.session().current().expect("kept").access_token, "old");
    }

    #[tokio::test]
    async fn grants_are_never_retried() {
        let (auth, transport) = authenticator();
        transport.push_error(TransportError::Timeout("slow".to_string()));

        let err = auth
            .facebook_log_in("fb-token", vec![Scope::Public])
            .await
            .expect_err("timeout");
        assert_eq!(err.code(), LocalErrorCode::NoResponse.code());
        assert_eq!(transport.send_count(), 1);
    }

    #[tokio::test]
    async fn non_session_grants_are_rejected() {
        let (auth, transport) = authenticator();
        let err = auth
            .authenticate(AuthGrant::DeleteToken)
            .await
            .expect_err("not a session grant");
        assert!(err.is_local(LocalErrorCode::RequestMalformed));
        assert_eq!(transport.send_count(), 0);
    }

    #[tokio::test]
    async fn log_out_clears_session_on_success() {
        let (auth, transport) = authenticator();
        auth.session().replace(AuthSession::new("tok"));
        transport.push_response(empty_response(204));

        auth.log_out().await.expect("logged out");
        assert!(!auth.session().is_authenticated());

        let sent = transport.sent();
        assert_eq!(sent[0].method, Method::Delete);
        assert!(sent[0].url.ends_with("/tokens"));
        assert_eq!(sent[0].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test(start_paused = true)]
    async fn log_out_retries_and_clears_session_on_failure() {
        let (auth, transport) = authenticator();
        auth.session().replace(AuthSession::new("tok"));

        let err = auth.log_out().await.expect_err("server unreachable");
        assert_eq!(err.code(), LocalErrorCode::NoResponse.code());
        assert_eq!(transport.send_count(), 3);
        assert!(!auth.session().is_authenticated());
    }

    #[tokio::test]
    async fn log_out_drops_cached_responses() {
        let (auth, transport) = authenticator();
        auth.session().replace(AuthSession::new("tok"));
        let key = Fingerprint::of(&Request::get("/me"));
        auth.dispatcher().cache().put(&key, json!({"name": "previous account"}));
        transport.push_response(empty_response(204));

        auth.log_out().await.expect("logged out");
        assert_eq!(auth.dispatcher().cache().get(&key), None);
    }

    #[tokio::test]
    async fn switching_accounts_drops_cached_responses() {
        let (auth, transport) = authenticator();
        auth.session().replace(AuthSession::new("first"));
        let key = Fingerprint::of(&Request::get("/me"));
        auth.dispatcher().cache().put(&key, json!({"name": "first account"}));
        transport.push_json(200, token_payload("second", "public"));

        auth.log_in("b@c.com", "pw", vec![Scope::Public])
            .await
            .expect("logged in");
        assert_eq!(auth.dispatcher().cache().get(&key), None);
    }
}
