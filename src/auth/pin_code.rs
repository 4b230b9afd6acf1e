//! Usage: Device authorization ("pin code") flow: initiate, then poll until authorized, expired,
//! or cancelled.
//!
//! Expiry is checked before every wait and again right before every poll, so an expired code
//! never reaches the network.

use crate::auth::authenticator::Authenticator;
use crate::auth::grants::AuthGrant;
use crate::auth::scope::Scope;
use crate::auth::session::AuthSession;
use crate::client::error_code::LocalErrorCode;
use crate::client::errors::parse_i64_lossy;
use crate::infra::settings::MIN_PIN_CODE_POLL_INTERVAL_SECONDS;
use crate::shared::error::{ApiError, ApiResult, ErrorDomain};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const SLOW_DOWN_STEP_SECONDS: u64 = 5;
const ERROR_AUTHORIZATION_PENDING: &str = "authorization_pending";
const ERROR_SLOW_DOWN: &str = "slow_down";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinCodeInfo {
    pub user_code: String,
    pub device_code: String,
    pub activate_link: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub poll_interval_seconds: u64,
}

impl PinCodeInfo {
    pub fn from_payload(payload: &Value, now_unix: i64, min_interval_seconds: u64) -> ApiResult<Self> {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| missing_field(key))
        };
        let number = |key: &str| {
            payload
                .get(key)
                .and_then(parse_i64_lossy)
                .ok_or_else(|| missing_field(key))
        };

        let user_code = text("user_code")?;
        let device_code = text("device_code")?;
        let activate_link = text("activate_link")?;
        let expires_in = number("expires_in")?;
        let interval = number("interval")?;

        Ok(Self {
            user_code,
            device_code,
            activate_link,
            expires_at: now_unix.saturating_add(expires_in.max(0)),
            poll_interval_seconds: clamp_interval(
                (interval.max(0) as u64).max(min_interval_seconds),
            ),
        })
    }

    pub fn is_expired_at(&self, now_unix: i64) -> bool {
        now_unix >= self.expires_at
    }

    pub fn seconds_remaining(&self, now_unix: i64) -> i64 {
        (self.expires_at - now_unix).max(0)
    }

    fn authorize_grant(&self) -> AuthGrant {
        AuthGrant::PinCodeAuthorize {
            user_code: self.user_code.clone(),
            device_code: self.device_code.clone(),
        }
    }
}

fn clamp_interval(seconds: u64) -> u64 {
    seconds.max(u64::from(MIN_PIN_CODE_POLL_INTERVAL_SECONDS))
}

fn missing_field(key: &str) -> ApiError {
    ApiError::local(
        LocalErrorCode::PinCodeInfo,
        format!("pin code response is missing {key}"),
    )
}

fn expired_error() -> ApiError {
    ApiError::local(LocalErrorCode::PinCodeExpired, "pin code expired before authorization")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCodeState {
    Pending,
    Authorized,
    Expired,
    Cancelled,
}

impl PinCodeState {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A pin code handed out by the server plus where its polling stands.
#[derive(Debug, Clone)]
pub struct PinCodeSession {
    info: PinCodeInfo,
    state: PinCodeState,
}

impl PinCodeSession {
    pub fn new(info: PinCodeInfo) -> Self {
        Self {
            info,
            state: PinCodeState::Pending,
        }
    }

    pub fn info(&self) -> &PinCodeInfo {
        &self.info
    }

    pub fn state(&self) -> PinCodeState {
        self.state
    }
}

#[derive(Debug, Clone)]
pub enum PinCodeOutcome {
    Authorized(Arc<AuthSession>),
    Cancelled,
}

/// Cloneable cancel switch for a polling loop. Cancelling twice is a no-op.
#[derive(Debug, Clone)]
pub struct PinCodeCancellation {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for PinCodeCancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl PinCodeCancellation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollDecision {
    /// Interpret the payload as a token response.
    Authorized,
    Pending,
    SlowDown,
    Fail,
}

/// Maps one poll result to the next step of the loop.
pub(crate) fn poll_decision(result: Result<&Value, &ApiError>) -> PollDecision {
    match result {
        Ok(payload) => match oauth_error(payload) {
            Some(ERROR_AUTHORIZATION_PENDING) => PollDecision::Pending,
            Some(ERROR_SLOW_DOWN) => PollDecision::SlowDown,
            _ => PollDecision::Authorized,
        },
        Err(err) => {
            match err.underlying().and_then(oauth_error) {
                Some(ERROR_AUTHORIZATION_PENDING) => return PollDecision::Pending,
                Some(ERROR_SLOW_DOWN) => return PollDecision::SlowDown,
                _ => {}
            }
            if err.domain() == ErrorDomain::HttpStatus && err.code() == 401 {
                PollDecision::Pending
            } else {
                PollDecision::Fail
            }
        }
    }
}

fn oauth_error(payload: &Value) -> Option<&str> {
    payload.get("error").and_then(Value::as_str).map(str::trim)
}

/// Seconds to wait before the next poll; never past expiry.
pub(crate) fn next_wait_seconds(info: &PinCodeInfo, interval_seconds: u64, now_unix: i64) -> u64 {
    let remaining = info.seconds_remaining(now_unix) as u64;
    interval_seconds.min(remaining)
}

impl Authenticator {
    /// Asks the server for a user code to show and a device code to poll with.
    pub async fn begin_pin_code(&self, scopes: Vec<Scope>) -> ApiResult<PinCodeSession> {
        let payload = self
            .exchange(AuthGrant::PinCodeInitiate { scopes }.request())
            .await?;
        let min_interval = u64::from(self.dispatcher().settings().min_pin_code_poll_interval_seconds);
        let info = PinCodeInfo::from_payload(&payload, self.now(), min_interval)?;
        tracing::info!(
            expires_at = info.expires_at,
            interval_seconds = info.poll_interval_seconds,
            "pin code issued"
        );
        Ok(PinCodeSession::new(info))
    }

    /// Polls until the user authorizes the device, the code expires (`Local/PinCodeExpired`),
    /// or `cancellation` fires. Authorization installs the new session.
    pub async fn poll_pin_code(
        &self,
        session: &mut PinCodeSession,
        cancellation: &PinCodeCancellation,
    ) -> ApiResult<PinCodeOutcome> {
        match session.state {
            PinCodeState::Pending => {}
            PinCodeState::Expired => return Err(expired_error()),
            finished => {
                return Err(ApiError::local(
                    LocalErrorCode::PinCodeInfo,
                    format!("pin code session already finished ({finished:?})"),
                ))
            }
        }

        let grant = session.info.authorize_grant();
        // Hand-built infos bypass `from_payload`, so the floor is applied again here.
        let mut interval = clamp_interval(session.info.poll_interval_seconds);
        let mut attempt: u32 = 0;

        loop {
            if cancellation.is_cancelled() {
                session.state = PinCodeState::Cancelled;
                return Ok(PinCodeOutcome::Cancelled);
            }
            if session.info.is_expired_at(self.now()) {
                session.state = PinCodeState::Expired;
                tracing::info!(attempt, "pin code expired");
                return Err(expired_error());
            }

            let wait = Duration::from_secs(next_wait_seconds(&session.info, interval, self.now()));
            tokio::select! {
                _ = cancellation.cancelled() => {
                    session.state = PinCodeState::Cancelled;
                    return Ok(PinCodeOutcome::Cancelled);
                }
                _ = tokio::time::sleep(wait) => {}
            }

            if session.info.is_expired_at(self.now()) {
                session.state = PinCodeState::Expired;
                tracing::info!(attempt, "pin code expired");
                return Err(expired_error());
            }

            attempt += 1;
            let result = tokio::select! {
                _ = cancellation.cancelled() => {
                    session.state = PinCodeState::Cancelled;
                    return Ok(PinCodeOutcome::Cancelled);
                }
                result = self.exchange(grant.request()) => result,
            };

            match poll_decision(result.as_ref()) {
                PollDecision::Authorized => {
                    let payload = result?;
                    let auth_session = self.install_session(grant.kind(), &payload).await?;
                    session.state = PinCodeState::Authorized;
                    return Ok(PinCodeOutcome::Authorized(auth_session));
                }
                PollDecision::Pending => {
                    tracing::debug!(attempt, interval_seconds = interval, "pin code authorization pending");
                }
                PollDecision::SlowDown => {
                    interval += SLOW_DOWN_STEP_SECONDS;
                    tracing::debug!(attempt, interval_seconds = interval, "pin code polling slowed down");
                }
                PollDecision::Fail => {
                    let err = result.err().unwrap_or_else(|| {
                        ApiError::local(LocalErrorCode::Undefined, "pin code poll failed")
                    });
                    tracing::warn!(attempt, code = err.code(), "pin code polling failed: {}", err);
                    return Err(err);
                }
            }
        }
    }

    /// `begin_pin_code` + `poll_pin_code`; `on_issued` receives the code to show the user.
    pub async fn pin_code_log_in(
        &self,
        scopes: Vec<Scope>,
        cancellation: &PinCodeCancellation,
        on_issued: impl FnOnce(&PinCodeInfo),
    ) -> ApiResult<PinCodeOutcome> {
        let mut session = self.begin_pin_code(scopes).await?;
        on_issued(session.info());
        self.poll_pin_code(&mut session, cancellation).await
    }
}
