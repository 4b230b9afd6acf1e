//! Usage: Client-side request/response pipeline and authentication flows for the Vimeo API.
//!
//! Build a [`Dispatcher`] from [`ClientSettings`], execute [`Request`]s through it, and use an
//! [`Authenticator`] to obtain and swap the shared [`AuthSession`].

pub mod auth;
pub mod client;
pub mod infra;
mod shared;
pub mod test_support;

pub use auth::authenticator::{Authenticator, Clock};
pub use auth::code_grant::CodeGrantRequest;
pub use auth::grants::AuthGrant;
pub use auth::pin_code::{
    PinCodeCancellation, PinCodeInfo, PinCodeOutcome, PinCodeSession, PinCodeState,
};
pub use auth::scope::Scope;
pub use auth::session::{AuthSession, SessionHandle};
pub use client::cache::{FileResponseCache, MemoryResponseCache, ResponseCache};
pub use client::decoder::{DecodeError, ModelDecoder, SerdeDecoder};
pub use client::dispatcher::{Dispatcher, ResponseStream};
pub use client::error_code::{HttpStatusCode, LocalErrorCode, ServerErrorCode};
pub use client::errors::classify;
pub use client::fingerprint::Fingerprint;
pub use client::request::{
    Authorization, CacheFetchPolicy, Method, Request, RequestParameters, RetryPolicy,
};
pub use client::response::{NullResponse, Response};
pub use client::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
pub use infra::logging::{LogOptions, LoggingError};
pub use infra::settings::{ClientSettings, SettingsError};
pub use shared::error::{ApiError, ApiResult, ErrorDomain, InvalidParameter};
