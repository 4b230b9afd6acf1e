//! Usage: Unified API error model (every terminal failure surfaces as a classified `ApiError`).

use crate::client::error_code::{LocalErrorCode, ServerErrorCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// No response reached the client.
    Transport,
    /// The server answered with a generic HTTP-level rejection.
    HttpStatus,
    /// The server answered with a structured application error code.
    ServerReported,
    /// The failure happened entirely inside this client.
    Local,
}

impl ErrorDomain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::HttpStatus => "http_status",
            Self::ServerReported => "server",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the `invalid_parameters` list attached to an `InvalidRequestInput` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidParameter {
    pub field: Option<String>,
    pub error_code: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{domain}/{code}: {message}")]
pub struct ApiError {
    domain: ErrorDomain,
    code: i64,
    message: String,
    http_status: Option<u16>,
    underlying: Option<Value>,
    invalid_parameters: Vec<InvalidParameter>,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(domain: ErrorDomain, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
            http_status: None,
            underlying: None,
            invalid_parameters: Vec::new(),
            source: None,
        }
    }

    pub fn local(code: LocalErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorDomain::Local, code.code(), message)
    }

    pub(crate) fn with_http_status(mut self, status: Option<u16>) -> Self {
        self.http_status = status;
        self
    }

    pub(crate) fn with_underlying(mut self, payload: Option<Value>) -> Self {
        self.underlying = payload;
        self
    }

    pub(crate) fn with_invalid_parameters(mut self, params: Vec<InvalidParameter>) -> Self {
        self.invalid_parameters = params;
        self
    }

    pub(crate) fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn domain(&self) -> ErrorDomain {
        self.domain
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// The raw payload (or transport detail) that produced this error, for diagnostics.
    pub fn underlying(&self) -> Option<&Value> {
        self.underlying.as_ref()
    }

    pub fn invalid_parameters(&self) -> &[InvalidParameter] {
        &self.invalid_parameters
    }

    pub fn first_invalid_parameter_code(&self) -> Option<i64> {
        self.invalid_parameters.iter().find_map(|p| p.error_code)
    }

    pub fn server_error_code(&self) -> Option<ServerErrorCode> {
        if self.domain != ErrorDomain::ServerReported {
            return None;
        }
        ServerErrorCode::from_code(self.code)
    }

    pub fn local_error_code(&self) -> Option<LocalErrorCode> {
        if self.domain != ErrorDomain::Local {
            return None;
        }
        LocalErrorCode::from_code(self.code)
    }

    pub fn is_local(&self, code: LocalErrorCode) -> bool {
        self.local_error_code() == Some(code)
    }

    /// Transport failures and 503s are worth another attempt; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self.domain {
            ErrorDomain::Transport => true,
            ErrorDomain::HttpStatus => self.code == 503,
            ErrorDomain::ServerReported | ErrorDomain::Local => false,
        }
    }

    pub fn is_pin_code_expired(&self) -> bool {
        self.is_local(LocalErrorCode::PinCodeExpired)
    }
}
