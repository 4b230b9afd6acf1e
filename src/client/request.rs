//! Usage: Immutable request descriptor (method, path, parameters, cache and retry policy).

use crate::auth::scope::Scope;
use serde_json::Value;

pub type RequestParameters = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET and DELETE carry parameters in the query string; the rest send a JSON body.
    pub const fn encodes_parameters_in_query(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    pub(crate) fn to_http(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFetchPolicy {
    /// Never read the cache; writes still happen when the request asks for them.
    NetworkOnly,
    /// Answer from the cache only; the transport is never touched.
    CacheOnly,
    /// Deliver a cached response first (if any), then the authoritative network response.
    CacheThenNetwork,
}

impl CacheFetchPolicy {
    pub fn default_for_method(method: Method) -> Self {
        match method {
            Method::Get => Self::CacheThenNetwork,
            _ => Self::NetworkOnly,
        }
    }

    pub const fn reads_cache(self) -> bool {
        matches!(self, Self::CacheOnly | Self::CacheThenNetwork)
    }

    pub const fn uses_network(self) -> bool {
        matches!(self, Self::NetworkOnly | Self::CacheThenNetwork)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryPolicy {
    NoRetry,
    /// Number of attempts allowed beyond the first.
    FixedCount(u32),
}

impl RetryPolicy {
    /// Three attempts in total: the first send plus two retries.
    pub const TRY_THREE_TIMES: Self = Self::FixedCount(2);

    pub const fn max_retries(self) -> u32 {
        match self {
            Self::NoRetry => 0,
            Self::FixedCount(n) => n,
        }
    }
}

/// Which credential the dispatcher attaches to the outgoing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Authorization {
    /// Bearer token of the active session, if there is one.
    Session,
    /// Basic auth built from the configured client identifier and secret.
    AppCredentials,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub parameters: RequestParameters,
    pub cache_fetch_policy: CacheFetchPolicy,
    pub retry_policy: RetryPolicy,
    pub should_cache_response: bool,
    pub required_scopes: Vec<Scope>,
    /// Nested key of the payload that holds the model (e.g. `"data"` for collections).
    pub model_key_path: Option<String>,
    pub authorization: Authorization,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: RequestParameters::new(),
            cache_fetch_policy: CacheFetchPolicy::default_for_method(method),
            retry_policy: RetryPolicy::NoRetry,
            should_cache_response: method == Method::Get,
            required_scopes: Vec::new(),
            model_key_path: None,
            authorization: Authorization::Session,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_parameters(mut self, parameters: RequestParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_cache_fetch_policy(mut self, policy: CacheFetchPolicy) -> Self {
        self.cache_fetch_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_should_cache_response(mut self, should_cache: bool) -> Self {
        self.should_cache_response = should_cache;
        self
    }

    pub fn with_required_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.required_scopes = scopes;
        self
    }

    pub fn with_model_key_path(mut self, key_path: impl Into<String>) -> Self {
        self.model_key_path = Some(key_path.into());
        self
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}
