//! Usage: One request descriptor per authentication grant (tagged variant + pure builder).

use crate::auth::scope::Scope;
use crate::client::request::{
    Authorization, CacheFetchPolicy, Method, Request, RequestParameters, RetryPolicy,
};
use serde_json::Value;

pub(crate) const PATH_CLIENT_CREDENTIALS: &str = "oauth/authorize/client";
pub(crate) const PATH_CODE_GRANT: &str = "oauth/access_token";
pub(crate) const PATH_PASSWORD: &str = "oauth/authorize/password";
pub(crate) const PATH_USERS: &str = "users";
pub(crate) const PATH_FACEBOOK: &str = "oauth/authorize/facebook";
pub(crate) const PATH_PIN_CODE_AUTHORIZE: &str = "oauth/device/authorize";
pub(crate) const PATH_PIN_CODE: &str = "oauth/device";
pub(crate) const PATH_APP_TOKEN_EXCHANGE: &str = "oauth/appexchange";
pub(crate) const PATH_TOKENS: &str = "/tokens";

pub(crate) const KEY_GRANT_TYPE: &str = "grant_type";
pub(crate) const KEY_SCOPE: &str = "scope";
pub(crate) const KEY_CODE: &str = "code";
pub(crate) const KEY_REDIRECT_URI: &str = "redirect_uri";
pub(crate) const KEY_USERNAME: &str = "username";
pub(crate) const KEY_PASSWORD: &str = "password";
pub(crate) const KEY_DISPLAY_NAME: &str = "display_name";
pub(crate) const KEY_EMAIL: &str = "email";
pub(crate) const KEY_TOKEN: &str = "token";
pub(crate) const KEY_USER_CODE: &str = "user_code";
pub(crate) const KEY_DEVICE_CODE: &str = "device_code";
pub(crate) const KEY_ACCESS_TOKEN: &str = "access_token";

const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
const GRANT_PASSWORD: &str = "password";
const GRANT_FACEBOOK: &str = "facebook";
const GRANT_DEVICE: &str = "device_grant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGrant {
    ClientCredentials {
        scopes: Vec<Scope>,
    },
    CodeGrant {
        code: String,
        redirect_uri: String,
    },
    Password {
        email: String,
        password: String,
        scopes: Vec<Scope>,
    },
    Join {
        name: String,
        email: String,
        password: String,
        scopes: Vec<Scope>,
    },
    FacebookLogIn {
        facebook_token: String,
        scopes: Vec<Scope>,
    },
    FacebookJoin {
        facebook_token: String,
        scopes: Vec<Scope>,
    },
    PinCodeAuthorize {
        user_code: String,
        device_code: String,
    },
    PinCodeInitiate {
        scopes: Vec<Scope>,
    },
    AppTokenExchange {
        access_token: String,
    },
    DeleteToken,
}

impl AuthGrant {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClientCredentials { .. } => "client_credentials",
            Self::CodeGrant { .. } => "code_grant",
            Self::Password { .. } => "password",
            Self::Join { .. } => "join",
            Self::FacebookLogIn { .. } => "facebook_log_in",
            Self::FacebookJoin { .. } => "facebook_join",
            Self::PinCodeAuthorize { .. } => "pin_code_authorize",
            Self::PinCodeInitiate { .. } => "pin_code_initiate",
            Self::AppTokenExchange { .. } => "app_token_exchange",
            Self::DeleteToken => "delete_token",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::ClientCredentials { .. } => PATH_CLIENT_CREDENTIALS,
            Self::CodeGrant { .. } => PATH_CODE_GRANT,
            Self::Password { .. } => PATH_PASSWORD,
            Self::Join { .. } | Self::FacebookJoin { .. } => PATH_USERS,
            Self::FacebookLogIn { .. } => PATH_FACEBOOK,
            Self::PinCodeAuthorize { .. } => PATH_PIN_CODE_AUTHORIZE,
            Self::PinCodeInitiate { .. } => PATH_PIN_CODE,
            Self::AppTokenExchange { .. } => PATH_APP_TOKEN_EXCHANGE,
            Self::DeleteToken => PATH_TOKENS,
        }
    }

    pub fn parameters(&self) -> RequestParameters {
        let mut params = RequestParameters::new();
        let mut put = |key: &str, value: &str| {
            params.insert(key.to_string(), Value::String(value.to_string()));
        };

        match self {
            Self::ClientCredentials { scopes } => {
                put(KEY_GRANT_TYPE, GRANT_CLIENT_CREDENTIALS);
                put(KEY_SCOPE, &Scope::combine(scopes));
            }
            Self::CodeGrant { code, redirect_uri } => {
                put(KEY_GRANT_TYPE, GRANT_AUTHORIZATION_CODE);
                put(KEY_CODE, code);
                put(KEY_REDIRECT_URI, redirect_uri);
            }
            Self::Password {
                email,
                password,
                scopes,
            } => {
                put(KEY_GRANT_TYPE, GRANT_PASSWORD);
                put(KEY_SCOPE, &Scope::combine(scopes));
                put(KEY_USERNAME, email);
                put(KEY_PASSWORD, password);
            }
            Self::Join {
                name,
                email,
                password,
                scopes,
            } => {
                put(KEY_SCOPE, &Scope::combine(scopes));
                put(KEY_DISPLAY_NAME, name);
                put(KEY_EMAIL, email);
                put(KEY_PASSWORD, password);
            }
            Self::FacebookLogIn {
                facebook_token,
                scopes,
            } => {
                put(KEY_GRANT_TYPE, GRANT_FACEBOOK);
                put(KEY_SCOPE, &Scope::combine(scopes));
                put(KEY_TOKEN, facebook_token);
            }
            Self::FacebookJoin {
                facebook_token,
                scopes,
            } => {
                put(KEY_SCOPE, &Scope::combine(scopes));
                put(KEY_TOKEN, facebook_token);
            }
            Self::PinCodeAuthorize {
                user_code,
                device_code,
            } => {
                put(KEY_USER_CODE, user_code);
                put(KEY_DEVICE_CODE, device_code);
            }
            Self::PinCodeInitiate { scopes } => {
                put(KEY_GRANT_TYPE, GRANT_DEVICE);
                put(KEY_SCOPE, &Scope::combine(scopes));
            }
            Self::AppTokenExchange { access_token } => {
                put(KEY_ACCESS_TOKEN, access_token);
            }
            Self::DeleteToken => {}
        }

        params
    }

    /// Grants are never cached. Token delete rides on the active session and is tried three times.
    pub fn request(&self) -> Request {
        match self {
            Self::DeleteToken => Request::new(Method::Delete, self.path())
                .with_cache_fetch_policy(CacheFetchPolicy::NetworkOnly)
                .with_should_cache_response(false)
                .with_retry_policy(RetryPolicy::TRY_THREE_TIMES)
                .with_authorization(Authorization::Session),
            _ => Request::new(Method::Post, self.path())
                .with_parameters(self.parameters())
                .with_cache_fetch_policy(CacheFetchPolicy::NetworkOnly)
                .with_should_cache_response(false)
                .with_retry_policy(RetryPolicy::NoRetry)
                .with_authorization(Authorization::AppCredentials),
        }
    }
}
