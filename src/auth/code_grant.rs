//! Usage: Redirect-based code grant (authorize URL with anti-forgery state + redirect parsing).

use crate::auth::grants::AuthGrant;
use crate::auth::scope::Scope;
use crate::client::error_code::LocalErrorCode;
use crate::infra::settings::ClientSettings;
use crate::shared::error::{ApiError, ApiResult};
use rand::distributions::Alphanumeric;
use rand::Rng;

const AUTHORIZE_PATH: &str = "oauth/authorize";
const STATE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGrantRequest {
    authorize_url: String,
    redirect_uri: String,
    state: String,
}

impl CodeGrantRequest {
    pub fn new(settings: &ClientSettings, redirect_uri: &str, scopes: &[Scope]) -> ApiResult<Self> {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();
        Self::with_state(settings, redirect_uri, scopes, state)
    }

    fn with_state(
        settings: &ClientSettings,
        redirect_uri: &str,
        scopes: &[Scope],
        state: String,
    ) -> ApiResult<Self> {
        let redirect_uri = redirect_uri.trim();
        if redirect_uri.is_empty() {
            return Err(ApiError::local(
                LocalErrorCode::RequestMalformed,
                "redirect uri is empty",
            ));
        }

        let base = format!("{}/{}", settings.base_url.trim_end_matches('/'), AUTHORIZE_PATH);
        let mut url = reqwest::Url::parse(&base).map_err(|e| {
            ApiError::local(
                LocalErrorCode::RequestMalformed,
                format!("invalid authorize url {base:?}: {e}"),
            )
            .with_source(e)
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &settings.client_identifier)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &Scope::combine(scopes))
            .append_pair("state", &state);

        Ok(Self {
            authorize_url: url.into(),
            redirect_uri: redirect_uri.to_string(),
            state,
        })
    }

    /// Open this in a browser; the server sends the user back to the redirect URI.
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Extracts the authorization code from the redirect, rejecting a foreign `state`.
    pub fn parse_redirect(&self, redirect_url: &str) -> ApiResult<String> {
        let url = reqwest::Url::parse(redirect_url.trim()).map_err(|e| {
            ApiError::local(
                LocalErrorCode::CodeGrant,
                format!("redirect url is not a valid url: {e}"),
            )
            .with_source(e)
        })?;

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        if state.as_deref() != Some(self.state.as_str()) {
            return Err(ApiError::local(
                LocalErrorCode::CodeGrantState,
                "redirect state does not match the authorize request",
            ));
        }

        code.map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ApiError::local(LocalErrorCode::CodeGrant, "redirect carries no authorization code")
            })
    }

    /// Grant to exchange for a session once `parse_redirect` succeeded.
    pub fn grant(&self, code: String) -> AuthGrant {
        AuthGrant::CodeGrant {
            code,
            redirect_uri: self.redirect_uri.clone(),
        }
    }
}
