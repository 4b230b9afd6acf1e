//! Usage: Interpret a grant response payload into an `AuthSession`.

use crate::auth::session::{AuthSession, DEFAULT_TOKEN_TYPE};
use crate::client::error_code::LocalErrorCode;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::security::redact_sensitive_json_fields;
use serde_json::Value;

fn non_empty_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) fn session_from_payload(payload: &Value) -> ApiResult<AuthSession> {
    let Some(access_token) = non_empty_str(payload, "access_token") else {
        let mut redacted = payload.clone();
        redact_sensitive_json_fields(&mut redacted);
        return Err(ApiError::local(
            LocalErrorCode::AuthToken,
            "authentication response has no access token",
        )
        .with_underlying(Some(redacted)));
    };

    let token_type = non_empty_str(payload, "token_type")
        .unwrap_or(DEFAULT_TOKEN_TYPE)
        .to_string();
    let scopes = non_empty_str(payload, "scope")
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let user = payload.get("user").filter(|v| !v.is_null()).cloned();

    Ok(AuthSession {
        access_token: access_token.to_string(),
        token_type,
        scopes,
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::scope::Scope;
    use serde_json::json;

    #[test]
    fn parses_full_token_payload() {
        let payload = json!({
            "access_token": "tok-1",
            "token_type": "bearer",
            "scope": "public private  upload",
            "user": {"uri": "/users/1"}
        });
        let session = session_from_payload(&payload).expect("session");
        assert_eq!(session.access_token, "tok-1");
        assert!(session.has_scope(Scope::Upload));
        assert_eq!(session.scopes.len(), 3);
        assert_eq!(session.user, Some(json!({"uri": "/users/1"})));
    }

    #[test]
    fn defaults_token_type_and_tolerates_missing_extras() {
        let session = session_from_payload(&json!({"access_token": "tok", "user": null}))
            .expect("session");
        assert_eq!(session.token_type, DEFAULT_TOKEN_TYPE);
        assert!(session.scopes.is_empty());
        assert!(session.user.is_none());
    }

    #[test]
    fn missing_or_blank_token_is_auth_token_error() {
        for payload in [
            json!({"token_type": "bearer"}),
            json!({"access_token": "   "}),
            json!({"access_token": 12}),
            json!(null),
        ] {
            let err = session_from_payload(&payload).expect_err("no token");
            assert!(err.is_local(LocalErrorCode::AuthToken));
        }
    }
}
