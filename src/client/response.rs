//! Usage: Successful result of a dispatched request (cached or final).

use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    /// The parsed model object.
    pub model: T,
    /// The untouched server payload.
    pub json: Value,
    /// Whether this value was served from the response cache.
    pub is_cached_response: bool,
    /// Whether no further `Response` will follow for the same request.
    pub is_final_response: bool,
    /// Path of the next page of a collection, if the payload advertises one.
    ///
    /// Carried for callers; nothing in this crate builds a follow-up request from it.
    pub next_page_path: Option<String>,
}

impl<T> Response<T> {
    pub fn new(model: T, json: Value, is_cached_response: bool, is_final_response: bool) -> Self {
        let next_page_path = next_page_path(&json);
        Self {
            model,
            json,
            is_cached_response,
            is_final_response,
            next_page_path,
        }
    }
}

fn next_page_path(json: &Value) -> Option<String> {
    json.get("paging")
        .and_then(|paging| paging.get("next"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Model for endpoints whose body carries nothing of interest (e.g. token delete).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullResponse;

impl<'de> Deserialize<'de> for NullResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NullResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn next_page_path_comes_from_paging_next() {
        let payload = json!({
            "data": [],
            "paging": {"next": "/me/videos?page=2", "previous": null}
        });
        let response = Response::new((), payload, false, true);
        assert_eq!(response.next_page_path.as_deref(), Some("/me/videos?page=2"));
    }

    #[test]
    fn last_page_has_no_next_page_path() {
        let payload = json!({"data": [], "paging": {"next": null}});
        let response = Response::new((), payload, true, false);
        assert_eq!(response.next_page_path, None);
        assert!(response.is_cached_response);
        assert!(!response.is_final_response);
    }

    #[test]
    fn null_response_accepts_any_payload() {
        for payload in [json!(null), json!({}), json!([1, 2]), json!("ok")] {
            let decoded: NullResponse = serde_json::from_value(payload).expect("accepts anything");
            assert_eq!(decoded, NullResponse);
        }
    }
}
