//! Usage: Classify transport/HTTP/server/decode failure signals into one `ApiError` taxonomy.
//!
//! Classification never fails: anything it cannot place lands in `Local/Undefined`.

use crate::client::decoder::DecodeError;
use crate::client::error_code::{HttpStatusCode, LocalErrorCode, ServerErrorCode};
use crate::client::transport::TransportError;
use crate::shared::error::{ApiError, ErrorDomain, InvalidParameter};
use serde_json::Value;

const ERROR_CODE_KEY: &str = "error_code";
const INVALID_PARAMETERS_KEY: &str = "invalid_parameters";
const MAX_MESSAGE_CHARS: usize = 240;

pub fn classify(
    transport_error: Option<&TransportError>,
    http_status: Option<u16>,
    payload: Option<&Value>,
) -> ApiError {
    if let Some(err) = transport_error {
        return ApiError::new(
            ErrorDomain::Transport,
            LocalErrorCode::NoResponse.code(),
            err.to_string(),
        )
        .with_underlying(Some(Value::String(err.kind().to_string())))
        .with_source(err.clone());
    }

    if let Some(code) = payload.and_then(server_error_code) {
        let message = payload
            .and_then(server_error_message)
            .unwrap_or_else(|| describe_server_code(code));
        let invalid_parameters = payload.map(parse_invalid_parameters).unwrap_or_default();
        return ApiError::new(ErrorDomain::ServerReported, code, message)
            .with_http_status(http_status)
            .with_underlying(payload.cloned())
            .with_invalid_parameters(invalid_parameters);
    }

    match http_status {
        Some(status) if HttpStatusCode::from_code(status).is_some() => {
            let message = payload
                .and_then(server_error_message)
                .unwrap_or_else(|| format!("request rejected with HTTP status {status}"));
            ApiError::new(ErrorDomain::HttpStatus, i64::from(status), message)
                .with_http_status(Some(status))
                .with_underlying(payload.cloned())
        }
        Some(status) if (200..300).contains(&status) => {
            let structurally_valid = payload.is_some_and(|p| p.is_object() || p.is_array());
            let code = if structurally_valid {
                LocalErrorCode::Undefined
            } else {
                LocalErrorCode::InvalidResponseDictionary
            };
            ApiError::local(code, code.description())
                .with_http_status(Some(status))
                .with_underlying(payload.cloned())
        }
        Some(status) => {
            let message = payload
                .and_then(server_error_message)
                .unwrap_or_else(|| format!("request failed with HTTP status {status}"));
            ApiError::local(LocalErrorCode::Undefined, message)
                .with_http_status(Some(status))
                .with_underlying(payload.cloned())
        }
        None => ApiError::local(
            LocalErrorCode::Undefined,
            LocalErrorCode::Undefined.description(),
        )
        .with_underlying(payload.cloned()),
    }
}

pub fn classify_decode_error(err: &DecodeError, payload: Option<&Value>) -> ApiError {
    let code = match err {
        DecodeError::NoMappingClass(_) => LocalErrorCode::NoMappingClass,
        DecodeError::MappingFailed(_) => LocalErrorCode::MappingFailed,
    };
    ApiError::local(code, err.to_string())
        .with_underlying(payload.cloned())
        .with_source(err.clone())
}

/// Body that is neither empty nor JSON.
pub(crate) fn classify_unparseable_body(status: u16, err: serde_json::Error) -> ApiError {
    ApiError::local(
        LocalErrorCode::InvalidResponseDictionary,
        format!("response body is not valid JSON: {err}"),
    )
    .with_http_status(Some(status))
    .with_source(err)
}

fn server_error_code(payload: &Value) -> Option<i64> {
    parse_i64_lossy(payload.get(ERROR_CODE_KEY)?)
}

fn server_error_message(payload: &Value) -> Option<String> {
    ["error", "developer_message", "message"]
        .iter()
        .find_map(|key| {
            payload
                .get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(|v| v.chars().take(MAX_MESSAGE_CHARS).collect())
}

fn describe_server_code(code: i64) -> String {
    match ServerErrorCode::from_code(code) {
        Some(known) => format!("server reported {known:?}"),
        None => format!("server reported unrecognized error code {code}"),
    }
}

fn parse_invalid_parameters(payload: &Value) -> Vec<InvalidParameter> {
    let Some(items) = payload.get(INVALID_PARAMETERS_KEY).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| InvalidParameter {
            field: item
                .get("field")
                .and_then(Value::as_str)
                .map(str::to_string),
            error_code: item.get(ERROR_CODE_KEY).and_then(parse_i64_lossy),
            message: item
                .get("error")
                .or_else(|| item.get("developer_message"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

pub(crate) fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
