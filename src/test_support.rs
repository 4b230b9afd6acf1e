//! Usage: Public test helpers (scripted transport + canned payloads) for unit and integration tests.

use crate::client::transport::{
    BoxFuture, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::infra::settings::ClientSettings;
use crate::shared::mutex_ext::MutexExt;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub const TEST_BASE_URL: &str = "https://api.vimeo.test";
pub const TEST_CLIENT_IDENTIFIER: &str = "test-client";
pub const TEST_CLIENT_SECRET: &str = "test-secret";

/// Settings pointing at a fake host with app credentials and tiny retry delays.
pub fn test_settings() -> ClientSettings {
    ClientSettings {
        base_url: TEST_BASE_URL.to_string(),
        client_identifier: TEST_CLIENT_IDENTIFIER.to_string(),
        client_secret: TEST_CLIENT_SECRET.to_string(),
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 50,
        min_pin_code_poll_interval_seconds: 1,
        ..ClientSettings::default()
    }
}

pub fn json_response(status: u16, payload: Value) -> TransportResponse {
    let body = serde_json::to_vec(&payload).unwrap_or_default();
    TransportResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Bytes::from(body),
    }
}

pub fn empty_response(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        headers: Vec::new(),
        body: Bytes::new(),
    }
}

pub fn raw_response(status: u16, body: &'static str) -> TransportResponse {
    TransportResponse {
        status,
        headers: Vec::new(),
        body: Bytes::from_static(body.as_bytes()),
    }
}

pub fn token_payload(access_token: &str, scope: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "scope": scope,
        "user": {"uri": "/users/1", "name": "Test User"}
    })
}

pub fn pin_code_payload(expires_in: i64, interval: i64) -> Value {
    json!({
        "user_code": "ABCDEF",
        "device_code": "device-code-123",
        "activate_link": "https://vimeo.test/activate",
        "expires_in": expires_in,
        "interval": interval
    })
}

pub fn server_error_payload(error_code: i64, message: &str) -> Value {
    json!({"error": message, "error_code": error_code})
}

type Scripted = Result<TransportResponse, TransportError>;

/// Replays scripted results in order and records every request it receives.
///
/// Once the script runs out every send fails with `TransportError::Other`.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<TransportRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each send waits `delay` (tokio time) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: TransportResponse) -> &Self {
        self.script.lock_or_recover().push_back(Ok(response));
        self
    }

    pub fn push_json(&self, status: u16, payload: Value) -> &Self {
        self.push_response(json_response(status, payload))
    }

    pub fn push_error(&self, error: TransportError) -> &Self {
        self.script.lock_or_recover().push_back(Err(error));
        self
    }

    pub fn sent(&self) -> Vec<TransportRequest> {
        self.sent.lock_or_recover().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock_or_recover().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock_or_recover().len()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        self.sent.lock_or_recover().push(request);
        let next = self.script.lock_or_recover().pop_front();
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            next.unwrap_or_else(|| Err(TransportError::Other("no scripted response left".to_string())))
        })
    }
}
