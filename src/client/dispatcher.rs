//! Usage: Execute a `Request` against the response cache and the transport, yielding a stream of
//! responses (cached first, final last) or one classified error.
//!
//! Every dispatch runs on its own tokio task; `execute` must be called inside a tokio runtime.

use crate::auth::session::SessionHandle;
use crate::client::cache::{MemoryResponseCache, ResponseCache};
use crate::client::decoder::{ModelDecoder, SerdeDecoder};
use crate::client::error_code::LocalErrorCode;
use crate::client::errors::{classify, classify_decode_error, classify_unparseable_body};
use crate::client::fingerprint::Fingerprint;
use crate::client::request::{Authorization, CacheFetchPolicy, Request};
use crate::client::response::Response;
use crate::client::retry::retry_backoff_delay;
use crate::client::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::infra::settings::ClientSettings;
use crate::shared::blocking;
use crate::shared::error::{ApiError, ApiResult};
use crate::shared::security::redact_sensitive_json_fields;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures_core::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

// Cached response + final response.
const RESPONSE_CHANNEL_CAPACITY: usize = 2;

struct DispatcherInner {
    settings: ClientSettings,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
    session: SessionHandle,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.inner.settings.base_url)
            .field("authenticated", &self.inner.session.is_authenticated())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        settings: ClientSettings,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn ResponseCache>,
        session: SessionHandle,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                settings,
                transport,
                cache,
                session,
            }),
        }
    }

    /// reqwest transport plus an in-memory cache sized from the settings.
    pub fn from_settings(
        settings: ClientSettings,
        session: SessionHandle,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(settings.request_timeout())?;
        let cache = MemoryResponseCache::new(settings.response_cache_max_entries as usize);
        Ok(Self::new(
            settings,
            Arc::new(transport),
            Arc::new(cache),
            session,
        ))
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.inner.cache
    }

    pub fn execute<T>(&self, request: Request) -> ResponseStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_with(request, Arc::new(SerdeDecoder::<T>::new()))
    }

    pub fn execute_with<T>(
        &self,
        request: Request,
        decoder: Arc<dyn ModelDecoder<T>>,
    ) -> ResponseStream<T>
    where
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel(RESPONSE_CHANNEL_CAPACITY);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let method = request.method.as_str();
            let path = request.path.clone();
            tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!(method, path = %path, "request cancelled by caller");
                }
                _ = drive(&inner, &request, decoder.as_ref(), &tx) => {}
            }
        });
        ResponseStream::new(rx)
    }

    /// Skips any cached response and waits for the final one.
    pub async fn execute_final<T>(&self, request: Request) -> ApiResult<Response<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute::<T>(request).into_final().await
    }
}

/// Ordered responses for one request. Yields at most one final item (a final `Response` or an
/// error), then ends.
#[derive(Debug)]
pub struct ResponseStream<T> {
    rx: mpsc::Receiver<ApiResult<Response<T>>>,
    finished: bool,
    ended_without_response: bool,
}

impl<T> Unpin for ResponseStream<T> {}

impl<T> ResponseStream<T> {
    fn new(rx: mpsc::Receiver<ApiResult<Response<T>>>) -> Self {
        Self {
            rx,
            finished: false,
            ended_without_response: false,
        }
    }

    /// Stops the worker: pending network waits and backoff sleeps are dropped and nothing is
    /// written to the cache afterwards.
    pub fn cancel(&mut self) {
        self.rx.close();
    }

    /// The worker stopped (cancelled or dropped) before sending a final item.
    pub fn ended_without_response(&self) -> bool {
        self.ended_without_response
    }

    pub async fn next_response(&mut self) -> Option<ApiResult<Response<T>>> {
        std::future::poll_fn(|cx| self.poll_item(cx)).await
    }

    pub async fn into_final(mut self) -> ApiResult<Response<T>> {
        while let Some(item) = self.next_response().await {
            let response = item?;
            if response.is_final_response {
                return Ok(response);
            }
        }
        Err(cancelled_error())
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<ApiResult<Response<T>>>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(item)) => {
                let terminal = match &item {
                    Ok(response) => response.is_final_response,
                    Err(_) => true,
                };
                if terminal {
                    self.finished = true;
                    self.rx.close();
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                self.finished = true;
                self.ended_without_response = true;
                Poll::Ready(Some(Err(cancelled_error())))
            }
        }
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = ApiResult<Response<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_item(cx)
    }
}

fn cancelled_error() -> ApiError {
    ApiError::local(
        LocalErrorCode::Undefined,
        "request cancelled before a final response",
    )
}

type Sender<T> = mpsc::Sender<ApiResult<Response<T>>>;

async fn drive<T>(
    inner: &DispatcherInner,
    request: &Request,
    decoder: &dyn ModelDecoder<T>,
    tx: &Sender<T>,
) {
    let fingerprint = Fingerprint::of(request);
    let policy = request.cache_fetch_policy;
    let key_path = request.model_key_path.as_deref();
    tracing::debug!(
        method = request.method.as_str(),
        path = %request.path,
        fingerprint = %fingerprint,
        policy = ?policy,
        "dispatching request"
    );

    if policy.reads_cache() {
        let cached = read_cache(inner, &fingerprint).await;
        match (cached, policy) {
            (Ok(Some(payload)), _) => match decoder.decode(&payload, key_path) {
                Ok(model) => {
                    let is_final = policy == CacheFetchPolicy::CacheOnly;
                    let _ = tx.send(Ok(Response::new(model, payload, true, is_final))).await;
                    if is_final {
                        return;
                    }
                }
                Err(err) if policy == CacheFetchPolicy::CacheOnly => {
                    let _ = tx.send(Err(classify_decode_error(&err, Some(&payload)))).await;
                    return;
                }
                Err(err) => {
                    tracing::warn!(
                        path = %request.path,
                        fingerprint = %fingerprint,
                        "cached payload no longer decodes; continuing to network: {}",
                        err
                    );
                }
            },
            (Ok(None), CacheFetchPolicy::CacheOnly) => {
                let _ = tx
                    .send(Err(ApiError::local(
                        LocalErrorCode::CachedResponseNotFound,
                        format!("no cached response for {}", request.path),
                    )))
                    .await;
                return;
            }
            (Ok(None), _) => {}
            (Err(err), CacheFetchPolicy::CacheOnly) => {
                let _ = tx.send(Err(err)).await;
                return;
            }
            (Err(err), _) => {
                tracing::warn!(path = %request.path, "response cache read failed: {}", err);
            }
        }
    }

    if !policy.uses_network() {
        return;
    }

    let payload = match fetch_with_retry(inner, request).await {
        Ok(payload) => payload,
        Err(err) => {
            log_failure(request, &err);
            let _ = tx.send(Err(err)).await;
            return;
        }
    };

    let model = match decoder.decode(&payload, key_path) {
        Ok(model) => model,
        Err(err) => {
            let _ = tx.send(Err(classify_decode_error(&err, Some(&payload)))).await;
            return;
        }
    };

    if request.should_cache_response && !tx.is_closed() {
        write_cache(inner, fingerprint, payload.clone()).await;
    }

    let _ = tx.send(Ok(Response::new(model, payload, false, true))).await;
}

async fn read_cache(inner: &DispatcherInner, fingerprint: &Fingerprint) -> ApiResult<Option<Value>> {
    let cache = Arc::clone(&inner.cache);
    let key = fingerprint.clone();
    blocking::run("response_cache_get", move || cache.get(&key)).await
}

async fn write_cache(inner: &DispatcherInner, fingerprint: Fingerprint, payload: Value) {
    let cache = Arc::clone(&inner.cache);
    if let Err(err) = blocking::run("response_cache_put", move || cache.put(&fingerprint, payload)).await {
        tracing::warn!("response cache write failed: {}", err);
    }
}

async fn fetch_with_retry(inner: &DispatcherInner, request: &Request) -> ApiResult<Value> {
    let transport_request = build_transport_request(&inner.settings, &inner.session, request)?;
    let max_retries = request.retry_policy.max_retries();
    let mut attempt: u32 = 0;

    loop {
        match send_once(inner.transport.as_ref(), transport_request.clone()).await {
            Ok(payload) => return Ok(payload),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let delay = retry_backoff_delay(
                    attempt,
                    inner.settings.retry_base_delay(),
                    inner.settings.retry_max_delay(),
                );
                tracing::warn!(
                    path = %request.path,
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "request failed; retrying: {}",
                    err
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn send_once(transport: &dyn Transport, request: TransportRequest) -> ApiResult<Value> {
    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => return Err(classify(Some(&err), None, None)),
    };

    if response.is_success() {
        return parse_success_body(&response);
    }

    // Error bodies that are not JSON are classified by status alone.
    let payload = serde_json::from_slice::<Value>(&response.body).ok();
    Err(classify(None, Some(response.status), payload.as_ref()))
}

fn parse_success_body(response: &TransportResponse) -> ApiResult<Value> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body)
        .map_err(|err| classify_unparseable_body(response.status, err))
}

pub(crate) fn build_transport_request(
    settings: &ClientSettings,
    session: &SessionHandle,
    request: &Request,
) -> ApiResult<TransportRequest> {
    let path = request.path.trim();
    if path.is_empty() {
        return Err(ApiError::local(
            LocalErrorCode::RequestMalformed,
            "request path is empty",
        ));
    }

    let joined = format!(
        "{}/{}",
        settings.base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = reqwest::Url::parse(&joined).map_err(|e| {
        ApiError::local(
            LocalErrorCode::RequestMalformed,
            format!("invalid request url {joined:?}: {e}"),
        )
        .with_source(e)
    })?;

    let mut body = None;
    if request.method.encodes_parameters_in_query() {
        if !request.parameters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.parameters {
                pairs.append_pair(key, &query_value(value));
            }
        }
    } else if !request.parameters.is_empty() {
        let encoded = serde_json::to_vec(&request.parameters).map_err(|e| {
            ApiError::local(
                LocalErrorCode::RequestMalformed,
                format!("failed to encode request body: {e}"),
            )
            .with_source(e)
        })?;
        body = Some(Bytes::from(encoded));
    }

    let mut headers = vec![
        ("Accept".to_string(), settings.accept_header()),
        ("User-Agent".to_string(), settings.user_agent.clone()),
    ];
    if body.is_some() {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    if let Some(value) = authorization_header(settings, session, request) {
        headers.push(("Authorization".to_string(), value));
    }

    Ok(TransportRequest {
        method: request.method,
        url: url.into(),
        headers,
        body,
    })
}

fn authorization_header(
    settings: &ClientSettings,
    session: &SessionHandle,
    request: &Request,
) -> Option<String> {
    match request.authorization {
        Authorization::Session => {
            let current = session.current();
            if !request.required_scopes.is_empty() {
                match current.as_deref() {
                    Some(active) => {
                        let missing = active.missing_scopes(&request.required_scopes);
                        if !missing.is_empty() {
                            tracing::warn!(
                                path = %request.path,
                                missing = ?missing,
                                "session lacks scopes required by request; sending anyway"
                            );
                        }
                    }
                    None => tracing::warn!(
                        path = %request.path,
                        "request requires scopes but no session is active"
                    ),
                }
            }
            current.map(|active| active.authorization_header())
        }
        Authorization::AppCredentials => {
            if !settings.has_app_credentials() {
                tracing::warn!(
                    path = %request.path,
                    "client credentials not configured; sending without authorization"
                );
                return None;
            }
            let raw = format!("{}:{}", settings.client_identifier, settings.client_secret);
            Some(format!("Basic {}", BASE64_STANDARD.encode(raw)))
        }
    }
}

/// Scalars go out as plain text; arrays and objects as JSON text.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn log_failure(request: &Request, err: &ApiError) {
    let mut payload = err.underlying().cloned().unwrap_or(Value::Null);
    redact_sensitive_json_fields(&mut payload);
    tracing::debug!(
        method = request.method.as_str(),
        path = %request.path,
        domain = %err.domain(),
        code = err.code(),
        payload = %payload,
        "request failed"
    );
}
