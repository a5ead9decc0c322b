use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;

use atrium_core::{new_request_id, CooperativeCancellationToken};
use atrium_stream::{drive, DriveOutcome, StreamEvent};

use crate::auth::TokenProvider;
use crate::chat::{ChatRequest, ChatResponse};
use crate::error::GatewayError;
use crate::retry::{
    is_retryable_http_error, parse_retry_after_ms, retry_delay_ms, should_retry_status,
};
use crate::routing::{RouteConfig, TransportMode, DEFAULT_PROXY_PREFIX, DEFAULT_UPSTREAM_PREFIX};
use crate::runs::{RunStatusResponse, RunSubmitRequest};
use crate::threads::{
    BranchMessageRequest, CreateThreadRequest, EditMessageRequest, MessageMutationResponse,
    PatchThreadRequest, RegenerateMessageRequest, ThreadMessagesResponse, ThreadSearchRequest,
    ThreadSummary, ThreadsResponse,
};

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: usize = 2;

const REQUEST_ID_HEADER: &str = "x-atrium-request-id";

/// Public struct `GatewayConfig` used across Atrium components.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub mode: TransportMode,
    pub base_url: String,
    pub proxy_prefix: String,
    pub upstream_prefix: String,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_jitter: bool,
}

impl GatewayConfig {
    /// Configuration for a directly reachable backend.
    pub fn direct(base_url: impl Into<String>) -> Self {
        Self {
            mode: TransportMode::Direct,
            base_url: base_url.into(),
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            upstream_prefix: DEFAULT_UPSTREAM_PREFIX.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_jitter: true,
        }
    }

    /// Configuration for a same-origin reverse-proxy deployment.
    pub fn proxied(base_url: impl Into<String>) -> Self {
        Self {
            mode: TransportMode::Proxied,
            ..Self::direct(base_url)
        }
    }

    fn route_config(&self) -> RouteConfig {
        RouteConfig {
            mode: self.mode,
            base_url: self.base_url.clone(),
            proxy_prefix: self.proxy_prefix.clone(),
            upstream_prefix: self.upstream_prefix.clone(),
        }
    }
}

/// Façade over the orchestration backend: chat, streaming chat, thread
/// resources, and action run submit/poll, with typed error translation.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    routes: RouteConfig,
    config: GatewayConfig,
    token_provider: Arc<dyn TokenProvider>,
}

impl GatewayClient {
    pub fn new(
        config: GatewayConfig,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|error| GatewayError::Configuration(error.to_string()))?;

        Ok(Self {
            http,
            routes: config.route_config(),
            config,
            token_provider,
        })
    }

    pub fn chat_path() -> &'static str {
        "/v1/chat"
    }

    pub fn chat_stream_path() -> &'static str {
        "/v1/chat/stream"
    }

    pub fn threads_path(tenant_id: &str) -> String {
        format!("/v1/threads?tenantId={}", tenant_id.trim())
    }

    pub fn threads_search_path() -> &'static str {
        "/v1/threads/search"
    }

    pub fn create_thread_path() -> &'static str {
        "/v1/threads"
    }

    pub fn thread_path(thread_id: &str) -> String {
        format!("/v1/threads/{}", thread_id.trim())
    }

    pub fn thread_messages_path(thread_id: &str, tenant_id: &str) -> String {
        format!(
            "/v1/threads/{}/messages?tenantId={}",
            thread_id.trim(),
            tenant_id.trim()
        )
    }

    pub fn message_branch_path(message_id: &str) -> String {
        format!("/v1/messages/{}/branch", message_id.trim())
    }

    pub fn message_edit_path(message_id: &str) -> String {
        format!("/v1/messages/{}/edit", message_id.trim())
    }

    pub fn message_regenerate_path(message_id: &str) -> String {
        format!("/v1/messages/{}/regenerate", message_id.trim())
    }

    pub fn actions_run_path() -> &'static str {
        "/v1/actions/run"
    }

    pub fn action_run_path(run_id: &str, tenant_id: &str) -> String {
        format!(
            "/v1/actions/runs/{}?tenantId={}",
            run_id.trim(),
            tenant_id.trim()
        )
    }

    /// Synchronous chat: posts the request and returns the parsed response
    /// or a typed error.
    pub async fn chat(
        &self,
        request: &ChatRequest,
        cancel: Option<&CooperativeCancellationToken>,
    ) -> Result<ChatResponse, GatewayError> {
        self.send_json(
            Method::POST,
            Self::chat_path(),
            request,
            self.config.max_retries,
            cancel,
        )
        .await
    }

    /// Streaming chat: posts the request and drives the event-stream
    /// decoder against the response body.
    ///
    /// A non-2xx initial response is drained, logged, and rejected before
    /// any decoder work; so is a connectivity failure. After stream start,
    /// wire-level `error` records reach `on_event` as `StreamEvent::Error`
    /// and a set cancellation token resolves `DriveOutcome::Aborted`
    /// exactly once, with no terminal event.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        cancel: &CooperativeCancellationToken,
        on_event: impl FnMut(StreamEvent),
    ) -> Result<DriveOutcome, GatewayError> {
        let url = self.routes.route(Self::chat_stream_path());
        let mut builder = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .header(REQUEST_ID_HEADER, new_request_id())
            .json(request);
        if let Some(token) = self.token_provider.bearer_token().await {
            builder = builder.bearer_auth(token);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(DriveOutcome::Aborted),
            response = builder.send() => response.map_err(|error| GatewayError::Connectivity {
                message: error.to_string(),
            })?,
        };

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            log_stream_rejection(status, &body);
            return Err(GatewayError::from_error_body(status, &body));
        }

        drive(response.bytes_stream(), cancel, on_event)
            .await
            .map_err(|error| GatewayError::Connectivity {
                message: error.to_string(),
            })
    }

    pub async fn list_threads(&self, tenant_id: &str) -> Result<Vec<ThreadSummary>, GatewayError> {
        let response: ThreadsResponse = self
            .get_json(&Self::threads_path(tenant_id), self.config.max_retries)
            .await?;
        Ok(response.threads)
    }

    pub async fn search_threads(
        &self,
        request: &ThreadSearchRequest,
    ) -> Result<Vec<ThreadSummary>, GatewayError> {
        let response: ThreadsResponse = self
            .send_json(
                Method::POST,
                Self::threads_search_path(),
                request,
                self.config.max_retries,
                None,
            )
            .await?;
        Ok(response.threads)
    }

    pub async fn create_thread(
        &self,
        request: &CreateThreadRequest,
    ) -> Result<ThreadSummary, GatewayError> {
        self.send_json(
            Method::POST,
            Self::create_thread_path(),
            request,
            self.config.max_retries,
            None,
        )
        .await
    }

    pub async fn patch_thread(
        &self,
        thread_id: &str,
        request: &PatchThreadRequest,
    ) -> Result<ThreadSummary, GatewayError> {
        self.send_json(
            Method::PATCH,
            &Self::thread_path(thread_id),
            request,
            self.config.max_retries,
            None,
        )
        .await
    }

    pub async fn thread_messages(
        &self,
        thread_id: &str,
        tenant_id: &str,
    ) -> Result<ThreadMessagesResponse, GatewayError> {
        self.get_json(
            &Self::thread_messages_path(thread_id, tenant_id),
            self.config.max_retries,
        )
        .await
    }

    pub async fn branch_message(
        &self,
        message_id: &str,
        request: &BranchMessageRequest,
    ) -> Result<MessageMutationResponse, GatewayError> {
        self.send_json(
            Method::POST,
            &Self::message_branch_path(message_id),
            request,
            self.config.max_retries,
            None,
        )
        .await
    }

    pub async fn edit_message(
        &self,
        message_id: &str,
        request: &EditMessageRequest,
    ) -> Result<MessageMutationResponse, GatewayError> {
        self.send_json(
            Method::POST,
            &Self::message_edit_path(message_id),
            request,
            self.config.max_retries,
            None,
        )
        .await
    }

    pub async fn regenerate_message(
        &self,
        message_id: &str,
        request: &RegenerateMessageRequest,
    ) -> Result<MessageMutationResponse, GatewayError> {
        self.send_json(
            Method::POST,
            &Self::message_regenerate_path(message_id),
            request,
            self.config.max_retries,
            None,
        )
        .await
    }

    /// Submits one action run. Not retried: resubmission would start a
    /// second run.
    pub async fn submit_run(
        &self,
        request: &RunSubmitRequest,
        cancel: Option<&CooperativeCancellationToken>,
    ) -> Result<RunStatusResponse, GatewayError> {
        self.send_json(Method::POST, Self::actions_run_path(), request, 0, cancel)
            .await
    }

    /// Polls one run by id. Not retried either: the runner's bounded poll
    /// loop is the retry policy here.
    pub async fn poll_run(
        &self,
        run_id: &str,
        tenant_id: &str,
    ) -> Result<RunStatusResponse, GatewayError> {
        self.get_json(&Self::action_run_path(run_id, tenant_id), 0)
            .await
    }

    async fn get_json<Res>(&self, path: &str, retries: usize) -> Result<Res, GatewayError>
    where
        Res: DeserializeOwned,
    {
        self.execute(Method::GET, path, None, retries, None).await
    }

    async fn send_json<Req, Res>(
        &self,
        method: Method,
        path: &str,
        payload: &Req,
        retries: usize,
        cancel: Option<&CooperativeCancellationToken>,
    ) -> Result<Res, GatewayError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let body = serde_json::to_value(payload)?;
        self.execute(method, path, Some(&body), retries, cancel)
            .await
    }

    async fn execute<Res>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        retries: usize,
        cancel: Option<&CooperativeCancellationToken>,
    ) -> Result<Res, GatewayError>
    where
        Res: DeserializeOwned,
    {
        let url = self.routes.route(path);

        for attempt in 0..=retries {
            if let Some(cancel) = cancel {
                if cancel.is_cancelled() {
                    return Err(GatewayError::Cancelled);
                }
            }

            let mut builder = self
                .http
                .request(method.clone(), &url)
                .header(ACCEPT, "application/json")
                .header(REQUEST_ID_HEADER, new_request_id());
            if let Some(token) = self.token_provider.bearer_token().await {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = match cancel {
                Some(cancel) => tokio::select! {
                    _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                    response = builder.send() => response,
                },
                None => builder.send().await,
            };

            match response {
                Ok(response) => {
                    let status = response.status();
                    let retry_after_ms = parse_retry_after_ms(response.headers());
                    let raw = response.text().await.map_err(|error| {
                        GatewayError::InvalidResponse(format!("failed to read body: {error}"))
                    })?;

                    if status.is_success() {
                        return serde_json::from_str(&raw).map_err(GatewayError::from);
                    }

                    if attempt < retries && should_retry_status(status.as_u16()) {
                        let delay =
                            retry_delay_ms(attempt, self.config.retry_jitter, retry_after_ms);
                        sleep(Duration::from_millis(delay)).await;
                        continue;
                    }

                    return Err(GatewayError::from_error_body(status.as_u16(), &raw));
                }
                Err(error) => {
                    if attempt < retries && is_retryable_http_error(&error) {
                        let delay = retry_delay_ms(attempt, self.config.retry_jitter, None);
                        sleep(Duration::from_millis(delay)).await;
                        continue;
                    }
                    return Err(GatewayError::Connectivity {
                        message: error.to_string(),
                    });
                }
            }
        }

        Err(GatewayError::InvalidResponse(
            "request retry loop terminated unexpectedly".to_string(),
        ))
    }
}

/// Expected-degraded statuses (auth churn, throttling, restarts) log at
/// warn; anything else on the stream path is a hard error.
fn log_stream_rejection(status: u16, body: &str) {
    if matches!(status, 401 | 403 | 408 | 425 | 429 | 502 | 503 | 504) {
        tracing::warn!(status, body, "chat stream rejected");
    } else {
        tracing::error!(status, body, "chat stream rejected");
    }
}
