//! HTTP client and collaborator trait implementations.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, trace};

use autorecon_arbiter::{AgentApi, EntityApi, EntityEventSource, PlatformError, PollOutcome, TaskApi};
use autorecon_core::{
    AgentRequest, Config, Disposition, Entity, EntityEvent, Provenance, Task, TaskId, TaskRequest,
    TaskStatus,
};

use crate::error::LatticeError;
use crate::wire::{
    CreateTaskRequest, EntityEventsRequest, EntityEventsResponse, EntityOverrideRequest,
    ListenAsAgentRequest, NewStatus, Principal, UpdateStatusRequest, WireAgentRequest, WireTask,
    DISPOSITION_FIELD_PATH,
};

/// Header carrying the sandbox credential
pub const SANDBOX_AUTHORIZATION_HEADER: &str = "anduril-sandbox-authorization";

const EVENT_BATCH_SIZE: u32 = 100;

/// REST API root for an endpoint.
///
/// Bare hosts get `https://`; an explicit scheme is kept as given.
pub fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        format!("{endpoint}/api/v1")
    } else {
        format!("https://{endpoint}/api/v1")
    }
}

/// Platform REST client
pub struct LatticeClient {
    http: Client,
    base_url: String,
    session_token: Mutex<String>,
}

impl LatticeClient {
    /// Build a client from service configuration
    pub fn new(config: &Config) -> Result<Self, LatticeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            bearer("authorization", &config.environment_token)?,
        );
        if let Some(token) = &config.sandboxes_token {
            headers.insert(
                SANDBOX_AUTHORIZATION_HEADER,
                bearer(SANDBOX_AUTHORIZATION_HEADER, token)?,
            );
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.arbiter.request_timeout())
            .build()?;

        let base_url = base_url(&config.lattice_endpoint);
        info!(base_url = %base_url, sandboxed = config.sandboxes_token.is_some(), "lattice client ready");

        Ok(Self {
            http,
            base_url,
            session_token: Mutex::new(String::new()),
        })
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn session_token(&self) -> String {
        self.session_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_session_token(&self, token: String) {
        *self.session_token.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Send a long-poll request; timeouts are a normal outcome
    async fn long_poll(&self, request: RequestBuilder) -> Result<PollOutcome<Response>, PlatformError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(PollOutcome::TimedOut),
            Err(e) => return Err(PlatformError::Transport(e.to_string())),
        };
        match response.status() {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT | StatusCode::NO_CONTENT => {
                Ok(PollOutcome::TimedOut)
            }
            _ => Ok(PollOutcome::Ready(
                ensure_success(response, PlatformError::Transport).await?,
            )),
        }
    }
}

fn bearer(header: &'static str, token: &str) -> Result<HeaderValue, LatticeError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|source| LatticeError::InvalidToken { header, source })?;
    value.set_sensitive(true);
    Ok(value)
}

async fn send(request: RequestBuilder) -> Result<Response, PlatformError> {
    request
        .send()
        .await
        .map_err(|e| PlatformError::Transport(e.to_string()))
}

/// Map a non-success response to a platform error.
///
/// Auth and lookup failures have their own variants; everything else goes
/// through `failure`, which names the operation.
pub(crate) fn error_for_status(
    status: StatusCode,
    body: &str,
    failure: impl FnOnce(String) -> PlatformError,
) -> PlatformError {
    let reason = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::Unauthorized(reason),
        StatusCode::NOT_FOUND => PlatformError::NotFound(reason),
        _ => failure(reason),
    }
}

async fn ensure_success(
    response: Response,
    failure: impl FnOnce(String) -> PlatformError,
) -> Result<Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(status, &body, failure))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PlatformError> {
    response
        .json::<T>()
        .await
        .map_err(|e| PlatformError::Deserialization(e.to_string()))
}

#[async_trait]
impl EntityEventSource for LatticeClient {
    async fn connect(&self) -> Result<(), PlatformError> {
        self.set_session_token(String::new());
        debug!("entity event session reset");
        Ok(())
    }

    async fn poll_events(&self) -> Result<PollOutcome<Vec<EntityEvent>>, PlatformError> {
        let token = self.session_token();
        let request = self
            .http
            .post(self.url("/entities/events"))
            .json(&EntityEventsRequest {
                session_token: &token,
                batch_size: EVENT_BATCH_SIZE,
            });

        let response = match self.long_poll(request).await? {
            PollOutcome::Ready(response) => response,
            PollOutcome::TimedOut => return Ok(PollOutcome::TimedOut),
        };
        let body: EntityEventsResponse = decode(response).await?;
        if !body.session_token.is_empty() {
            self.set_session_token(body.session_token);
        }
        trace!(events = body.entity_events.len(), "entity events received");
        Ok(PollOutcome::Ready(body.entity_events))
    }
}

#[async_trait]
impl EntityApi for LatticeClient {
    async fn publish_entity(&self, entity: &Entity) -> Result<(), PlatformError> {
        let response = send(self.http.put(self.url("/entities")).json(entity)).await?;
        ensure_success(response, PlatformError::Transport).await?;
        trace!(entity_id = %entity.entity_id, "entity published");
        Ok(())
    }

    async fn override_disposition(
        &self,
        entity_id: &str,
        disposition: Disposition,
        provenance: &Provenance,
    ) -> Result<(), PlatformError> {
        let url = self.url(&format!(
            "/entities/{entity_id}/override/{DISPOSITION_FIELD_PATH}"
        ));
        let body = EntityOverrideRequest::disposition(entity_id, disposition, provenance);
        let response = send(self.http.put(url).json(&body)).await?;
        ensure_success(response, |reason| PlatformError::Override {
            entity_id: entity_id.to_string(),
            reason,
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskApi for LatticeClient {
    async fn create_task(&self, request: &TaskRequest) -> Result<TaskId, PlatformError> {
        let body = CreateTaskRequest::from(request);
        let response = send(self.http.post(self.url("/tasks")).json(&body)).await?;
        let response = ensure_success(response, PlatformError::TaskCreation).await?;
        let task: WireTask = decode(response).await?;
        Ok(TaskId::new(task.version.task_id))
    }

    async fn get_task(&self, task_id: &TaskId) -> Result<Task, PlatformError> {
        let response = send(self.http.get(self.url(&format!("/tasks/{task_id}")))).await?;
        let response = ensure_success(response, PlatformError::Transport).await?;
        let task: WireTask = decode(response).await?;
        Ok(task.into_task())
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
        status_version: u64,
        author_id: &str,
    ) -> Result<(), PlatformError> {
        let body = UpdateStatusRequest {
            status_version,
            new_status: NewStatus { status },
            author: Principal::entity(author_id),
        };
        let url = self.url(&format!("/tasks/{task_id}/status"));
        let response = send(self.http.put(url).json(&body)).await?;
        ensure_success(response, |reason| PlatformError::StatusUpdate {
            task_id: task_id.clone(),
            reason,
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AgentApi for LatticeClient {
    async fn listen_as_agent(
        &self,
        asset_id: &str,
    ) -> Result<PollOutcome<AgentRequest>, PlatformError> {
        let request = self
            .http
            .post(self.url("/agent/listen"))
            .json(&ListenAsAgentRequest::for_asset(asset_id));

        let response = match self.long_poll(request).await? {
            PollOutcome::Ready(response) => response,
            PollOutcome::TimedOut => return Ok(PollOutcome::TimedOut),
        };
        let body: WireAgentRequest = decode(response).await?;
        Ok(body
            .into_request()
            .map_or(PollOutcome::TimedOut, PollOutcome::Ready))
    }
}
