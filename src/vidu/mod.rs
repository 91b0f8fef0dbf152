pub mod types;
pub mod upload;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::error::{ViduError, ViduResult};
use types::{
    CancelTaskRequest, CreateTaskResponse, PromptRecommendationRequest,
    PromptRecommendationResponse, TaskCreations, TaskEndpoint,
};

pub const DEFAULT_BASE_URL: &str = "https://api.vidu.cn";

pub const CANCEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable request context for the Vidu API: base address, token and a
/// pooled HTTP client. Cloning is cheap; overrides produce a new value.
#[derive(Clone)]
pub struct ViduClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl std::fmt::Debug for ViduClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViduClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ViduClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: Client::new(),
        }
    }

    pub fn from_credentials(base_url: impl Into<String>, credentials: &Credentials) -> Self {
        Self::new(base_url, credentials.api_key.clone())
    }

    /// Same credentials and connection pool, different API address.
    pub fn with_base_url(&self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: self.api_key.clone(),
            http: self.http.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    fn check_configured(&self) -> ViduResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ViduError::configuration("API key is not loaded"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ViduError::configuration("API base address is not configured"));
        }
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            ViduError::configuration(format!("invalid API base address \"{}\": {e}", self.base_url))
        })?;
        Ok(())
    }

    fn authorized(&self, method: Method, endpoint: &str) -> ViduResult<reqwest::RequestBuilder> {
        self.check_configured()?;
        let url = format!("{}{}", self.base_url, endpoint);
        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.api_key)))
    }

    /// Authenticated JSON request. Any non-success status becomes
    /// `ViduError::Api` carrying the raw body; no retries.
    pub async fn request<B, T>(&self, method: Method, endpoint: &str, body: Option<&B>) -> ViduResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.authorized(method.clone(), endpoint)?;
        if let Some(body) = body {
            req = req.json(body);
        }
        debug!(%method, endpoint, "sending Vidu API request");

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!(%method, endpoint, status = status.as_u16(), "Vidu API request failed");
            return Err(ViduError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            ViduError::InvalidResponse(format!("{method} {endpoint}: {e}: {text}"))
        })
    }

    /// POST /ent/v2/{mode} — returns the async task ID.
    pub async fn create_task<B>(&self, endpoint: TaskEndpoint, payload: &B) -> ViduResult<String>
    where
        B: Serialize + ?Sized,
    {
        let resp: CreateTaskResponse = self
            .request(Method::POST, endpoint.path(), Some(payload))
            .await?;

        match resp.task_id {
            Some(id) if !id.is_empty() => {
                info!(task_id = %id, endpoint = endpoint.path(), "task created");
                Ok(id)
            }
            _ => Err(ViduError::Submission(format!(
                "no task_id in {} response",
                endpoint.path()
            ))),
        }
    }

    /// GET /ent/v2/tasks/{id}/creations — poll task status.
    pub async fn get_creations(&self, task_id: &str) -> ViduResult<TaskCreations> {
        let endpoint = format!("/ent/v2/tasks/{task_id}/creations");
        self.request::<(), _>(Method::GET, &endpoint, None).await
    }

    /// POST /ent/v2/tasks/{id}/cancel — fire and forget. Failures are logged,
    /// never returned; the remote task may still run to completion.
    pub async fn cancel_task(&self, task_id: &str) {
        info!(task_id, "sending cancel request");
        let endpoint = format!("/ent/v2/tasks/{task_id}/cancel");
        let req = match self.authorized(Method::POST, &endpoint) {
            Ok(req) => req,
            Err(e) => {
                warn!(task_id, "cannot send cancel request: {e}");
                return;
            }
        };

        let result = req
            .timeout(CANCEL_TIMEOUT)
            .json(&CancelTaskRequest { id: task_id })
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(task_id, "cancel request accepted");
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                // Usually the task already finished or can no longer be cancelled.
                warn!(task_id, status = status.as_u16(), body = %body, "cancel request rejected");
            }
            Err(e) => {
                warn!(task_id, "cancel request failed: {e}");
            }
        }
    }

    /// POST /ent/v2/img2video-prompt-recommendation — synchronous.
    pub async fn recommend_prompts(
        &self,
        req: &PromptRecommendationRequest,
    ) -> ViduResult<PromptRecommendationResponse> {
        self.request(
            Method::POST,
            "/ent/v2/img2video-prompt-recommendation",
            Some(req),
        )
        .await
    }
}
