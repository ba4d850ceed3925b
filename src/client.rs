use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;

use crate::error::{SpinrigError, SpinrigResult};
use crate::request::{PartCategory, PartsMap, RenderFormat, RenderInput, RenderSource};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the client obtains the rendered artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderProtocol {
    /// Create a job, then poll its status until it completes.
    #[default]
    Job,
    /// One blocking request that answers with the artifact bytes directly.
    Sync,
}

/// Connection-level settings for the rendering service. Auth token and
/// environment ride on every request as header and query parameter; they are
/// never part of a render payload.
#[derive(Clone, Debug)]
pub struct RenderApiConfig {
    pub base_url: String,
    pub environment: Option<String>,
    pub auth_token: Option<String>,
    pub protocol: RenderProtocol,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl RenderApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            environment: None,
            auth_token: None,
            protocol: RenderProtocol::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_protocol(mut self, protocol: RenderProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn validate(&self) -> SpinrigResult<()> {
        if self.base_url.is_empty() {
            return Err(SpinrigError::validation("base_url must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(SpinrigError::validation("poll_interval must be > 0"));
        }
        if self.poll_timeout < self.poll_interval {
            return Err(SpinrigError::validation(
                "poll_timeout must be >= poll_interval",
            ));
        }
        Ok(())
    }
}

/// Lifecycle states a render job reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Error,
}

/// One observation of a render job, snake_case per the service's responses.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: JobState,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub sprite_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct JobCreated {
    #[serde(default)]
    job_id: Option<String>,
}

/// A build previously saved on the service, addressed by share code.
/// Build lookups answer in camelCase, unlike the snake_case job responses.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBuild {
    #[serde(default)]
    pub share_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parts: PartsMap,
    #[serde(default)]
    pub part_details: Vec<PartDetail>,
}

/// Catalog entry for a single part.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct PartDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<PartCategory>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct PartDetailsResponse {
    #[serde(default)]
    parts: Vec<PartDetail>,
}

/// Paging counters attached to a catalog page.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub skip: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// One page of the part catalog.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct PartPage {
    #[serde(default)]
    pub data: Vec<PartDetail>,
    #[serde(default)]
    pub category: Option<PartCategory>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Maps a job observation to its outcome: `None` while the job is still
/// running, otherwise the artifact URL for the requested format or the error
/// to surface. Kept free of IO so the decision table is testable on its own.
pub fn terminal_outcome(
    status: &JobStatus,
    format: RenderFormat,
) -> Option<SpinrigResult<String>> {
    match status.status {
        JobState::Queued | JobState::Processing => None,
        JobState::Completed => {
            let url = match format {
                RenderFormat::Sprite => status.sprite_url.as_ref().or(status.url.as_ref()),
                RenderFormat::Video => status.video_url.as_ref().or(status.url.as_ref()),
            };
            Some(url.cloned().ok_or_else(|| {
                SpinrigError::job("job completed without an artifact url")
            }))
        }
        JobState::Error => Some(Err(SpinrigError::job(
            status
                .error
                .clone()
                .unwrap_or_else(|| "render job failed".to_string()),
        ))),
    }
}

/// HTTP client for the rendering service.
#[derive(Clone, Debug)]
pub struct RenderClient {
    config: RenderApiConfig,
    http: reqwest::Client,
}

impl RenderClient {
    pub fn new(config: RenderApiConfig) -> SpinrigResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &RenderApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Absolute form of an artifact URL the service handed back, which may
    /// be relative to the service root.
    pub fn resolve_asset_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            self.url(url)
        } else {
            format!("{}/{}", self.config.base_url, url)
        }
    }

    fn apply_common(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = match &self.config.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        match &self.config.environment {
            Some(env) => req.query(&[("environment", env.as_str())]),
            None => req,
        }
    }

    /// Creates a render job and returns its id without waiting for it.
    pub async fn create_job(&self, input: &RenderInput) -> SpinrigResult<String> {
        input.validate()?;
        let path = match &input.source {
            RenderSource::Parts(_) => "/render-build",
            RenderSource::ShareCode(_) => "/render-by-share-code",
        };
        let resp = self
            .apply_common(self.http.post(self.url(path)))
            .json(&input.body())
            .send()
            .await
            .context("create render job")?;
        let resp = ensure_success(resp).await?;
        let created: JobCreated = resp.json().await.context("parse job creation response")?;
        created
            .job_id
            .ok_or_else(|| SpinrigError::job("service returned no job id"))
    }

    /// Fetches the current status of a job. A 404 means the service no
    /// longer knows the job, reported as the distinct not-found error.
    pub async fn job_status(&self, job_id: &str) -> SpinrigResult<JobStatus> {
        let resp = self
            .apply_common(self.http.get(self.url(&format!("/render-build/{job_id}"))))
            .send()
            .await
            .context("poll render job")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SpinrigError::not_found(format!("render job '{job_id}'")));
        }
        let resp = ensure_success(resp).await?;
        let status: JobStatus = resp.json().await.context("parse job status")?;
        Ok(status)
    }

    /// Full job protocol: create, poll every `poll_interval` until terminal,
    /// and resolve the artifact URL. The whole wait is bounded by
    /// `poll_timeout`; hitting it surfaces a timeout error and the client
    /// simply stops listening (the service offers no cancellation).
    #[tracing::instrument(skip(self, input))]
    pub async fn render_job(&self, input: &RenderInput) -> SpinrigResult<String> {
        let job_id = self.create_job(input).await?;
        tracing::info!(job_id = %job_id, "render job created");

        let poll = async {
            loop {
                let status = self.job_status(&job_id).await?;
                if let Some(outcome) = terminal_outcome(&status, input.format) {
                    return outcome;
                }
                tracing::debug!(job_id = %job_id, state = ?status.status, "render job pending");
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.config.poll_timeout, poll).await {
            Ok(outcome) => {
                if outcome.is_ok() {
                    tracing::info!(job_id = %job_id, "render job completed");
                }
                outcome
            }
            Err(_) => Err(SpinrigError::timeout(format!(
                "render job '{job_id}' still pending after {:?}",
                self.config.poll_timeout
            ))),
        }
    }

    /// Synchronous protocol: one request that blocks until the service
    /// answers with the artifact bytes.
    #[tracing::instrument(skip(self, input))]
    pub async fn render_sync(&self, input: &RenderInput) -> SpinrigResult<Vec<u8>> {
        input.validate()?;
        let resp = self
            .apply_common(self.http.post(self.url("/render-build-experimental")))
            .timeout(self.config.poll_timeout)
            .json(&input.body())
            .send()
            .await
            .context("synchronous render")?;
        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await.context("read render bytes")?;
        Ok(bytes.to_vec())
    }

    /// Renders via the configured protocol and returns the artifact bytes.
    pub async fn render_bytes(&self, input: &RenderInput) -> SpinrigResult<Vec<u8>> {
        match self.config.protocol {
            RenderProtocol::Sync => self.render_sync(input).await,
            RenderProtocol::Job => {
                let url = self.render_job(input).await?;
                self.fetch_asset_bytes(&url).await
            }
        }
    }

    /// Plain GET of a rendered artifact. Artifact URLs carry their own
    /// access, so neither auth nor environment is attached.
    pub async fn fetch_asset_bytes(&self, url: &str) -> SpinrigResult<Vec<u8>> {
        let resp = self
            .http
            .get(self.resolve_asset_url(url))
            .send()
            .await
            .context("fetch rendered asset")?;
        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await.context("read rendered asset")?;
        Ok(bytes.to_vec())
    }

    /// Looks up a saved build by share code. 404 is the distinct not-found
    /// error so callers can tell a dead link from a service fault.
    pub async fn saved_build(&self, share_code: &str) -> SpinrigResult<SavedBuild> {
        let resp = self
            .apply_common(self.http.get(self.url(&format!("/build/{share_code}"))))
            .send()
            .await
            .context("fetch saved build")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SpinrigError::not_found(format!("build '{share_code}'")));
        }
        let resp = ensure_success(resp).await?;
        let build: SavedBuild = resp.json().await.context("parse saved build")?;
        Ok(build)
    }

    /// Detail records for a set of part ids.
    pub async fn part_details(&self, ids: &[String]) -> SpinrigResult<Vec<PartDetail>> {
        let body = serde_json::json!({ "ids": ids });
        let resp = self
            .apply_common(self.http.post(self.url("/parts")))
            .json(&body)
            .send()
            .await
            .context("fetch part details")?;
        let resp = ensure_success(resp).await?;
        let details: PartDetailsResponse = resp.json().await.context("parse part details")?;
        Ok(details.parts)
    }

    /// One page of the part catalog, optionally filtered by category.
    pub async fn available_parts(
        &self,
        category: Option<PartCategory>,
        limit: u32,
        skip: u32,
    ) -> SpinrigResult<PartPage> {
        let mut req = self
            .apply_common(self.http.get(self.url("/available-parts")))
            .query(&[("limit", limit.to_string()), ("skip", skip.to_string())]);
        if let Some(cat) = category {
            req = req.query(&[("category", cat.as_str())]);
        }
        let resp = req.send().await.context("fetch available parts")?;
        let resp = ensure_success(resp).await?;
        let page: PartPage = resp.json().await.context("parse part page")?;
        Ok(page)
    }
}

async fn ensure_success(resp: reqwest::Response) -> SpinrigResult<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SpinrigError::transport(status.as_u16(), body));
    }
    Ok(resp)
}
