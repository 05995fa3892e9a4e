//! Story data access: loader/recorder seams and the HTTP client behind them.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use shared::{
    domain::{FrameId, Story, StoryId},
    error::ApiError,
    protocol::{RecordFrameViewRequest, StoryResponse},
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[async_trait]
pub trait StoryLoader: Send + Sync {
    async fn load_story(&self, story_id: StoryId) -> Result<Story>;
}

#[async_trait]
pub trait FrameViewRecorder: Send + Sync {
    async fn record_frame_view(&self, frame_id: FrameId) -> Result<()>;
}

/// Recorder for sessions with no backend to report to.
pub struct NoopViewRecorder;

#[async_trait]
impl FrameViewRecorder for NoopViewRecorder {
    async fn record_frame_view(&self, frame_id: FrameId) -> Result<()> {
        debug!("story: view not reported frame={frame_id}");
        Ok(())
    }
}

/// What the host screen shows while a story is being fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum StoryLoadState {
    Loading,
    Ready(Story),
    /// The server no longer knows the story.
    Expired,
    Failed(String),
}

impl StoryLoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

pub async fn load_story_state(loader: &dyn StoryLoader, story_id: StoryId) -> StoryLoadState {
    match loader.load_story(story_id).await {
        Ok(story) => {
            info!(
                "story: loaded story={} frames={}",
                story.id,
                story.frame_count()
            );
            StoryLoadState::Ready(story)
        }
        Err(err) => match err.downcast_ref::<StoryApiError>() {
            Some(StoryApiError::Rejected { error, .. }) if error.is_not_found() => {
                info!("story: expired story={story_id}");
                StoryLoadState::Expired
            }
            _ => {
                warn!("story: load failed story={story_id}: {err:#}");
                StoryLoadState::Failed(format!("{err:#}"))
            }
        },
    }
}

#[derive(Debug, Error)]
pub enum StoryApiError {
    #[error("invalid server url '{url}': {source}")]
    InvalidServerUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("server rejected request with status {status}: {error}")]
    Rejected { status: u16, error: ApiError },
    #[error("server returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },
}

pub struct StoryApiClient {
    http: Client,
    server_url: Url,
}

impl StoryApiClient {
    pub fn new(server_url: &str, request_timeout: Duration) -> Result<Self> {
        let mut server_url =
            Url::parse(server_url).map_err(|source| StoryApiError::InvalidServerUrl {
                url: server_url.to_string(),
                source,
            })?;
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self { http, server_url })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.server_url
            .join(path)
            .map_err(|source| {
                StoryApiError::InvalidServerUrl {
                    url: format!("{}{path}", self.server_url),
                    source,
                }
                .into()
            })
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("story: failed to read error body status={status}: {err}");
            Default::default()
        }
    };
    match serde_json::from_slice::<ApiError>(&bytes) {
        Ok(error) => Err(StoryApiError::Rejected {
            status: status.as_u16(),
            error,
        }
        .into()),
        Err(_) => Err(StoryApiError::UnexpectedStatus {
            status: status.as_u16(),
        }
        .into()),
    }
}

#[async_trait]
impl StoryLoader for StoryApiClient {
    async fn load_story(&self, story_id: StoryId) -> Result<Story> {
        let url = self.endpoint(&format!("stories/{story_id}"))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch story {story_id}"))?;
        let body: StoryResponse = ensure_success(response)
            .await?
            .json()
            .await
            .with_context(|| format!("failed to decode story {story_id}"))?;
        Ok(body.into())
    }
}

#[async_trait]
impl FrameViewRecorder for StoryApiClient {
    async fn record_frame_view(&self, frame_id: FrameId) -> Result<()> {
        let url = self.endpoint(&format!("stories/frames/{frame_id}/views"))?;
        let response = self
            .http
            .post(url)
            .json(&RecordFrameViewRequest {
                viewed_at: Utc::now(),
            })
            .send()
            .await
            .with_context(|| format!("failed to record view for frame {frame_id}"))?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
