use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{Frame, FrameId, FrameKind, Story, StoryId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResponse {
    pub id: FrameId,
    pub kind: FrameKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_url: Option<Url>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub viewed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResponse {
    pub id: StoryId,
    pub user_id: UserId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub frames: Vec<FrameResponse>,
}

impl From<FrameResponse> for Frame {
    fn from(value: FrameResponse) -> Self {
        Self {
            id: value.id,
            kind: value.kind,
            content: value.content,
            media_url: value.media_url,
            duration_seconds: value.duration_seconds,
            viewed: value.viewed,
        }
    }
}

impl From<StoryResponse> for Story {
    fn from(value: StoryResponse) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            created_at: value.created_at,
            frames: value.frames.into_iter().map(Frame::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFrameViewRequest {
    pub viewed_at: DateTime<Utc>,
}
