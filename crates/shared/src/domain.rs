use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Playback time of a frame whose payload carries no usable duration.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_secs(5);

/// Longest playback time a single frame may claim; a story lives for a day.
pub const MAX_FRAME_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

macro_rules! uuid_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new_random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_newtype!(StoryId);
uuid_newtype!(FrameId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Image,
    Video,
    #[serde(alias = "text_only")]
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
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

impl Frame {
    /// Resolved playback time; absent, non-positive or non-finite values fall
    /// back to [`DEFAULT_FRAME_DURATION`], larger ones are capped at
    /// [`MAX_FRAME_DURATION`].
    pub fn duration(&self) -> Duration {
        self.duration_seconds
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| secs.min(MAX_FRAME_DURATION.as_secs_f64()))
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_FRAME_DURATION)
    }

    /// Media to render for this frame. Text frames and image/video frames
    /// without a url leave the slot empty.
    pub fn media_slot(&self) -> Option<&Url> {
        match self.kind {
            FrameKind::Text => None,
            FrameKind::Image | FrameKind::Video => self.media_url.as_ref(),
        }
    }

    pub fn caption(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|caption| !caption.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub user_id: UserId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub frames: Vec<Frame>,
}

impl Story {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: FrameKind, media_url: Option<&str>, duration_seconds: Option<f64>) -> Frame {
        Frame {
            id: FrameId::new_random(),
            kind,
            content: None,
            media_url: media_url.map(|url| Url::parse(url).expect("url")),
            duration_seconds,
            viewed: false,
        }
    }

    #[test]
    fn missing_or_invalid_duration_defaults_to_five_seconds() {
        assert_eq!(frame(FrameKind::Text, None, None).duration(), DEFAULT_FRAME_DURATION);
        assert_eq!(frame(FrameKind::Text, None, Some(0.0)).duration(), DEFAULT_FRAME_DURATION);
        assert_eq!(frame(FrameKind::Text, None, Some(-2.0)).duration(), DEFAULT_FRAME_DURATION);
        assert_eq!(
            frame(FrameKind::Text, None, Some(f64::NAN)).duration(),
            DEFAULT_FRAME_DURATION
        );
        assert_eq!(
            frame(FrameKind::Image, None, Some(2.5)).duration(),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn malformed_media_frame_has_empty_slot_but_keeps_caption() {
        let mut malformed = frame(FrameKind::Video, None, None);
        malformed.content = Some("  sunset  ".into());
        assert!(malformed.media_slot().is_none());
        assert_eq!(malformed.caption(), Some("sunset"));

        let text = frame(FrameKind::Text, Some("https://cdn.example.com/a.png"), None);
        assert!(text.media_slot().is_none());

        let image = frame(FrameKind::Image, Some("https://cdn.example.com/a.png"), None);
        assert_eq!(
            image.media_slot().map(Url::as_str),
            Some("https://cdn.example.com/a.png")
        );
    }

    #[test]
    fn frame_kind_accepts_text_only_alias() {
        let kind: FrameKind = serde_json::from_str("\"text_only\"").expect("kind");
        assert_eq!(kind, FrameKind::Text);
    }

    #[test]
    fn oversized_duration_is_capped_at_one_day() {
        assert_eq!(
            frame(FrameKind::Video, None, Some(1e19)).duration(),
            MAX_FRAME_DURATION
        );
        assert_eq!(
            frame(FrameKind::Video, None, Some(f64::MAX)).duration(),
            MAX_FRAME_DURATION
        );
        assert_eq!(
            frame(FrameKind::Video, None, Some(90_000.0)).duration(),
            MAX_FRAME_DURATION
        );
        assert_eq!(
            frame(FrameKind::Video, None, Some(3_600.0)).duration(),
            Duration::from_secs(3_600)
        );
    }
}
