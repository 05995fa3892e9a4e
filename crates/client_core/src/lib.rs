//! Client-side story viewing: the playback state machine, its async timer
//! driver, and the story API the viewer talks to.

pub mod api;
pub mod controller;
pub mod gesture;
pub mod playback;

pub use api::{
    load_story_state, FrameViewRecorder, NoopViewRecorder, StoryApiClient, StoryApiError,
    StoryLoadState, StoryLoader,
};
pub use controller::{PlaybackSnapshot, StoryPlaybackController};
pub use gesture::{classify_release, ReleaseGesture, SWIPE_THRESHOLD_PX};
pub use playback::{PlaybackEffect, PlaybackError, PlaybackEvent, PlaybackState, StoryPlayback};
