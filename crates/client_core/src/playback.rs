//! Story playback state machine.
//!
//! [`StoryPlayback`] is clock-agnostic: every transition takes the current
//! monotonic [`Instant`] and returns the effects the host has to carry out.
//! Timer scheduling lives in [`crate::controller`].

use std::time::Duration;

use shared::domain::{Frame, FrameId, Story, StoryId};
use thiserror::Error;
use tokio::time::Instant;

use crate::gesture::{classify_release, ReleaseGesture};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("story {0} has no frames to play")]
    EmptyStory(StoryId),
    #[error("playback for story {0} was closed")]
    Closed(StoryId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    /// `progress` is the fraction reached at `resumed_at`; it keeps growing
    /// with the clock from there.
    Playing {
        index: usize,
        progress: f64,
        resumed_at: Instant,
    },
    Paused {
        index: usize,
        progress: f64,
    },
    Exhausted,
}

/// Notifications for the host screen.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    FrameChanged { index: usize, frame_id: FrameId },
    /// Backward navigation at the first frame: same frame, progress reset.
    Restarted { index: usize },
    Paused { index: usize, progress: f64 },
    Resumed { index: usize, progress: f64 },
    Exhausted { story_id: StoryId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    Event(PlaybackEvent),
    /// First time this frame became current during the session.
    RecordView(FrameId),
}

#[derive(Debug)]
pub struct StoryPlayback {
    story: Story,
    state: PlaybackState,
}

impl StoryPlayback {
    /// Enters `Playing(0, 0)` at `now`.
    pub fn start(story: Story, now: Instant) -> Result<(Self, Vec<PlaybackEffect>), PlaybackError> {
        if story.is_empty() {
            return Err(PlaybackError::EmptyStory(story.id));
        }

        let mut playback = Self {
            story,
            state: PlaybackState::Exhausted,
        };
        let mut effects = Vec::new();
        playback.enter_frame(0, now, &mut effects);
        Ok((playback, effects))
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, PlaybackState::Exhausted)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, PlaybackState::Paused { .. })
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            PlaybackState::Playing { index, .. } | PlaybackState::Paused { index, .. } => {
                Some(index)
            }
            PlaybackState::Exhausted => None,
        }
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_index().map(|index| &self.story.frames[index])
    }

    /// Fraction of the current frame elapsed at `now`, clamped to `[0, 1]`.
    /// An exhausted story reports 1.
    pub fn progress_at(&self, now: Instant) -> f64 {
        match self.state {
            PlaybackState::Playing {
                index,
                progress,
                resumed_at,
            } => {
                let duration = self.story.frames[index].duration();
                let elapsed = now.saturating_duration_since(resumed_at);
                (progress + elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
            }
            PlaybackState::Paused { progress, .. } => progress,
            PlaybackState::Exhausted => 1.0,
        }
    }

    /// Fill level of every segment of a segmented progress bar.
    pub fn segments(&self, now: Instant) -> Vec<f64> {
        let frame_count = self.story.frame_count();
        let Some(current) = self.current_index() else {
            return vec![1.0; frame_count];
        };
        let progress = self.progress_at(now);

        (0..frame_count)
            .map(|index| match index.cmp(&current) {
                std::cmp::Ordering::Less => 1.0,
                std::cmp::Ordering::Equal => progress,
                std::cmp::Ordering::Greater => 0.0,
            })
            .collect()
    }

    /// Instant at which the current frame completes, while playing. `None`
    /// also when that instant is beyond what the clock can represent.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            PlaybackState::Playing {
                index,
                progress,
                resumed_at,
            } => resumed_at.checked_add(remaining(&self.story.frames[index], progress)),
            PlaybackState::Paused { .. } | PlaybackState::Exhausted => None,
        }
    }

    /// Applies every frame completion due by `now`. Each completion starts
    /// the next frame at the instant the previous one ended, so a late tick
    /// does not stretch the following frame.
    pub fn tick(&mut self, now: Instant) -> Vec<PlaybackEffect> {
        let mut effects = Vec::new();
        while let Some(deadline) = self.deadline() {
            if now < deadline {
                break;
            }
            self.advance_from(deadline, &mut effects);
        }
        effects
    }

    pub fn hold_start(&mut self, now: Instant) -> Vec<PlaybackEffect> {
        let PlaybackState::Playing { index, .. } = self.state else {
            return Vec::new();
        };
        let progress = self.progress_at(now);
        self.state = PlaybackState::Paused { index, progress };
        vec![PlaybackEffect::Event(PlaybackEvent::Paused { index, progress })]
    }

    /// Resumes a held frame from its stored progress.
    pub fn resume(&mut self, now: Instant) -> Vec<PlaybackEffect> {
        let PlaybackState::Paused { index, progress } = self.state else {
            return Vec::new();
        };
        self.state = PlaybackState::Playing {
            index,
            progress,
            resumed_at: now,
        };
        vec![PlaybackEffect::Event(PlaybackEvent::Resumed { index, progress })]
    }

    pub fn release_with_delta(&mut self, dx: f32, dy: f32, now: Instant) -> Vec<PlaybackEffect> {
        if self.is_exhausted() {
            return Vec::new();
        }
        match classify_release(dx, dy) {
            ReleaseGesture::Resume => self.resume(now),
            ReleaseGesture::SwipeForward => self.advance_forward(now),
            ReleaseGesture::SwipeBackward => self.advance_backward(now),
        }
    }

    pub fn advance_forward(&mut self, now: Instant) -> Vec<PlaybackEffect> {
        let mut effects = Vec::new();
        if !self.is_exhausted() {
            self.advance_from(now, &mut effects);
        }
        effects
    }

    pub fn advance_backward(&mut self, now: Instant) -> Vec<PlaybackEffect> {
        let Some(index) = self.current_index() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        if index == 0 {
            self.state = PlaybackState::Playing {
                index: 0,
                progress: 0.0,
                resumed_at: now,
            };
            effects.push(PlaybackEffect::Event(PlaybackEvent::Restarted { index: 0 }));
        } else {
            self.enter_frame(index - 1, now, &mut effects);
        }
        effects
    }

    fn advance_from(&mut self, at: Instant, effects: &mut Vec<PlaybackEffect>) {
        let Some(index) = self.current_index() else {
            return;
        };

        if index + 1 < self.story.frame_count() {
            self.enter_frame(index + 1, at, effects);
        } else {
            self.state = PlaybackState::Exhausted;
            effects.push(PlaybackEffect::Event(PlaybackEvent::Exhausted {
                story_id: self.story.id,
            }));
        }
    }

    fn enter_frame(&mut self, index: usize, at: Instant, effects: &mut Vec<PlaybackEffect>) {
        self.state = PlaybackState::Playing {
            index,
            progress: 0.0,
            resumed_at: at,
        };

        let frame = &mut self.story.frames[index];
        effects.push(PlaybackEffect::Event(PlaybackEvent::FrameChanged {
            index,
            frame_id: frame.id,
        }));
        if !frame.viewed {
            frame.viewed = true;
            effects.push(PlaybackEffect::RecordView(frame.id));
        }
    }
}

fn remaining(frame: &Frame, progress: f64) -> Duration {
    frame.duration().mul_f64((1.0 - progress).clamp(0.0, 1.0))
}

#[cfg(test)]
#[path = "tests/playback_tests.rs"]
mod tests;
