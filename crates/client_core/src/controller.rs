//! Async driver around [`StoryPlayback`]: owns the single frame timer,
//! dispatches view recording and publishes [`PlaybackEvent`]s.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use shared::domain::{Frame, FrameId, Story, StoryId};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    api::FrameViewRecorder,
    playback::{PlaybackEffect, PlaybackError, PlaybackEvent, StoryPlayback},
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Point-in-time view of the playback for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub story_id: StoryId,
    pub current_index: Option<usize>,
    pub current_frame: Option<Frame>,
    pub progress: f64,
    pub segments: Vec<f64>,
    pub paused: bool,
    pub exhausted: bool,
}

pub struct StoryPlaybackController {
    shared: Arc<ControllerShared>,
}

struct ControllerShared {
    story_id: StoryId,
    inner: Mutex<ControllerInner>,
    closed: AtomicBool,
    events: broadcast::Sender<PlaybackEvent>,
    recorder: Arc<dyn FrameViewRecorder>,
}

struct ControllerInner {
    playback: StoryPlayback,
    timer: Option<JoinHandle<()>>,
}

impl StoryPlaybackController {
    /// Starts playing `story` from its first frame. The returned receiver
    /// sees every event from the first `FrameChanged` on.
    pub async fn start(
        story: Story,
        recorder: Arc<dyn FrameViewRecorder>,
    ) -> Result<(Self, broadcast::Receiver<PlaybackEvent>), PlaybackError> {
        let story_id = story.id;
        let (playback, effects) = StoryPlayback::start(story, Instant::now())?;
        let (events, receiver) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let shared = Arc::new(ControllerShared {
            story_id,
            inner: Mutex::new(ControllerInner {
                playback,
                timer: None,
            }),
            closed: AtomicBool::new(false),
            events,
            recorder,
        });

        {
            let mut inner = shared.inner.lock().await;
            info!(
                "story: playback started story={} frames={}",
                story_id,
                inner.playback.story().frame_count()
            );
            shared.dispatch(effects);
            shared.reschedule(&mut inner);
        }

        Ok((Self { shared }, receiver))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }

    pub async fn current_index(&self) -> Option<usize> {
        self.shared.inner.lock().await.playback.current_index()
    }

    pub async fn current_frame(&self) -> Option<Frame> {
        self.shared
            .inner
            .lock()
            .await
            .playback
            .current_frame()
            .cloned()
    }

    pub async fn progress_fraction(&self) -> f64 {
        self.shared
            .inner
            .lock()
            .await
            .playback
            .progress_at(Instant::now())
    }

    pub async fn segments(&self) -> Vec<f64> {
        self.shared
            .inner
            .lock()
            .await
            .playback
            .segments(Instant::now())
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.shared.inner.lock().await;
        let now = Instant::now();
        let playback = &inner.playback;
        PlaybackSnapshot {
            story_id: self.shared.story_id,
            current_index: playback.current_index(),
            current_frame: playback.current_frame().cloned(),
            progress: playback.progress_at(now),
            segments: playback.segments(now),
            paused: playback.is_paused(),
            exhausted: playback.is_exhausted(),
        }
    }

    pub async fn hold_start(&self) -> Result<(), PlaybackError> {
        self.transition(|playback, now| playback.hold_start(now))
            .await
    }

    pub async fn release_with_delta(&self, dx: f32, dy: f32) -> Result<(), PlaybackError> {
        self.transition(|playback, now| playback.release_with_delta(dx, dy, now))
            .await
    }

    pub async fn advance_forward(&self) -> Result<(), PlaybackError> {
        self.transition(|playback, now| playback.advance_forward(now))
            .await
    }

    pub async fn advance_backward(&self) -> Result<(), PlaybackError> {
        self.transition(|playback, now| playback.advance_backward(now))
            .await
    }

    /// Stops playback for good; the pending timer is cancelled and no
    /// further events are published.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut inner = self.shared.inner.lock().await;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        debug!("story: playback closed story={}", self.shared.story_id);
    }

    async fn transition<F>(&self, apply: F) -> Result<(), PlaybackError>
    where
        F: FnOnce(&mut StoryPlayback, Instant) -> Vec<PlaybackEffect>,
    {
        let mut inner = self.shared.inner.lock().await;
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(PlaybackError::Closed(self.shared.story_id));
        }

        let effects = apply(&mut inner.playback, Instant::now());
        if !effects.is_empty() {
            self.shared.reschedule(&mut inner);
            self.shared.dispatch(effects);
        }
        Ok(())
    }
}

impl Drop for StoryPlaybackController {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
        }
    }
}

impl ControllerShared {
    /// Replaces the frame timer. Must be called with `inner` locked so the
    /// old timer cannot be mid-transition.
    fn reschedule(self: &Arc<Self>, inner: &mut ControllerInner) {
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        if let Some(deadline) = inner.playback.deadline() {
            inner.timer = Some(tokio::spawn(run_frame_timer(
                Arc::downgrade(self),
                deadline,
            )));
        }
    }

    fn dispatch(&self, effects: Vec<PlaybackEffect>) {
        for effect in effects {
            match effect {
                PlaybackEffect::RecordView(frame_id) => self.record_view(frame_id),
                PlaybackEffect::Event(event) => {
                    match &event {
                        PlaybackEvent::FrameChanged { index, frame_id } => debug!(
                            "story: frame changed story={} index={index} frame={frame_id}",
                            self.story_id
                        ),
                        PlaybackEvent::Exhausted { story_id } => {
                            info!("story: playback exhausted story={story_id}")
                        }
                        PlaybackEvent::Restarted { .. }
                        | PlaybackEvent::Paused { .. }
                        | PlaybackEvent::Resumed { .. } => {}
                    }
                    // No subscribers is fine; the host may not listen.
                    let _ = self.events.send(event);
                }
            }
        }
    }

    fn record_view(&self, frame_id: FrameId) {
        let recorder = Arc::clone(&self.recorder);
        let story_id = self.story_id;
        tokio::spawn(async move {
            if let Err(err) = recorder.record_frame_view(frame_id).await {
                warn!("story: failed to record view story={story_id} frame={frame_id}: {err:#}");
            }
        });
    }
}

async fn run_frame_timer(shared: Weak<ControllerShared>, mut deadline: Instant) {
    loop {
        tokio::time::sleep_until(deadline).await;

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut inner = shared.inner.lock().await;
        if shared.closed.load(Ordering::SeqCst) {
            return;
        }

        let effects = inner.playback.tick(Instant::now());
        let next = inner.playback.deadline();
        shared.dispatch(effects);

        match next {
            Some(next) => deadline = next,
            None => {
                inner.timer = None;
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
