//! Classification of the release half of a hold gesture.

/// Minimum horizontal travel, in pixels, for a release to count as a swipe.
pub const SWIPE_THRESHOLD_PX: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseGesture {
    /// Travel below the threshold; resume the held frame.
    Resume,
    /// Swipe left (negative dx).
    SwipeForward,
    /// Swipe right (positive dx).
    SwipeBackward,
}

/// Only the sign and magnitude of `dx` matter; vertical travel is ignored.
pub fn classify_release(dx: f32, _dy: f32) -> ReleaseGesture {
    if !dx.is_finite() || dx.abs() < SWIPE_THRESHOLD_PX {
        ReleaseGesture::Resume
    } else if dx < 0.0 {
        ReleaseGesture::SwipeForward
    } else {
        ReleaseGesture::SwipeBackward
    }
}
