//! Plain-text rendering of the story viewer.

use shared::domain::{Frame, FrameKind};

const SEGMENT_WIDTH: usize = 10;

/// One bracketed segment per frame, filled in proportion to its progress.
pub fn render_progress_bar(segments: &[f64]) -> String {
    segments
        .iter()
        .map(|fill| {
            let filled = (fill.clamp(0.0, 1.0) * SEGMENT_WIDTH as f64).round() as usize;
            format!(
                "[{}{}]",
                "#".repeat(filled),
                "-".repeat(SEGMENT_WIDTH - filled)
            )
        })
        .collect()
}

pub fn describe_frame(index: usize, frame_count: usize, frame: &Frame) -> String {
    let kind = match frame.kind {
        FrameKind::Image => "image",
        FrameKind::Video => "video",
        FrameKind::Text => "text",
    };

    let mut description = format!(
        "frame {}/{} ({kind}, {:.1}s)",
        index + 1,
        frame_count,
        frame.duration().as_secs_f64()
    );
    match (frame.kind, frame.media_slot()) {
        (FrameKind::Text, _) => {}
        (_, Some(url)) => description.push_str(&format!(" media={url}")),
        (_, None) => description.push_str(" media=<unavailable>"),
    }
    if let Some(caption) = frame.caption() {
        description.push_str(&format!(" \"{caption}\""));
    }
    description
}
