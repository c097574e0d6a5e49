use serde::{Deserialize, Serialize};

use crate::kernel::frame::StreamId;
use crate::kernel::time::Tick;
use crate::kernel::visibility::Visibility;

// Allowed: IDs, Timestamps, Durations, Counts, Enums
// Forbidden: frame pixels, media URLs

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    StreamLifecycle {
        stream: StreamId,
        event: StreamEventKind,
        tick: Tick,
    },

    Freeze {
        stream: StreamId,
        duration_ms: f64,
        avg_interframe_delay_ms: f64,
        /// False when the interval overlapped a hidden surface.
        counted: bool,
    },

    SampleDiscarded {
        stream: StreamId,
        reason: DiscardReason,
    },

    VisibilityTransition {
        to: Visibility,
        at_ms: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEventKind {
    Opened,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    FrameCountRegressed,
    PresentationTimeRegressed,
    EmptyWindow,
}

impl From<&crate::error::QualityError> for DiscardReason {
    fn from(err: &crate::error::QualityError) -> Self {
        use crate::error::QualityError;
        match err {
            QualityError::FrameCountRegressed { .. } => DiscardReason::FrameCountRegressed,
            QualityError::PresentationTimeRegressed { .. } => DiscardReason::PresentationTimeRegressed,
            QualityError::EmptyWindow => DiscardReason::EmptyWindow,
        }
    }
}
