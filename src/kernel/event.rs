use serde::{Deserialize, Serialize};

use super::frame::{FrameMetadata, StreamId};
use super::visibility::Visibility;

/// Reactor input, delivered in arrival order over the kernel channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StreamOpened {
        stream: StreamId,
        label: Option<String>,
    },
    /// One presented frame. `now_ms` is the callback timestamp.
    Frame {
        stream: StreamId,
        now_ms: f64,
        metadata: FrameMetadata,
    },
    Visibility {
        state: Visibility,
        at_ms: f64,
    },
    StreamClosed {
        stream: StreamId,
    },
}

impl Event {
    /// Timestamp carried by the event, if any.
    pub fn time_ms(&self) -> Option<f64> {
        match self {
            Event::Frame { now_ms, .. } => Some(*now_ms),
            Event::Visibility { at_ms, .. } => Some(*at_ms),
            Event::StreamOpened { .. } | Event::StreamClosed { .. } => None,
        }
    }
}

/// Dispatched to freeze listeners for every classified freeze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeEvent {
    pub stream: StreamId,
    pub at_ms: f64,
    pub duration_ms: f64,
    pub avg_interframe_delay_ms: f64,
    pub counted: bool,
}
