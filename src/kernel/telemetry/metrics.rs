use std::collections::VecDeque;

use super::event::{DiscardReason, StreamEventKind, TelemetryEvent};
use crate::kernel::visibility::Visibility;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub freeze_stats: FreezeStats,
    pub visibility_stats: VisibilityStats,
    pub stream_stats: StreamStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreezeStats {
    /// Every interval classified as a freeze.
    pub detected: u64,
    /// Freezes that were visible throughout and accumulated.
    pub counted: u64,
    pub total_counted_ms: f64,
    pub max_counted_ms: f64,
    pub avg_counted_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityStats {
    pub hidden_transitions: u64,
    pub visible_transitions: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStats {
    pub opened: u64,
    pub closed: u64,
    pub discarded_samples: u64,
    pub regressions: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::Freeze { duration_ms, counted, .. } => {
                snap.freeze_stats.detected += 1;
                if *counted {
                    snap.freeze_stats.counted += 1;
                    snap.freeze_stats.total_counted_ms += duration_ms;
                    if *duration_ms > snap.freeze_stats.max_counted_ms {
                        snap.freeze_stats.max_counted_ms = *duration_ms;
                    }
                }
            }
            TelemetryEvent::VisibilityTransition { to, .. } => match to {
                Visibility::Hidden => snap.visibility_stats.hidden_transitions += 1,
                Visibility::Visible => snap.visibility_stats.visible_transitions += 1,
            },
            TelemetryEvent::StreamLifecycle { event, .. } => match event {
                StreamEventKind::Opened => snap.stream_stats.opened += 1,
                StreamEventKind::Closed => snap.stream_stats.closed += 1,
            },
            TelemetryEvent::SampleDiscarded { reason, .. } => {
                snap.stream_stats.discarded_samples += 1;
                if matches!(
                    reason,
                    DiscardReason::FrameCountRegressed | DiscardReason::PresentationTimeRegressed
                ) {
                    snap.stream_stats.regressions += 1;
                }
            }
        }
    }

    if snap.freeze_stats.counted > 0 {
        snap.freeze_stats.avg_counted_ms = snap.freeze_stats.total_counted_ms / snap.freeze_stats.counted as f64;
    }

    snap
}
