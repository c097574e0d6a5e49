use serde::{Deserialize, Serialize};

use super::frame::StreamId;
use super::quality::FreezeDetector;
use super::time::Tick;

/// Periodic sample of one stream. Produced by read-and-clear of the
/// detector's accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeReport {
    pub stream: StreamId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub tick: Tick,
    pub at_ms: f64,
    /// Visible freeze time since the previous report.
    pub freeze_ms: f64,
    pub was_freeze: bool,
    pub avg_interframe_delay_ms: f64,
    pub window_frames: u64,
    /// Last stream report before it was closed or the reactor stopped.
    pub is_final: bool,
}

impl FreezeReport {
    pub fn sample(
        stream: StreamId,
        label: Option<String>,
        detector: &mut FreezeDetector,
        tick: Tick,
        at_ms: f64,
        is_final: bool,
    ) -> Self {
        Self {
            stream,
            label,
            tick,
            at_ms,
            freeze_ms: detector.take_freeze_accumulated_ms(),
            was_freeze: detector.was_freeze(),
            avg_interframe_delay_ms: detector.avg_interframe_delay_ms(),
            window_frames: detector.window_frames(),
            is_final,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SideEffect {
    Report(FreezeReport),
}

/// Decides when accumulated freeze time is sampled, on event time.
#[derive(Debug, Clone)]
pub struct ReportScheduler {
    interval_ms: f64,
    last_report_ms: Option<f64>,
}

impl ReportScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms as f64,
            last_report_ms: None,
        }
    }

    /// The first observed time only anchors the schedule.
    pub fn due(&mut self, now_ms: f64) -> bool {
        match self.last_report_ms {
            None => {
                self.last_report_ms = Some(now_ms);
                false
            }
            Some(last) if now_ms - last >= self.interval_ms => {
                self.last_report_ms = Some(now_ms);
                true
            }
            Some(_) => false,
        }
    }
}
