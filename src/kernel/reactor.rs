use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{Event, FreezeEvent};
use super::frame::{FrameMetadata, StreamId};
use super::listener::ListenerRegistry;
use super::quality::{FrameOutcome, FreezeDetector};
use super::scheduler::{FreezeReport, ReportScheduler, SideEffect};
use super::telemetry::event::{DiscardReason, StreamEventKind, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::Tick;
use super::visibility::{Visibility, VisibilityChange, VisibilityGate};
use crate::config::ReactorConfig;

struct StreamEntry {
    seq: u64,
    label: Option<String>,
    detector: FreezeDetector,
}

/// Hosts one `FreezeDetector` per stream, all gated by the same surface.
pub struct Reactor {
    pub receiver: mpsc::Receiver<Event>,
    pub config: ReactorConfig,
    visibility: Arc<VisibilityGate>,
    streams: HashMap<StreamId, StreamEntry>,
    next_seq: u64,
    pub freeze_listeners: ListenerRegistry<FreezeEvent>,
    pub visibility_listeners: ListenerRegistry<VisibilityChange>,
    pub telemetry: TelemetryRecorder,
    pub tick: Tick,
    scheduler: ReportScheduler,
    // Latest timestamp seen on any event; reports are scheduled on it.
    // None until a timed event arrives.
    event_time_ms: Option<f64>,
}

impl Reactor {
    pub fn new(receiver: mpsc::Receiver<Event>, config: ReactorConfig, visibility: Arc<VisibilityGate>) -> Self {
        Self {
            receiver,
            telemetry: TelemetryRecorder::with_capacity(config.telemetry_capacity),
            scheduler: ReportScheduler::new(config.report_interval_ms),
            config,
            visibility,
            streams: HashMap::new(),
            next_seq: 0,
            freeze_listeners: ListenerRegistry::new("freeze"),
            visibility_listeners: ListenerRegistry::new("visibility"),
            tick: Tick::new(),
            event_time_ms: None,
        }
    }

    pub fn visibility(&self) -> &Arc<VisibilityGate> {
        &self.visibility
    }

    pub fn detector(&self, stream: &StreamId) -> Option<&FreezeDetector> {
        self.streams.get(stream).map(|s| &s.detector)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn event_time_ms(&self) -> Option<f64> {
        self.event_time_ms
    }

    /// Pure step: applies `events` in arrival order and returns the reports
    /// that fell due. MUST NOT await I/O or timers.
    pub fn tick_step(&mut self, events: Vec<Event>) -> Vec<SideEffect> {
        self.tick = self.tick.next();
        let mut effects = Vec::new();

        for event in events {
            if let Some(t) = event.time_ms() {
                self.event_time_ms = Some(self.event_time_ms.map_or(t, |seen| seen.max(t)));
            }

            match event {
                Event::StreamOpened { stream, label } => self.open_stream(stream, label),
                Event::Frame { stream, now_ms, metadata } => self.handle_frame(stream, now_ms, &metadata),
                Event::Visibility { state, at_ms } => self.handle_visibility(state, at_ms),
                Event::StreamClosed { stream } => {
                    if let Some(report) = self.close_stream(&stream) {
                        effects.push(SideEffect::Report(report));
                    }
                }
            }
        }

        // An untimed tick must not anchor the schedule.
        if let Some(now_ms) = self.event_time_ms {
            if self.scheduler.due(now_ms) {
                effects.extend(self.report_all(false).into_iter().map(SideEffect::Report));
            }
        }

        effects
    }

    /// Samples every stream now, regardless of schedule.
    pub fn flush(&mut self) -> Vec<FreezeReport> {
        self.report_all(true)
    }

    /// Async driver loop. Runs until `cancel` fires or every sender is gone,
    /// then flushes a final report per stream.
    pub async fn run(&mut self, cancel: CancellationToken, reports: mpsc::Sender<FreezeReport>) {
        info!("Reactor started. Tick: {}ms", self.config.tick_ms);

        let mut cadence = interval(Duration::from_millis(self.config.tick_ms));
        cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        'driver: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reactor cancelled");
                    break 'driver;
                }
                _ = cadence.tick() => {}
            }

            let mut events = Vec::new();
            let mut disconnected = false;
            loop {
                match self.receiver.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }

            for effect in self.tick_step(events) {
                match effect {
                    SideEffect::Report(report) => {
                        if reports.send(report).await.is_err() {
                            warn!("Report sink closed, stopping reactor");
                            return;
                        }
                    }
                }
            }

            if disconnected {
                info!("Event channel closed");
                break 'driver;
            }
        }

        for report in self.flush() {
            if reports.send(report).await.is_err() {
                break;
            }
        }
    }

    fn open_stream(&mut self, stream: StreamId, label: Option<String>) {
        if self.streams.contains_key(&stream) {
            debug!("stream {} already open", stream);
            return;
        }

        info!("Stream opened: {} ({})", stream, label.as_deref().unwrap_or("unlabelled"));
        let detector = FreezeDetector::with_history_capacity(self.visibility.clone(), self.config.freeze_history_capacity);
        self.streams.insert(
            stream,
            StreamEntry {
                seq: self.next_seq,
                label,
                detector,
            },
        );
        self.next_seq += 1;
        self.telemetry.record(TelemetryEvent::StreamLifecycle {
            stream,
            event: StreamEventKind::Opened,
            tick: self.tick,
        });
    }

    fn close_stream(&mut self, stream: &StreamId) -> Option<FreezeReport> {
        let mut entry = self.streams.remove(stream)?;
        info!("Stream closed: {}", stream);
        self.telemetry.record(TelemetryEvent::StreamLifecycle {
            stream: *stream,
            event: StreamEventKind::Closed,
            tick: self.tick,
        });
        Some(FreezeReport::sample(
            *stream,
            entry.label,
            &mut entry.detector,
            self.tick,
            self.event_time_ms.unwrap_or(0.0),
            true,
        ))
    }

    fn handle_frame(&mut self, stream: StreamId, now_ms: f64, metadata: &FrameMetadata) {
        if !self.streams.contains_key(&stream) {
            self.open_stream(stream, None);
        }
        let Some(entry) = self.streams.get_mut(&stream) else {
            return;
        };

        match entry.detector.on_rendered_frame(now_ms, metadata) {
            FrameOutcome::Warmup => {}
            FrameOutcome::Discarded(err) => {
                self.telemetry.record(TelemetryEvent::SampleDiscarded {
                    stream,
                    reason: DiscardReason::from(&err),
                });
            }
            FrameOutcome::Classified(verdict) if verdict.was_freeze => {
                self.telemetry.record(TelemetryEvent::Freeze {
                    stream,
                    duration_ms: verdict.interframe_delay_ms,
                    avg_interframe_delay_ms: verdict.avg_interframe_delay_ms,
                    counted: verdict.counted,
                });
                self.freeze_listeners.safe_emit(&FreezeEvent {
                    stream,
                    at_ms: now_ms,
                    duration_ms: verdict.interframe_delay_ms,
                    avg_interframe_delay_ms: verdict.avg_interframe_delay_ms,
                    counted: verdict.counted,
                });
            }
            FrameOutcome::Classified(_) => {}
        }
    }

    fn handle_visibility(&mut self, state: Visibility, at_ms: f64) {
        let Some(change) = self.visibility.transition(state, at_ms) else {
            return;
        };
        info!("Surface {:?} -> {:?} at {:.1}ms", change.from, change.to, at_ms);
        self.telemetry.record(TelemetryEvent::VisibilityTransition { to: change.to, at_ms });
        self.visibility_listeners.safe_emit(&change);
    }

    fn report_all(&mut self, is_final: bool) -> Vec<FreezeReport> {
        let tick = self.tick;
        let at_ms = self.event_time_ms.unwrap_or(0.0);
        let mut entries: Vec<(&StreamId, &mut StreamEntry)> = self.streams.iter_mut().collect();
        entries.sort_by_key(|(_, e)| e.seq);

        entries
            .into_iter()
            .map(|(id, entry)| FreezeReport::sample(*id, entry.label.clone(), &mut entry.detector, tick, at_ms, is_final))
            .collect()
    }
}
