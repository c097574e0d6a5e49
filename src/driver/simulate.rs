//! Scripted playback in virtual time: steady frames with a stall at the end
//! of every cycle, optionally with one cycle played on a hidden surface.

use crate::kernel::event::Event;
use crate::kernel::frame::{FrameMetadata, StreamId};
use crate::kernel::reactor::Reactor;
use crate::kernel::scheduler::{FreezeReport, SideEffect};
use crate::kernel::visibility::Visibility;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackScript {
    pub cycles: usize,
    pub steady_frames: usize,
    pub interval_ms: f64,
    pub stall_ms: f64,
    /// Zero-based cycle whose stall happens while the surface is hidden.
    pub hidden_cycle: Option<usize>,
}

impl Default for PlaybackScript {
    fn default() -> Self {
        // ~15fps with a 3s stall, the shape of a stalled canvas capture.
        Self {
            cycles: 3,
            steady_frames: 300,
            interval_ms: 66.0,
            stall_ms: 3_000.0,
            hidden_cycle: None,
        }
    }
}

impl PlaybackScript {
    pub fn events(&self, stream: StreamId) -> Vec<Event> {
        let mut events = vec![Event::StreamOpened {
            stream,
            label: Some("simulated".to_string()),
        }];
        let mut t = 0.0;
        let mut presented = 0u64;

        for cycle in 0..self.cycles {
            for _ in 0..self.steady_frames {
                t += self.interval_ms;
                push_frame(&mut events, stream, t, &mut presented);
            }

            let stall_start = t;
            t += self.stall_ms;
            if self.hidden_cycle == Some(cycle) {
                events.push(Event::Visibility {
                    state: Visibility::Hidden,
                    at_ms: stall_start + 1.0,
                });
                events.push(Event::Visibility {
                    state: Visibility::Visible,
                    at_ms: t - 1.0,
                });
            }
            push_frame(&mut events, stream, t, &mut presented);
        }

        events.push(Event::StreamClosed { stream });
        events
    }
}

fn push_frame(events: &mut Vec<Event>, stream: StreamId, t: f64, presented: &mut u64) {
    *presented += 1;
    events.push(Event::Frame {
        stream,
        now_ms: t,
        metadata: FrameMetadata::new(t, *presented),
    });
}

/// Drives `events` through `reactor` synchronously, one tick per
/// `tick_ms` of event time, and collects every report produced.
pub fn run_scripted(reactor: &mut Reactor, events: Vec<Event>) -> Vec<FreezeReport> {
    let tick_ms = reactor.config.tick_ms as f64;
    let mut reports = Vec::new();
    let mut batch = Vec::new();
    let mut batch_end: Option<f64> = None;

    for event in events {
        if let (Some(t), Some(end)) = (event.time_ms(), batch_end) {
            if t >= end {
                drain(reactor, std::mem::take(&mut batch), &mut reports);
                batch_end = None;
            }
        }
        if batch_end.is_none() {
            if let Some(t) = event.time_ms() {
                batch_end = Some(t + tick_ms);
            }
        }
        batch.push(event);
    }
    if !batch.is_empty() {
        drain(reactor, batch, &mut reports);
    }

    reports.extend(reactor.flush());
    reports
}

fn drain(reactor: &mut Reactor, batch: Vec<Event>, reports: &mut Vec<FreezeReport>) {
    for effect in reactor.tick_step(batch) {
        match effect {
            SideEffect::Report(report) => reports.push(report),
        }
    }
}
