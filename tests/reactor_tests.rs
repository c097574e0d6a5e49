use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use freezewatch::kernel::event::{Event, FreezeEvent};
use freezewatch::kernel::frame::{FrameMetadata, StreamId};
use freezewatch::kernel::scheduler::{FreezeReport, SideEffect};
use freezewatch::kernel::visibility::{Visibility, VisibilityChange, VisibilityGate};
use freezewatch::{Reactor, ReactorConfig};

fn reactor() -> (Reactor, mpsc::Sender<Event>) {
    let (tx, rx) = mpsc::channel(1024);
    let config = ReactorConfig {
        tick_ms: 1,
        ..ReactorConfig::default()
    };
    (Reactor::new(rx, config, Arc::new(VisibilityGate::new())), tx)
}

fn frame(stream: StreamId, t: f64, presented: u64) -> Event {
    Event::Frame {
        stream,
        now_ms: t,
        metadata: FrameMetadata::new(t, presented),
    }
}

/// Seven frames 66ms apart: t = 0..=396, presented 1..=7.
fn steady(stream: StreamId) -> Vec<Event> {
    (0..7).map(|i| frame(stream, i as f64 * 66.0, i + 1)).collect()
}

fn reports(effects: Vec<SideEffect>) -> Vec<FreezeReport> {
    effects
        .into_iter()
        .map(|effect| match effect {
            SideEffect::Report(report) => report,
        })
        .collect()
}

#[tokio::test]
async fn test_report_after_interval() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();

    // First tick only anchors the report schedule.
    let effects = reactor.tick_step(steady(stream));
    assert!(effects.is_empty());

    let out = reports(reactor.tick_step(vec![frame(stream, 3_396.0, 8)]));

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].stream, stream);
    assert_eq!(out[0].freeze_ms, 3_000.0);
    assert!(out[0].was_freeze);
    assert!(!out[0].is_final);
    assert_eq!(out[0].at_ms, 3_396.0);

    // Accumulator was cleared by the report.
    assert_eq!(reactor.detector(&stream).map(|d| d.freeze_accumulated_ms()), Some(0.0));
}

#[tokio::test]
async fn test_frame_for_unknown_stream_opens_it() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();

    reactor.tick_step(vec![frame(stream, 0.0, 1)]);

    assert_eq!(reactor.stream_count(), 1);
    assert!(reactor.detector(&stream).is_some());
    assert_eq!(reactor.telemetry.snapshot().stream_stats.opened, 1);
}

#[tokio::test]
async fn test_visibility_event_updates_gate_and_listeners() {
    let (mut reactor, _tx) = reactor();
    let seen: Arc<Mutex<Vec<VisibilityChange>>> = Arc::default();
    {
        let seen = seen.clone();
        reactor.visibility_listeners.on(move |change: &VisibilityChange| {
            seen.lock().unwrap().push(*change);
            Ok(())
        });
    }

    reactor.tick_step(vec![
        Event::Visibility {
            state: Visibility::Hidden,
            at_ms: 10.0,
        },
        Event::Visibility {
            state: Visibility::Hidden,
            at_ms: 20.0,
        },
    ]);

    assert_eq!(reactor.visibility().current(), Visibility::Hidden);
    assert_eq!(reactor.visibility().last_hidden_at_ms(), 10.0);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "Repeated state is not a transition");
    assert_eq!(seen[0].to, Visibility::Hidden);
    assert_eq!(reactor.telemetry.snapshot().visibility_stats.hidden_transitions, 1);
}

#[tokio::test]
async fn test_hidden_stall_is_detected_but_not_reported() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();
    reactor.tick_step(steady(stream));

    let out = reports(reactor.tick_step(vec![
        Event::Visibility {
            state: Visibility::Hidden,
            at_ms: 397.0,
        },
        Event::Visibility {
            state: Visibility::Visible,
            at_ms: 3_395.0,
        },
        frame(stream, 3_396.0, 8),
    ]));

    assert_eq!(out.len(), 1);
    assert!(out[0].was_freeze);
    assert_eq!(out[0].freeze_ms, 0.0);

    let snap = reactor.telemetry.snapshot();
    assert_eq!(snap.freeze_stats.detected, 1);
    assert_eq!(snap.freeze_stats.counted, 0);
}

#[tokio::test]
async fn test_freeze_listener_sees_each_freeze() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();
    let seen: Arc<Mutex<Vec<FreezeEvent>>> = Arc::default();
    {
        let seen = seen.clone();
        reactor.freeze_listeners.on(move |event: &FreezeEvent| {
            seen.lock().unwrap().push(event.clone());
            Ok(())
        });
    }

    reactor.tick_step(steady(stream));
    reactor.tick_step(vec![frame(stream, 3_396.0, 8)]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].stream, stream);
    assert_eq!(seen[0].at_ms, 3_396.0);
    assert_eq!(seen[0].duration_ms, 3_000.0);
    assert_eq!(seen[0].avg_interframe_delay_ms, 485.0);
    assert!(seen[0].counted);
}

#[tokio::test]
async fn test_close_emits_final_report() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();

    let mut events = vec![Event::StreamOpened {
        stream,
        label: Some("camera".to_string()),
    }];
    events.extend(steady(stream));
    events.push(frame(stream, 3_396.0, 8));
    events.push(Event::StreamClosed { stream });

    let out = reports(reactor.tick_step(events));

    assert_eq!(out.len(), 1);
    assert!(out[0].is_final);
    assert_eq!(out[0].label.as_deref(), Some("camera"));
    assert_eq!(out[0].freeze_ms, 3_000.0);
    assert_eq!(reactor.stream_count(), 0);
    assert!(reactor.flush().is_empty());
}

#[tokio::test]
async fn test_run_flushes_when_senders_are_gone() {
    let (mut reactor, tx) = reactor();
    let stream = StreamId::new();
    for event in steady(stream) {
        tx.send(event).await.unwrap();
    }
    tx.send(frame(stream, 3_396.0, 8)).await.unwrap();
    drop(tx);

    let (report_tx, mut report_rx) = mpsc::channel(16);
    reactor.run(CancellationToken::new(), report_tx).await;

    let mut collected = Vec::new();
    while let Some(report) = report_rx.recv().await {
        collected.push(report);
    }

    let total: f64 = collected.iter().map(|r| r.freeze_ms).sum();
    assert_eq!(total, 3_000.0);
    assert!(collected.last().map(|r| r.is_final).unwrap_or(false));
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let (mut reactor, _tx) = reactor();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (report_tx, mut report_rx) = mpsc::channel(16);
    reactor.run(cancel, report_tx).await;

    assert!(report_rx.recv().await.is_none(), "No streams, nothing to flush");
}

#[tokio::test]
async fn test_untimed_tick_does_not_anchor_schedule() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();

    assert!(reactor.tick_step(vec![]).is_empty());
    assert_eq!(reactor.event_time_ms(), None);

    // Stream time starts well past zero, as in a replayed trace.
    let late: Vec<Event> = (0..7).map(|i| frame(stream, 1_016.0 + i as f64 * 66.0, i + 1)).collect();
    let effects = reactor.tick_step(late);
    assert!(effects.is_empty(), "First timed batch only anchors the schedule");
    assert_eq!(reactor.event_time_ms(), Some(1_412.0));

    let out = reports(reactor.tick_step(vec![frame(stream, 4_412.0, 8)]));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].freeze_ms, 3_000.0);
}

#[tokio::test]
async fn test_empty_window_sample_is_recorded_as_discarded() {
    let (mut reactor, _tx) = reactor();
    let stream = StreamId::new();

    reactor.tick_step(vec![frame(stream, 10.0, 1), frame(stream, 15.0, 1)]);

    let snap = reactor.telemetry.snapshot();
    assert_eq!(snap.stream_stats.discarded_samples, 1);
    assert_eq!(snap.stream_stats.regressions, 0);
    assert_eq!(reactor.detector(&stream).map(|d| d.min_interframe_delay_ms()), Some(150.0));
}
