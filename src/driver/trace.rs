//! JSON-lines frame traces.
//!
//! ```text
//! {"kind":"frame","stream":"main","now_ms":1016.0,"metadata":{"presentation_time_ms":1012.4,"presented_frames":61}}
//! {"kind":"visibility","state":"hidden","at_ms":2040.0}
//! {"kind":"close","stream":"main"}
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::TraceError;
use crate::kernel::event::Event;
use crate::kernel::frame::{FrameMetadata, StreamId};
use crate::kernel::visibility::Visibility;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TraceRecord {
    Frame {
        stream: String,
        now_ms: f64,
        metadata: FrameMetadata,
    },
    Visibility {
        state: Visibility,
        at_ms: f64,
    },
    Close {
        stream: String,
    },
}

/// Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<TraceRecord>, TraceError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| TraceError::Parse { line: line_no, source })
}

/// Maps trace stream labels onto stable `StreamId`s.
#[derive(Debug, Default)]
pub struct TraceMapper {
    ids: HashMap<String, StreamId>,
}

impl TraceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_id(&self, label: &str) -> Option<StreamId> {
        self.ids.get(label).copied()
    }

    /// A label seen for the first time also yields its `StreamOpened`.
    pub fn to_events(&mut self, record: TraceRecord) -> Vec<Event> {
        match record {
            TraceRecord::Frame { stream, now_ms, metadata } => {
                let mut events = Vec::with_capacity(2);
                let id = match self.ids.get(&stream) {
                    Some(id) => *id,
                    None => {
                        let id = StreamId::new();
                        self.ids.insert(stream.clone(), id);
                        events.push(Event::StreamOpened {
                            stream: id,
                            label: Some(stream),
                        });
                        id
                    }
                };
                events.push(Event::Frame {
                    stream: id,
                    now_ms,
                    metadata,
                });
                events
            }
            TraceRecord::Visibility { state, at_ms } => vec![Event::Visibility { state, at_ms }],
            TraceRecord::Close { stream } => match self.ids.remove(&stream) {
                Some(id) => vec![Event::StreamClosed { stream: id }],
                None => {
                    debug!("close for unknown stream '{}'", stream);
                    Vec::new()
                }
            },
        }
    }
}

/// Reads a trace to the end and forwards it into the reactor channel.
/// Returns the number of records sent.
pub async fn pump<R>(reader: R, tx: mpsc::Sender<Event>) -> Result<usize, TraceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut mapper = TraceMapper::new();
    let mut line_no = 0;
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let Some(record) = parse_line(line_no, &line)? else {
            continue;
        };
        for event in mapper.to_events(record) {
            tx.send(event).await.map_err(|_| TraceError::ChannelClosed)?;
        }
        sent += 1;
    }

    Ok(sent)
}
