use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Visibility of the surface a stream is rendered into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Emitted once per accepted transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityChange {
    pub from: Visibility,
    pub to: Visibility,
    pub at_ms: f64,
}

/// Point-in-time copy of the gate's two timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisibilityRecord {
    pub last_hidden_at_ms: f64,
    pub last_visible_at_ms: f64,
}

impl VisibilityRecord {
    /// True when a frame observed at `since_ms` has been on a visible surface
    /// ever since: the surface is currently visible and neither transition
    /// happened after that observation.
    pub fn visible_since(&self, since_ms: f64) -> bool {
        self.last_visible_at_ms >= self.last_hidden_at_ms
            && since_ms > self.last_visible_at_ms
            && since_ms > self.last_hidden_at_ms
    }
}

/// Tracks the latest hidden/visible transition times of the viewing surface.
///
/// Each timestamp is stored as the bit pattern of an `f64` in an atomic, so
/// one writer (the visibility source) and any number of detectors can share
/// the gate behind an `Arc` without locking.
#[derive(Debug)]
pub struct VisibilityGate {
    hidden: AtomicBool,
    last_hidden_at: AtomicU64,
    last_visible_at: AtomicU64,
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityGate {
    /// Starts visible, both timestamps at zero.
    pub fn new() -> Self {
        Self {
            hidden: AtomicBool::new(false),
            last_hidden_at: AtomicU64::new(0f64.to_bits()),
            last_visible_at: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn current(&self) -> Visibility {
        if self.hidden.load(Ordering::Acquire) {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    pub fn last_hidden_at_ms(&self) -> f64 {
        f64::from_bits(self.last_hidden_at.load(Ordering::Acquire))
    }

    pub fn last_visible_at_ms(&self) -> f64 {
        f64::from_bits(self.last_visible_at.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> VisibilityRecord {
        VisibilityRecord {
            last_hidden_at_ms: self.last_hidden_at_ms(),
            last_visible_at_ms: self.last_visible_at_ms(),
        }
    }

    /// Applies a visibility report. Returns None if the surface was already
    /// in `to`; repeats are not transitions and leave the timestamps alone.
    pub fn transition(&self, to: Visibility, now_ms: f64) -> Option<VisibilityChange> {
        let was_hidden = self.hidden.swap(to == Visibility::Hidden, Ordering::AcqRel);
        let from = if was_hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        };

        if from == to {
            return None;
        }

        match to {
            Visibility::Hidden => self.last_hidden_at.store(now_ms.to_bits(), Ordering::Release),
            Visibility::Visible => self.last_visible_at.store(now_ms.to_bits(), Ordering::Release),
        }
        debug!("surface is now {:?} at {:.1}ms", to, now_ms);

        Some(VisibilityChange { from, to, at_ms: now_ms })
    }
}
