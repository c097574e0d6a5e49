//! Typed publish/subscribe.
//!
//! One registry per event payload type, so a listener's signature is checked
//! when it is registered instead of when it is first called.

use tracing::error;

use crate::error::ListenerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifetime {
    Persistent,
    Once,
}

type Callback<E> = Box<dyn FnMut(&E) -> Result<(), ListenerError> + Send>;

struct Entry<E> {
    id: ListenerId,
    lifetime: Lifetime,
    callback: Callback<E>,
}

pub struct ListenerRegistry<E> {
    name: &'static str,
    entries: Vec<Entry<E>>,
    next_id: u64,
}

impl<E> ListenerRegistry<E> {
    /// `name` only shows up in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a listener that stays until `off`.
    pub fn on<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) -> Result<(), ListenerError> + Send + 'static,
    {
        self.push(Lifetime::Persistent, Box::new(listener))
    }

    /// Registers a listener that is removed right before its first call.
    pub fn once<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) -> Result<(), ListenerError> + Send + 'static,
    {
        self.push(Lifetime::Once, Box::new(listener))
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fans `event` out in registration order and stops at the first failure.
    /// One-shot listeners that were reached are gone either way.
    pub fn emit(&mut self, event: &E) -> Result<(), ListenerError> {
        let mut pending = self.detach_for_dispatch();
        let mut result = Ok(());
        let mut stopped_at = pending.len();

        for (idx, entry) in pending.iter_mut().enumerate() {
            if let Err(e) = (entry.callback)(event) {
                result = Err(e);
                stopped_at = idx + 1;
                break;
            }
        }

        // Entries after the failing one were never reached; keep their
        // one-shot registration alive.
        let (reached, unreached) = split_at(pending, stopped_at);
        self.reattach(reached, unreached);
        result
    }

    /// Fans `event` out to every listener. A failing listener is logged and
    /// the rest still run. Returns how many listeners failed.
    pub fn safe_emit(&mut self, event: &E) -> usize {
        let mut pending = self.detach_for_dispatch();
        let mut failures = 0;

        for entry in pending.iter_mut() {
            if let Err(e) = (entry.callback)(event) {
                failures += 1;
                error!("safe_emit {} listener {:?}: {}", self.name, entry.id, e);
            }
        }

        self.reattach(pending, Vec::new());
        failures
    }

    fn push(&mut self, lifetime: Lifetime, callback: Callback<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            lifetime,
            callback,
        });
        id
    }

    // Listeners registered during dispatch land in `self.entries` and are
    // not called for the event in flight.
    fn detach_for_dispatch(&mut self) -> Vec<Entry<E>> {
        std::mem::take(&mut self.entries)
    }

    fn reattach(&mut self, reached: Vec<Entry<E>>, unreached: Vec<Entry<E>>) {
        let added_during_dispatch = std::mem::take(&mut self.entries);
        self.entries = reached
            .into_iter()
            .filter(|e| e.lifetime == Lifetime::Persistent)
            .chain(unreached)
            .chain(added_during_dispatch)
            .collect();
    }
}

fn split_at<T>(mut v: Vec<T>, at: usize) -> (Vec<T>, Vec<T>) {
    let tail = v.split_off(at.min(v.len()));
    (v, tail)
}

impl<E> std::fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("name", &self.name)
            .field("listeners", &self.entries.len())
            .finish()
    }
}
