//! Echo suppression for graphs that are both event sources and sinks
//!
//! A [`SinkTime`] remembers, per origin graph, the newest logical time it has
//! accepted; anything not strictly newer is stale or an echo and is dropped.
//! The [`Dispatcher`] stamps a store's changes: local changes get a fresh
//! local time, while the change driven by a received event is re-emitted
//! under the received event's origin and time so that downstream graphs
//! recognise it.

use crate::graph::event::{ChangeKey, EventKind, GraphEvent};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Highest accepted time per source
#[derive(Debug, Clone, Default)]
pub struct SinkTime {
    times: FxHashMap<String, u64>,
}

impl SinkTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the event if it is the first from `source_id` or strictly newer
    /// than anything accepted from it so far.
    pub fn is_new_event(&mut self, source_id: &str, time_id: u64) -> bool {
        match self.times.get_mut(source_id) {
            Some(last) if time_id <= *last => false,
            Some(last) => {
                *last = time_id;
                true
            }
            None => {
                self.times.insert(source_id.to_string(), time_id);
                true
            }
        }
    }

    pub fn last_time(&self, source_id: &str) -> Option<u64> {
        self.times.get(source_id).copied()
    }

    pub fn forget(&mut self, source_id: &str) {
        self.times.remove(source_id);
    }
}

/// The received event currently being applied
#[derive(Debug)]
struct Applying {
    key: ChangeKey,
    source_id: String,
    time_id: u64,
    emitted: bool,
}

/// Stamps and queues the events of one store
#[derive(Debug)]
pub struct Dispatcher {
    source_id: String,
    time: u64,
    sink_time: SinkTime,
    applying: Option<Applying>,
    recording: bool,
    outbox: Vec<GraphEvent>,
}

impl Dispatcher {
    pub fn new(source_id: impl Into<String>) -> Self {
        Dispatcher {
            source_id: source_id.into(),
            time: 0,
            sink_time: SinkTime::new(),
            applying: None,
            recording: true,
            outbox: Vec::new(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Latest local time handed out
    pub fn current_time(&self) -> u64 {
        self.time
    }

    pub fn sink_time(&self) -> &SinkTime {
        &self.sink_time
    }

    /// Allocate the next local time. It is also recorded as seen, so the
    /// event coming back through a pipeline cycle is refused.
    pub fn new_event(&mut self) -> u64 {
        self.time += 1;
        self.sink_time.is_new_event(&self.source_id, self.time);
        self.time
    }

    /// Gate for received events
    pub fn accept(&mut self, source_id: &str, time_id: u64) -> bool {
        self.sink_time.is_new_event(source_id, time_id)
    }

    pub fn is_applying(&self) -> bool {
        self.applying.is_some()
    }

    pub(crate) fn begin_apply(&mut self, event: &GraphEvent) {
        self.applying = Some(Applying {
            key: event.kind.change_key(),
            source_id: event.source_id.clone(),
            time_id: event.time_id,
            emitted: false,
        });
    }

    pub(crate) fn end_apply(&mut self) {
        self.applying = None;
    }

    pub(crate) fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.outbox.clear();
        }
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.recording
    }

    /// Stamp and queue a change made by the store.
    ///
    /// The first change matching the event being applied keeps that event's
    /// origin and time; every other change (auto-created endpoints, edges
    /// detached by a node removal) is a new local event.
    pub(crate) fn emit(&mut self, kind: EventKind) {
        let remote = match self.applying.as_mut() {
            Some(applying) if !applying.emitted && applying.key == kind.change_key() => {
                applying.emitted = true;
                Some((applying.source_id.clone(), applying.time_id))
            }
            _ => None,
        };
        let (source_id, time_id) = match remote {
            Some(stamp) => stamp,
            None => (self.source_id.clone(), self.new_event()),
        };
        trace!(source = %source_id, time = time_id, event = kind.name(), "emit");
        if self.recording {
            self.outbox.push(GraphEvent {
                source_id,
                time_id,
                kind,
            });
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn pending(&self) -> &[GraphEvent] {
        &self.outbox
    }
}
