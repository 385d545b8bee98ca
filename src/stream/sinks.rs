//! Ready-made sinks

use super::Sink;
use crate::graph::event::{EventKind, GraphEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

/// Records every event it receives
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<GraphEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything received so far
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<GraphEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Number of received events for which `pred` holds
    pub fn count_where(&self, pred: impl Fn(&EventKind) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(&e.kind)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Sink for EventLog {
    fn receive(&self, event: &GraphEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Counts steps, remembers the last one and counts the events since it
#[derive(Debug, Default)]
pub struct StepCounter {
    steps: AtomicU64,
    in_step: AtomicU64,
    last: Mutex<Option<f64>>,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn last_step(&self) -> Option<f64> {
        *self.last.lock()
    }

    /// Events received since the last step began (or since creation)
    pub fn events_in_step(&self) -> u64 {
        self.in_step.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.steps.store(0, Ordering::Relaxed);
        self.in_step.store(0, Ordering::Relaxed);
        *self.last.lock() = None;
    }
}

impl Sink for StepCounter {
    fn receive(&self, event: &GraphEvent) {
        if let EventKind::StepBegins { step } = event.kind {
            self.steps.fetch_add(1, Ordering::Relaxed);
            self.in_step.store(0, Ordering::Relaxed);
            *self.last.lock() = Some(step);
        } else {
            self.in_step.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Forwards events into a tokio channel, for consumers running on a runtime
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<GraphEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<GraphEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelSink { sender }, receiver)
    }

    pub fn from_sender(sender: UnboundedSender<GraphEvent>) -> Self {
        ChannelSink { sender }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl Sink for ChannelSink {
    fn receive(&self, event: &GraphEvent) {
        if self.sender.send(event.clone()).is_err() {
            trace!(event = event.kind.name(), "channel closed, event dropped");
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn receive(&self, _event: &GraphEvent) {}
}
