//! Event propagation
//!
//! A [`Source`] hands [`GraphEvent`]s to the [`Sink`]s subscribed to it. A
//! [`Pipe`] is both, so pipelines of graphs, filters and consumers are built
//! by subscribing one to the next. Delivery is synchronous: `send` returns
//! once every sink has seen the event and everything it triggered.

pub mod graph;
pub mod pipe;
pub mod replay;
pub mod sinks;
pub mod sync;

pub use graph::{synchronize, Graph};
pub use pipe::{AttributePipe, AttributePredicate, PipeBase};
pub use replay::replay;
pub use sinks::{ChannelSink, EventLog, NullSink, StepCounter};
pub use sync::{Dispatcher, SinkTime};

use crate::graph::event::{EventKind, GraphEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Receiver of graph events
pub trait Sink: Send + Sync {
    fn receive(&self, event: &GraphEvent);
}

/// Which events a sink was subscribed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    All,
    /// Structural events: nodes, edges, clear, steps
    Elements,
    /// Graph, node and edge attribute events
    Attributes,
}

impl Subscription {
    pub fn wants(self, kind: &EventKind) -> bool {
        match self {
            Subscription::All => true,
            Subscription::Elements => kind.is_element_event(),
            Subscription::Attributes => kind.is_attribute_event(),
        }
    }
}

/// Emitter of graph events
///
/// Implementors only expose their [`SourceBase`]; sink registration is
/// provided.
pub trait Source {
    fn source_base(&self) -> &SourceBase;

    fn source_id(&self) -> &str {
        self.source_base().source_id()
    }

    fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.source_base().subscribe(sink, Subscription::All);
    }

    fn add_element_sink(&self, sink: Arc<dyn Sink>) {
        self.source_base().subscribe(sink, Subscription::Elements);
    }

    fn add_attribute_sink(&self, sink: Arc<dyn Sink>) {
        self.source_base().subscribe(sink, Subscription::Attributes);
    }

    /// Drop every subscription of `sink`
    fn remove_sink(&self, sink: &Arc<dyn Sink>) {
        self.source_base().unsubscribe(sink);
    }

    fn clear_sinks(&self) {
        self.source_base().clear();
    }
}

/// Something that forwards what it receives, possibly filtered
pub trait Pipe: Source + Sink {}

impl<T: Source + Sink> Pipe for T {}

struct DispatchState {
    queue: VecDeque<GraphEvent>,
    draining: bool,
}

/// Owns the `draining` flag for one delivery loop and drops it on every
/// exit, a panicking sink included.
struct DrainScope<'a> {
    dispatch: &'a Mutex<DispatchState>,
    finished: bool,
}

impl DrainScope<'_> {
    /// Next queued event; an empty queue ends the scope under the same lock
    fn next(&mut self) -> Option<GraphEvent> {
        let mut state = self.dispatch.lock();
        let next = state.queue.pop_front();
        if next.is_none() {
            state.draining = false;
            self.finished = true;
        }
        next
    }
}

impl Drop for DrainScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.dispatch.lock().draining = false;
        }
    }
}

/// Sink registry and delivery loop shared by every source.
///
/// Events sent while a delivery is in progress (a sink reacting by sending
/// through the same source) are queued and delivered in order by the call
/// already draining, so each sink sees events in send order.
pub struct SourceBase {
    source_id: String,
    sinks: RwLock<Vec<(Arc<dyn Sink>, Subscription)>>,
    dispatch: Mutex<DispatchState>,
}

impl fmt::Debug for SourceBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBase")
            .field("source_id", &self.source_id)
            .field("sinks", &self.sinks.read().len())
            .finish()
    }
}

fn same_sink(a: &Arc<dyn Sink>, b: &Arc<dyn Sink>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl SourceBase {
    pub fn new(source_id: impl Into<String>) -> Self {
        SourceBase {
            source_id: source_id.into(),
            sinks: RwLock::new(Vec::new()),
            dispatch: Mutex::new(DispatchState {
                queue: VecDeque::new(),
                draining: false,
            }),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn subscribe(&self, sink: Arc<dyn Sink>, subscription: Subscription) {
        self.sinks.write().push((sink, subscription));
    }

    pub fn unsubscribe(&self, sink: &Arc<dyn Sink>) {
        self.sinks.write().retain(|(s, _)| !same_sink(s, sink));
    }

    pub fn clear(&self) {
        self.sinks.write().clear();
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Deliver an event to every interested sink
    pub fn send(&self, event: GraphEvent) {
        self.enqueue(std::iter::once(event));
        self.drain();
    }

    /// Queue events without delivering them. Lets a caller fix the delivery
    /// order while it still holds its own lock.
    pub(crate) fn enqueue(&self, events: impl IntoIterator<Item = GraphEvent>) {
        self.dispatch.lock().queue.extend(events);
    }

    /// Deliver queued events unless another call is already doing so
    pub(crate) fn drain(&self) {
        {
            let mut state = self.dispatch.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        let mut scope = DrainScope {
            dispatch: &self.dispatch,
            finished: false,
        };
        while let Some(next) = scope.next() {
            // snapshot so sinks may (un)subscribe while being called
            let targets: Vec<Arc<dyn Sink>> = self
                .sinks
                .read()
                .iter()
                .filter(|(_, subscription)| subscription.wants(&next.kind))
                .map(|(sink, _)| Arc::clone(sink))
                .collect();
            for sink in targets {
                sink.receive(&next);
            }
        }
    }

    pub fn send_all(&self, events: impl IntoIterator<Item = GraphEvent>) {
        self.enqueue(events);
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::sinks::EventLog;
    use std::panic::AssertUnwindSafe;

    fn node_added(time: u64, id: &str) -> GraphEvent {
        GraphEvent::new("src", time, EventKind::NodeAdded { node_id: id.into() })
    }

    fn attr_added(time: u64) -> GraphEvent {
        GraphEvent::new(
            "src",
            time,
            EventKind::GraphAttributeAdded {
                key: "k".into(),
                value: 1i64.into(),
            },
        )
    }

    #[test]
    fn test_subscriptions_filter_by_category() {
        let base = SourceBase::new("src");
        let all = Arc::new(EventLog::new());
        let elements = Arc::new(EventLog::new());
        let attributes = Arc::new(EventLog::new());
        base.subscribe(all.clone(), Subscription::All);
        base.subscribe(elements.clone(), Subscription::Elements);
        base.subscribe(attributes.clone(), Subscription::Attributes);

        base.send(node_added(1, "a"));
        base.send(attr_added(2));

        assert_eq!(all.len(), 2);
        assert_eq!(elements.len(), 1);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.events()[0].time_id, 2);
    }

    #[test]
    fn test_remove_sink() {
        let base = SourceBase::new("src");
        let log = Arc::new(EventLog::new());
        let as_sink: Arc<dyn Sink> = log.clone();
        base.subscribe(as_sink.clone(), Subscription::All);
        base.subscribe(as_sink.clone(), Subscription::Elements);
        assert_eq!(base.sink_count(), 2);

        base.unsubscribe(&as_sink);
        base.send(node_added(1, "a"));
        assert!(log.is_empty());
    }

    struct Resender {
        base: Arc<SourceBase>,
        log: EventLog,
    }

    impl Sink for Resender {
        fn receive(&self, event: &GraphEvent) {
            self.log.receive(event);
            if event.time_id == 1 {
                self.base.send(node_added(2, "b"));
            }
        }
    }

    struct Exploding;

    impl Sink for Exploding {
        fn receive(&self, event: &GraphEvent) {
            if event.kind == (EventKind::NodeAdded { node_id: "boom".into() }) {
                panic!("sink failure");
            }
        }
    }

    #[test]
    fn test_panicking_sink_does_not_stall_delivery() {
        let base = SourceBase::new("src");
        let exploding: Arc<dyn Sink> = Arc::new(Exploding);
        base.subscribe(exploding.clone(), Subscription::All);

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| base.send(node_added(1, "boom"))));
        assert!(result.is_err());

        base.unsubscribe(&exploding);
        let log = Arc::new(EventLog::new());
        base.subscribe(log.clone(), Subscription::All);
        base.send(node_added(2, "later"));

        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].time_id, 2);
    }

    #[test]
    fn test_reentrant_send_is_queued_in_order() {
        let base = Arc::new(SourceBase::new("src"));
        let resender = Arc::new(Resender {
            base: base.clone(),
            log: EventLog::new(),
        });
        let after = Arc::new(EventLog::new());
        base.subscribe(resender.clone(), Subscription::All);
        base.subscribe(after.clone(), Subscription::All);

        base.send(node_added(1, "a"));

        let times: Vec<u64> = after.events().iter().map(|e| e.time_id).collect();
        assert_eq!(times, vec![1, 2]);
        assert_eq!(resender.log.len(), 2);
    }
}
