//! Pub/Sub event bus for the session thread.
//!
//! Architecture:
//! - Components subscribe to event types with callbacks (immediate invocation)
//! - emit() invokes callbacks immediately AND queues for deferred processing
//! - poll() returns queued events for batch processing by the host loop
//!
//! Callback order: FIFO within the same event type. Cross-type order is the
//! emit order.
//!
//! Everything runs on one thread, so shared state is `Rc<RefCell<..>>`, not
//! locks. Callbacks may emit further events: the subscriber list is
//! snapshotted before invocation.

use log::warn;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events.
pub trait Event: Any {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Rc<dyn Fn(&dyn Any)>;

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

type Subscribers = Rc<RefCell<HashMap<TypeId, Vec<Callback>>>>;
type Queue = Rc<RefCell<VecDeque<BoxedEvent>>>;

/// Pub/Sub event bus with deferred processing.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Subscribers,
    queue: Queue,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type E. Invoked synchronously on emit().
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + 'static,
    {
        let wrapped: Callback = Rc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.subscribers
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    /// Emit event: invoke callbacks immediately AND queue for poll().
    pub fn emit<E: Event>(&self, event: E) {
        dispatch(&self.subscribers, &self.queue, event);
    }

    /// Take all queued events.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Emitter handle sharing this bus.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            inner: Some((Rc::clone(&self.subscribers), Rc::clone(&self.queue))),
        }
    }

    pub fn unsubscribe_all<E: Event>(&self) {
        self.subscribers.borrow_mut().remove(&TypeId::of::<E>());
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.subscribers
            .borrow()
            .get(&TypeId::of::<E>())
            .is_some_and(|v| !v.is_empty())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.borrow().len()
    }
}

fn dispatch<E: Event>(subscribers: &Subscribers, queue: &Queue, event: E) {
    // Snapshot so callbacks can subscribe/emit without a borrow conflict
    let callbacks: Vec<Callback> = subscribers
        .borrow()
        .get(&TypeId::of::<E>())
        .cloned()
        .unwrap_or_default();
    for cb in &callbacks {
        cb(&event);
    }

    let mut queue = queue.borrow_mut();
    if queue.len() >= MAX_QUEUE_SIZE {
        let evict_count = queue.len() / 2;
        warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
        queue.drain(0..evict_count);
    }
    queue.push_back(Box::new(event));
}

/// Emitter handle given to components (controller, registry, pipeline).
///
/// `EventEmitter::dummy()` drops everything; components built outside a
/// session use it.
#[derive(Clone, Default)]
pub struct EventEmitter {
    inner: Option<(Subscribers, Queue)>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("connected", &self.inner.is_some())
            .finish()
    }
}

impl EventEmitter {
    pub fn dummy() -> Self {
        Self { inner: None }
    }

    pub fn emit<E: Event>(&self, event: E) {
        if let Some((subscribers, queue)) = &self.inner {
            dispatch(subscribers, queue, event);
        }
    }
}

/// Downcast a polled event.
///
/// Deref to `dyn Event` first: the blanket impl also covers
/// `Box<dyn Event>`, whose `as_any` would hand back the box itself.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
