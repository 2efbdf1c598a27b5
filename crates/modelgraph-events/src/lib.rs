use crossbeam_channel::{Receiver, Sender, unbounded};
use modelgraph_core::{DocumentId, ElementId, ElementRecord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub mod surface;
pub mod telemetry;

pub use surface::{Nonce, PendingResponse, SurfaceBridge, SurfaceError, SurfaceRequest, SurfaceResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeTopic {
    Created,
    Updated,
    Removed,
    UndoRedo,
}

impl ChangeTopic {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeTopic::Created => "created",
            ChangeTopic::Updated => "updated",
            ChangeTopic::Removed => "removed",
            ChangeTopic::UndoRedo => "undo-redo",
        }
    }
}

impl fmt::Display for ChangeTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form options forwarded to subscribers untouched.
pub type EventOptions = Map<String, Value>;

/// Payload of `created` and `updated`.
///
/// `node` is a snapshot taken when the event fired. Consumers that need the live element later
/// look it up again by `node.id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementChanged {
    pub document_id: DocumentId,
    pub node: ElementRecord,
    #[serde(default)]
    pub options: EventOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRemoved {
    pub document_id: DocumentId,
    pub node_id: ElementId,
    #[serde(default)]
    pub options: EventOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryDirection {
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRedoChanged {
    pub document_id: DocumentId,
    pub direction: HistoryDirection,
    pub description: String,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum ChangeEvent {
    Created(ElementChanged),
    Updated(ElementChanged),
    Removed(ElementRemoved),
    UndoRedo(UndoRedoChanged),
}

impl ChangeEvent {
    pub fn topic(&self) -> ChangeTopic {
        match self {
            ChangeEvent::Created(_) => ChangeTopic::Created,
            ChangeEvent::Updated(_) => ChangeTopic::Updated,
            ChangeEvent::Removed(_) => ChangeTopic::Removed,
            ChangeEvent::UndoRedo(_) => ChangeTopic::UndoRedo,
        }
    }

    pub fn document_id(&self) -> DocumentId {
        match self {
            ChangeEvent::Created(inner) | ChangeEvent::Updated(inner) => inner.document_id,
            ChangeEvent::Removed(inner) => inner.document_id,
            ChangeEvent::UndoRedo(inner) => inner.document_id,
        }
    }

    /// Id of the element the event is about, if any.
    pub fn element_id(&self) -> Option<ElementId> {
        match self {
            ChangeEvent::Created(inner) | ChangeEvent::Updated(inner) => Some(inner.node.id),
            ChangeEvent::Removed(inner) => Some(inner.node_id),
            ChangeEvent::UndoRedo(_) => None,
        }
    }
}

/// Trait for components that respond to change events.
pub trait EventListener {
    fn handle_event(&mut self, event: &ChangeEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A subscribed handler and the events waiting for it while it is already running.
struct HandlerSlot {
    handler: Mutex<Box<dyn FnMut(&ChangeEvent) + Send>>,
    backlog: Mutex<VecDeque<ChangeEvent>>,
}

impl HandlerSlot {
    /// Queue `event` and run the handler over the backlog unless it is busy; a busy handler
    /// drains the backlog itself once its current call returns.
    fn deliver(&self, event: &ChangeEvent) {
        self.backlog.lock().push_back(event.clone());
        loop {
            let Some(mut handler) = self.handler.try_lock() else {
                return;
            };
            loop {
                let next = self.backlog.lock().pop_front();
                match next {
                    Some(next) => (&mut **handler)(&next),
                    None => break,
                }
            }
            drop(handler);
            if self.backlog.lock().is_empty() {
                return;
            }
        }
    }
}

type Handler = Arc<HandlerSlot>;

struct Subscription {
    id: SubscriptionId,
    topic: Option<ChangeTopic>,
    handler: Handler,
}

struct ChannelSubscription {
    topic: Option<ChangeTopic>,
    tx: Sender<ChangeEvent>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    handlers: Vec<Subscription>,
    channels: Vec<ChannelSubscription>,
}

/// In-process publish/subscribe fan-out of change events.
///
/// Delivery is synchronous: `publish` returns after every current handler ran and every channel
/// subscriber was sent the event. Nothing is retained for subscribers that attach later.
#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one topic.
    pub fn subscribe<F>(&self, topic: ChangeTopic, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.register(Some(topic), handler)
    }

    /// Register `handler` for every topic.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.register(None, handler)
    }

    pub fn subscribe_listener<L>(&self, topic: Option<ChangeTopic>, mut listener: L) -> SubscriptionId
    where
        L: EventListener + Send + 'static,
    {
        self.register(topic, move |event: &ChangeEvent| listener.handle_event(event))
    }

    /// Channel subscription for consumers that drain events on their own loop.
    pub fn channel(&self, topic: Option<ChangeTopic>) -> Receiver<ChangeEvent> {
        let (tx, rx) = unbounded();
        self.inner.lock().channels.push(ChannelSubscription { topic, tx });
        rx
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|subscription| subscription.id != id);
        inner.handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.handlers.len() + inner.channels.len()
    }

    /// Deliver `event` to every matching subscriber. Returns how many received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let topic = event.topic();
        let mut delivered = 0;
        let handlers: Vec<Handler> = {
            let mut inner = self.inner.lock();
            inner.channels.retain(|channel| {
                if !matches_topic(channel.topic, topic) {
                    return true;
                }
                let sent = channel.tx.send(event.clone()).is_ok();
                if sent {
                    delivered += 1;
                }
                sent
            });
            inner
                .handlers
                .iter()
                .filter(|subscription| matches_topic(subscription.topic, topic))
                .map(|subscription| Arc::clone(&subscription.handler))
                .collect()
        };

        // Handlers run outside the bus lock so they may publish follow-up events. A handler that
        // publishes to itself gets the new event after its current call returns.
        for handler in handlers {
            handler.deliver(&event);
            delivered += 1;
        }
        debug!(%topic, delivered, "change event published");
        delivered
    }

    fn register<F>(&self, topic: Option<ChangeTopic>, handler: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        let handler: Handler = Arc::new(HandlerSlot {
            handler: Mutex::new(Box::new(handler)),
            backlog: Mutex::default(),
        });
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.handlers.push(Subscription { id, topic, handler });
        id
    }
}

fn matches_topic(filter: Option<ChangeTopic>, topic: ChangeTopic) -> bool {
    filter.is_none_or(|wanted| wanted == topic)
}
