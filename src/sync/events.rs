//! Form events and the subscription interface that delivers them

use chrono::NaiveDate;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

use crate::core::{Rate, RateSource};

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// Raw text of the USD field after an edit.
    UsdInput(String),
    /// Raw text of the bolívar field after an edit.
    VedInput(String),
    DateChanged(Option<NaiveDate>),
    SourceChanged(RateSource),
    /// A fetch completed and its rate was applied.
    RateUpdated(Rate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UsdInput,
    VedInput,
    DateChanged,
    SourceChanged,
    RateUpdated,
}

impl FormEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            FormEvent::UsdInput(_) => EventKind::UsdInput,
            FormEvent::VedInput(_) => EventKind::VedInput,
            FormEvent::DateChanged(_) => EventKind::DateChanged,
            FormEvent::SourceChanged(_) => EventKind::SourceChanged,
            FormEvent::RateUpdated(_) => EventKind::RateUpdated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&FormEvent) + Send + Sync>;

#[derive(Default)]
struct Subscriptions {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EventKind, Handler)>,
}

/// Routes events to the handlers registered for their kind.
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Arc<RwLock<Subscriptions>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&FormEvent) + Send + Sync + 'static,
    {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        subs.handlers.push((id, kind, Arc::new(handler)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.handlers.len();
        subs.handlers.retain(|(sub_id, _, _)| *sub_id != id);
        subs.handlers.len() != before
    }

    /// Calls every handler registered for the event's kind, in registration
    /// order, and returns how many ran.
    pub fn emit(&self, event: &FormEvent) -> usize {
        let kind = event.kind();
        // Handlers run without the lock held so they may emit or subscribe.
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| Arc::clone(h))
            .collect();

        trace!(?kind, handlers = handlers.len(), "Emitting form event");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }
}
