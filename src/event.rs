// src/event.rs

//! Publish-on-change state containers and a domain event bus
//!
//! Stores keep their state in a [`Subject`], which holds the current value and
//! pushes a clone to every subscriber after each change. Cross-cutting
//! happenings (an order was placed, the session changed) go through the
//! [`EventBus`] so that unrelated components can observe them without the
//! stores knowing about each other.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::channel::mpsc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, ErrorKind, EventOperation, Result};
use crate::types::Metadata;

/// Base event trait that all events must implement
pub trait Event: Send + Sync + Debug {
    /// Get the event type identifier
    fn event_type(&self) -> &'static str;

    /// Get the event source
    fn source(&self) -> &str;

    /// Get event metadata
    fn metadata(&self) -> &Metadata;

    /// Get event as Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Get event timestamp
    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Event subscription filter
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Event types to match (empty means all)
    pub event_types: Vec<String>,
    /// Source patterns to match
    pub source_patterns: Vec<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    pub fn with_source_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.source_patterns.push(pattern.into());
        self
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &dyn Event) -> bool {
        if !self.event_types.is_empty()
            && !self.event_types.iter().any(|t| t == event.event_type())
        {
            return false;
        }

        if !self.source_patterns.is_empty() {
            let source = event.source();
            if !self
                .source_patterns
                .iter()
                .any(|pattern| pattern == "*" || source.contains(pattern.as_str()))
            {
                return false;
            }
        }

        true
    }
}

struct EventSubscription {
    id: Uuid,
    filter: EventFilter,
    sender: mpsc::UnboundedSender<Arc<dyn Event>>,
    created_at: DateTime<Utc>,
}

impl Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Event statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStats {
    pub total_published: u64,
    pub total_delivered: u64,
    pub events_by_type: HashMap<String, u64>,
    pub active_subscriptions: usize,
}

/// Synchronous fan-out bus for domain events
#[derive(Default)]
pub struct EventBus {
    subscriptions: DashMap<Uuid, EventSubscription>,
    stats: RwLock<EventStats>,
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to every matching subscriber
    pub fn publish<E: Event + 'static>(&self, event: E) {
        let event: Arc<dyn Event> = Arc::new(event);

        let mut delivered = 0u64;
        let mut closed = Vec::new();
        for entry in self.subscriptions.iter() {
            let subscription = entry.value();
            if !subscription.filter.matches(event.as_ref()) {
                continue;
            }
            match subscription.sender.unbounded_send(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(subscription.id),
            }
        }
        for id in closed {
            self.subscriptions.remove(&id);
        }

        let mut stats = self.stats.write();
        stats.total_published += 1;
        stats.total_delivered += delivered;
        *stats
            .events_by_type
            .entry(event.event_type().to_string())
            .or_insert(0) += 1;
        stats.active_subscriptions = self.subscriptions.len();

        tracing::trace!(
            "Published '{}' from {} to {} subscribers",
            event.event_type(),
            event.source(),
            delivered
        );
    }

    /// Subscribe to events with a filter
    pub fn subscribe(
        &self,
        filter: EventFilter,
    ) -> (Uuid, mpsc::UnboundedReceiver<Arc<dyn Event>>) {
        let (sender, receiver) = mpsc::unbounded::<Arc<dyn Event>>();
        let id = Uuid::new_v4();

        self.subscriptions.insert(
            id,
            EventSubscription {
                id,
                filter,
                sender,
                created_at: Utc::now(),
            },
        );
        self.stats.write().active_subscriptions = self.subscriptions.len();

        (id, receiver)
    }

    /// Unsubscribe from events
    pub fn unsubscribe(&self, subscription_id: Uuid) -> Result<()> {
        self.subscriptions.remove(&subscription_id).ok_or_else(|| {
            Error::new(
                ErrorKind::Event {
                    event_type: None,
                    subscriber_id: Some(subscription_id),
                    operation: EventOperation::Unsubscribe,
                },
                "Subscription not found",
            )
        })?;

        self.stats.write().active_subscriptions = self.subscriptions.len();
        tracing::debug!("Removed subscription: {}", subscription_id);

        Ok(())
    }

    pub fn stats(&self) -> EventStats {
        self.stats.read().clone()
    }
}

/// Current value plus change notifications.
///
/// `subscribe` hands out a receiver that first yields the current value and
/// then every value published afterwards.
pub struct Subject<T: Clone + Send + 'static> {
    value: RwLock<T>,
    watchers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone + Send + 'static> Subject<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: RwLock::new(initial),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrows the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replaces the value and notifies subscribers
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.notify();
    }

    /// Mutates in place and notifies subscribers
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value.write());
        self.notify();
        result
    }

    /// Re-publishes the current value without changing it
    pub fn notify(&self) {
        let snapshot = self.get();
        self.watchers
            .lock()
            .retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded();
        // The seed send cannot fail, the receiver is still held here.
        let _ = tx.unbounded_send(self.get());
        self.watchers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.watchers.lock().len()
    }
}

impl<T: Clone + Send + Default + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Debug + 'static> Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("value", &*self.value.read())
            .field("subscribers", &self.watchers.lock().len())
            .finish()
    }
}

/// Defines a serializable domain event with a `new` constructor
#[macro_export]
macro_rules! define_event {
    ($name:ident, $event_type:expr, $($field:ident: $type:ty),*) => {
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            pub timestamp: chrono::DateTime<chrono::Utc>,
            pub source: String,
            pub metadata: std::collections::HashMap<String, serde_json::Value>,
            $(pub $field: $type,)*
        }

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub fn new(source: impl Into<String>, $($field: $type),*) -> Self {
                Self {
                    timestamp: chrono::Utc::now(),
                    source: source.into(),
                    metadata: std::collections::HashMap::new(),
                    $($field,)*
                }
            }
        }

        impl $crate::event::Event for $name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn source(&self) -> &str {
                &self.source
            }

            fn metadata(&self) -> &$crate::types::Metadata {
                &self.metadata
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
                self.timestamp
            }
        }
    };
}
