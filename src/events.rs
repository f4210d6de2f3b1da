//! Event system for form state changes
//!
//! Provides an event bus for notifying listeners about what the form
//! controller just did. Useful for:
//! - UI bindings (repaint a field, refresh a dropdown)
//! - Audit logging
//! - Test instrumentation

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::cascade::CascadeLevel;
use crate::form::FormMode;
use crate::model::Field;

/// Events emitted by the form controller
#[derive(Debug, Clone)]
pub enum FormEvent {
    /// One field of the record changed through a patch
    FieldChanged { field: Field },
    /// Findings changed for one field, or for the whole map on a full pass
    ErrorsChanged { field: Option<Field> },
    /// The form moved between idle, new and edit
    ModeChanged { mode: FormMode },
    /// An option list or selection changed at one cascade level
    CascadeChanged { level: CascadeLevel },
    /// The pending measure list changed
    MeasuresChanged { count: usize },
    /// A commit started or finished
    BusyChanged { busy: bool },
    /// Session catalogs finished loading
    CatalogsLoaded {
        process_types: usize,
        process_sources: usize,
        process_stages: usize,
        regions: usize,
    },
    /// A record and its children were written in one transaction
    Committed {
        header_id: i64,
        terrain_study_id: i64,
        measures: usize,
        opinion: bool,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &FormEvent);
}

/// Event bus for broadcasting form events
pub struct EventBus {
    sender: broadcast::Sender<FormEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: FormEvent) {
        trace!(event = ?event, "Emitting form event");
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &FormEvent) {
        match event {
            FormEvent::Committed {
                header_id,
                terrain_study_id,
                measures,
                opinion,
            } => {
                debug!(
                    header_id = %header_id,
                    terrain_study_id = %terrain_study_id,
                    measures = %measures,
                    opinion = %opinion,
                    "Record committed"
                );
            }
            FormEvent::ModeChanged { mode } => {
                debug!(mode = ?mode, "Form mode changed");
            }
            FormEvent::CascadeChanged { level } => {
                debug!(level = ?level, "Cascade level changed");
            }
            FormEvent::CatalogsLoaded {
                process_types,
                process_sources,
                process_stages,
                regions,
            } => {
                debug!(
                    process_types = %process_types,
                    process_sources = %process_sources,
                    process_stages = %process_stages,
                    regions = %regions,
                    "Catalogs loaded"
                );
            }
            _ => {
                trace!(event = ?event, "Form event");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.emit(FormEvent::FieldChanged { field: Field::Fmi });

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");

        match event {
            FormEvent::FieldChanged { field } => assert_eq!(field, Field::Fmi),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new();
        // Should not panic even with no subscribers
        bus.emit(FormEvent::BusyChanged { busy: true });
    }

    #[tokio::test]
    async fn test_logging_listener_stops_when_the_bus_closes() {
        let bus = Arc::new(EventBus::new());
        let handle = spawn_logging_listener(Arc::clone(&bus));
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(FormEvent::BusyChanged { busy: true });
        drop(bus);

        timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener should stop")
            .expect("listener task panicked");
    }
}
