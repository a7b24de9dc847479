//! Capabilities the aggregate consumes: identifier generation and event emission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::events::TournamentEvent;

/// Supplies unique identifiers for new tournaments, registrations and sync records
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` identifiers, useful for fixtures and demos
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Publishes domain events. Fire-and-forget from the aggregate's point of view.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: TournamentEvent);
}

impl<T: EventEmitter + ?Sized> EventEmitter for Arc<T> {
    fn emit(&self, event: TournamentEvent) {
        (**self).emit(event);
    }
}

/// Writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventEmitter;

impl EventEmitter for LogEventEmitter {
    fn emit(&self, event: TournamentEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!("{} {}", event.event_type(), json),
            Err(e) => log::error!("Failed to serialize {} event: {}", event.event_type(), e),
        }
    }
}

/// Keeps emitted events in memory in emission order
#[derive(Debug, Default)]
pub struct RecordingEventEmitter {
    events: Mutex<Vec<TournamentEvent>>,
}

impl RecordingEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TournamentEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<TournamentEvent> {
        self.lock().clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<TournamentEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl EventEmitter for RecordingEventEmitter {
    fn emit(&self, event: TournamentEvent) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::events::RegistrationConfirmed;
    use std::collections::HashSet;

    fn confirmed(id: &str) -> TournamentEvent {
        TournamentEvent::RegistrationConfirmed(RegistrationConfirmed {
            registration_id: id.to_string(),
            tournament_id: "t-1".to_string(),
            competitor_id: "alice".to_string(),
            is_duo: false,
        })
    }

    #[test]
    fn test_uuid_generator_is_unique() {
        let generator = UuidIdGenerator;
        let ids: HashSet<String> = (0..100).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_sequential_generator() {
        let generator = SequentialIdGenerator::new("reg");
        assert_eq!(generator.generate(), "reg-1");
        assert_eq!(generator.generate(), "reg-2");
    }

    #[test]
    fn test_recording_emitter_keeps_order_and_drains() {
        let emitter = RecordingEventEmitter::new();
        assert!(emitter.is_empty());

        emitter.emit(confirmed("reg-1"));
        emitter.emit(confirmed("reg-2"));
        assert_eq!(emitter.len(), 2);

        let drained = emitter.take();
        assert_eq!(drained[0].registration_id(), "reg-1");
        assert_eq!(drained[1].registration_id(), "reg-2");
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_shared_emitter_through_arc() {
        let recorder = Arc::new(RecordingEventEmitter::new());
        let emitter: Arc<dyn EventEmitter> = recorder.clone();
        emitter.emit(confirmed("reg-1"));
        LogEventEmitter.emit(confirmed("reg-2"));
        assert_eq!(recorder.events().len(), 1);
    }
}
