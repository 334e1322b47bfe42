//! Typed events emitted at stage boundaries.
//!
//! The reconciler reports progress and failures as events against the
//! Asset being reconciled. The [`EventRecorder`] seam keeps the core
//! independent of the outer plane's event transport: production wires in
//! [`LogRecorder`]; tests collect events with [`MemoryRecorder`].

use std::sync::Mutex;

use crate::asset::AssetInstance;
use crate::status::AssetReason;

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Expected stage progress.
    Normal,
    /// A failure or back-off.
    Warning,
}

impl EventType {
    /// Returns the conventional string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

/// A single recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Severity.
    pub event_type: EventType,
    /// The stage reason the event reports.
    pub reason: AssetReason,
    /// Rendered message (same template as the status message).
    pub message: String,
}

/// Sink for reconcile events.
///
/// Implementations must be safe for concurrent use; the reconciler may be
/// driving many Assets at once.
pub trait EventRecorder: Send + Sync {
    /// Records an event against the given Asset.
    fn record(
        &self,
        instance: &AssetInstance,
        event_type: EventType,
        reason: AssetReason,
        message: &str,
    );
}

/// Event recorder that emits structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecorder;

impl EventRecorder for LogRecorder {
    fn record(
        &self,
        instance: &AssetInstance,
        event_type: EventType,
        reason: AssetReason,
        message: &str,
    ) {
        match event_type {
            EventType::Normal => tracing::info!(
                namespace = %instance.namespace,
                name = %instance.name,
                reason = %reason,
                detail = message,
                "asset event"
            ),
            EventType::Warning => tracing::warn!(
                namespace = %instance.namespace,
                name = %instance.name,
                reason = %reason,
                detail = message,
                "asset event"
            ),
        }
    }
}

/// In-memory event recorder for tests.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryRecorder {
    /// Creates a new empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Returns the recorded reasons, in emission order.
    #[must_use]
    pub fn reasons(&self) -> Vec<AssetReason> {
        self.events().into_iter().map(|e| e.reason).collect()
    }

    /// Drains the recorder, returning all events in emission order.
    pub fn drain(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(
        &self,
        _instance: &AssetInstance,
        event_type: EventType,
        reason: AssetReason,
        message: &str,
    ) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                event_type,
                reason,
                message: message.to_string(),
            });
        }
    }
}
