//! Event types for the PCAT event system
//!
//! Provides the catalog pipeline event definitions and the broadcast EventBus.

mod pipeline_types;

pub use pipeline_types::PipelineState;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Catalog pipeline events
///
/// Events are broadcast via EventBus and serialize with a `type` tag so a
/// presentation layer can forward them unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// Pipeline run started
    SessionStarted {
        /// Pipeline session UUID
        session_id: Uuid,
        /// Product image the catalog is generated from
        product_image_url: String,
        /// When the run started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pipeline state changed
    ///
    /// Triggers:
    /// - Presentation: update status text
    StateChanged {
        /// Pipeline session UUID
        session_id: Uuid,
        /// State before change
        old_state: PipelineState,
        /// State after change
        new_state: PipelineState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Generation request for one scene issued
    SceneStarted {
        /// Scene name (e.g. "kitchen")
        scene: String,
        /// Scene position in the catalog (grid row)
        scene_index: usize,
        /// Total number of scenes
        total_scenes: usize,
    },

    /// Generation request for one scene returned all its results
    SceneCompleted {
        /// Scene name
        scene: String,
        /// Scene position in the catalog (grid row)
        scene_index: usize,
        /// Result URLs in placement order
        urls: Vec<String>,
    },

    /// All tiles painted and the raster encoded
    CompositionCompleted {
        /// Composed raster width in pixels
        width: u32,
        /// Composed raster height in pixels
        height: u32,
    },

    /// Pipeline run finished successfully
    SessionCompleted {
        /// Pipeline session UUID
        session_id: Uuid,
        /// Run duration in milliseconds
        duration_ms: u64,
        /// When the run completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Pipeline run failed (including cancellation)
    SessionFailed {
        /// Pipeline session UUID
        session_id: Uuid,
        /// State the failure occurred in
        failed_in: PipelineState,
        /// Error message details
        error_message: String,
        /// When the run failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CatalogEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            CatalogEvent::SessionStarted { .. } => "SessionStarted",
            CatalogEvent::StateChanged { .. } => "StateChanged",
            CatalogEvent::SceneStarted { .. } => "SceneStarted",
            CatalogEvent::SceneCompleted { .. } => "SceneCompleted",
            CatalogEvent::CompositionCompleted { .. } => "CompositionCompleted",
            CatalogEvent::SessionCompleted { .. } => "SessionCompleted",
            CatalogEvent::SessionFailed { .. } => "SessionFailed",
        }
    }
}

/// Broadcast bus for catalog events
///
/// Cheap to clone; every clone sends into the same channel.
///
/// ```
/// use pcat_common::events::{CatalogEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CatalogEvent::CompositionCompleted { width: 1536, height: 1536 });
/// assert!(matches!(rx.try_recv(), Ok(CatalogEvent::CompositionCompleted { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
