//! # Event Bus System
//!
//! Provides an event-driven architecture for the sync engine using `tokio::sync::broadcast`.
//! This module enables decoupled communication between engine modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │   Matcher   ├──────────────>│           │
//! └─────────────┘               │           │
//!                               │ EventBus  │
//! ┌─────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │   Runner    ├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └─────────────┘               │           │                  └────────────┘
//!                               │           │
//!                               │           │     subscribe    ┌────────────┐
//!                               │           ├─────────────────>│ Subscriber │
//!                               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, EngineEvent, PassEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = EngineEvent::Pass(PassEvent::Started {
//!     job_id: "job-123".to_string(),
//!     kind: "progress_sync".to_string(),
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, EngineEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match subscriber.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => {
//!                 eprintln!("Missed {} events", n);
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a signal to exit.
//!
//! ## Thread Safety
//!
//! The event bus is fully thread-safe (`Send + Sync`). It can be safely shared across
//! async tasks using `Arc` or by cloning the bus itself.

use platform_traits::PlatformKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of events.
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Engine Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// Reconciliation pass lifecycle events
    Pass(PassEvent),
    /// Book matching events
    Match(MatchEvent),
    /// Secondary platform events
    Platform(PlatformEvent),
}

impl EngineEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            EngineEvent::Pass(e) => e.description(),
            EngineEvent::Match(e) => e.description(),
            EngineEvent::Platform(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            EngineEvent::Pass(PassEvent::Failed { .. }) => EventSeverity::Error,
            EngineEvent::Pass(PassEvent::Cancelled { .. }) => EventSeverity::Warning,
            EngineEvent::Platform(PlatformEvent::UpdateFailed { .. }) => EventSeverity::Warning,
            EngineEvent::Platform(PlatformEvent::ConnectionChecked { healthy: false, .. }) => {
                EventSeverity::Warning
            }
            EngineEvent::Pass(PassEvent::Started { .. }) => EventSeverity::Info,
            EngineEvent::Pass(PassEvent::Completed { .. }) => EventSeverity::Info,
            EngineEvent::Match(MatchEvent::Resolved { .. }) => EventSeverity::Info,
            EngineEvent::Platform(PlatformEvent::ConnectionChecked { healthy: true, .. }) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Pass Events
// ============================================================================

/// Events describing the lifecycle of a reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PassEvent {
    /// A pass was started and its job record created.
    Started {
        /// Unique identifier for this job.
        job_id: String,
        /// The kind of pass ("matching" or "progress_sync").
        kind: String,
    },
    /// Incremental progress update during a pass.
    Progress {
        /// The job ID.
        job_id: String,
        /// Number of books processed so far.
        books_processed: u64,
        /// Total books to process, once known.
        total_books: Option<u64>,
        /// Current phase (e.g., "Listing libraries", "Syncing progress").
        phase: String,
    },
    /// A pass finished and the job was marked completed.
    Completed {
        /// The job ID.
        job_id: String,
        /// Total books processed.
        books_processed: u64,
        /// Number of books synced to at least one platform.
        synced: u64,
        /// Number of books that failed on every platform.
        failed: u64,
        /// Duration of the pass in seconds.
        duration_secs: u64,
    },
    /// A pass aborted and the job was marked failed.
    Failed {
        /// The job ID.
        job_id: String,
        /// Human-readable error message.
        message: String,
        /// Number of books processed before the failure.
        books_processed: u64,
    },
    /// A pass was cancelled at a book boundary.
    Cancelled {
        /// The job ID.
        job_id: String,
        /// Number of books processed before cancellation.
        books_processed: u64,
    },
}

impl PassEvent {
    fn description(&self) -> &str {
        match self {
            PassEvent::Started { .. } => "Pass started",
            PassEvent::Progress { .. } => "Pass in progress",
            PassEvent::Completed { .. } => "Pass completed successfully",
            PassEvent::Failed { .. } => "Pass failed",
            PassEvent::Cancelled { .. } => "Pass cancelled",
        }
    }
}

// ============================================================================
// Match Events
// ============================================================================

/// Events emitted while resolving canonical books against secondary platforms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum MatchEvent {
    /// Incremental progress update during a matching run.
    Progress {
        /// Number of books examined so far.
        current: u64,
        /// Total books in this run.
        total: u64,
    },
    /// A book was matched to a platform edition and a mapping was stored.
    Resolved {
        /// The canonical book ID.
        book_id: String,
        /// Book title, for display.
        title: String,
        /// The platform the book was matched on.
        platform: PlatformKind,
        /// Match confidence in `[0.0, 1.0]`.
        confidence: f64,
    },
    /// No platform produced an acceptable candidate for a book.
    Unmatched {
        /// The canonical book ID.
        book_id: String,
        /// Book title, for display.
        title: String,
    },
}

impl MatchEvent {
    fn description(&self) -> &str {
        match self {
            MatchEvent::Progress { .. } => "Matching in progress",
            MatchEvent::Resolved { .. } => "Book matched",
            MatchEvent::Unmatched { .. } => "Book left unmatched",
        }
    }
}

// ============================================================================
// Platform Events
// ============================================================================

/// Events describing interactions with secondary platforms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlatformEvent {
    /// A connection validation check finished for a platform.
    ConnectionChecked {
        /// The platform that was checked.
        platform: PlatformKind,
        /// Whether the platform answered with valid credentials.
        healthy: bool,
    },
    /// An operation was skipped because a platform does not support it.
    CapabilitySkipped {
        /// The platform lacking the capability.
        platform: PlatformKind,
        /// The capability that was skipped (e.g., "ISBN lookup").
        capability: String,
    },
    /// A progress update failed on one platform during a sync pass.
    UpdateFailed {
        /// The platform that rejected the update.
        platform: PlatformKind,
        /// The canonical book ID being synced.
        book_id: String,
        /// Human-readable error message.
        message: String,
    },
}

impl PlatformEvent {
    fn description(&self) -> &str {
        match self {
            PlatformEvent::ConnectionChecked { .. } => "Platform connection checked",
            PlatformEvent::CapabilitySkipped { .. } => "Platform capability skipped",
            PlatformEvent::UpdateFailed { .. } => "Platform update failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EngineEvent, PassEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
///
/// // Subscribe to events
/// let mut subscriber1 = event_bus.subscribe();
/// let mut subscriber2 = event_bus.subscribe();
///
/// // Emit an event
/// let event = EngineEvent::Pass(PassEvent::Started {
///     job_id: "job-123".to_string(),
///     kind: "matching".to_string(),
/// });
/// event_bus.emit(event).ok();
///
/// // Both subscribers receive the event
/// # tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, EngineEvent, MatchEvent};
    ///
    /// let event_bus = EventBus::new(100);
    /// let event = EngineEvent::Match(MatchEvent::Progress { current: 3, total: 10 });
    ///
    /// match event_bus.emit(event) {
    ///     Ok(n) => println!("Event sent to {} subscribers", n),
    ///     Err(_) => println!("No active subscribers"),
    /// }
    /// ```
    pub fn emit(&self, event: EngineEvent) -> Result<usize, SendError<EngineEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&EngineEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// This provides a more ergonomic API for consuming events with optional filtering
/// by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, EngineEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for pass events only
/// let mut pass_stream = stream.filter(|event| {
///     matches!(event, EngineEvent::Pass(_))
/// });
/// # }
/// ```
pub struct EventStream {
    receiver: Receiver<EngineEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<EngineEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EngineEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<EngineEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            // If no filter, return immediately
            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<EngineEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
