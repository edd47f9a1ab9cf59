//! In-process notification bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationBus`] fans out [`Notice`]s to every subscriber. It is meant
//! to be shared via `Arc<NotificationBus>` across the application.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Loading,
    Success,
    Error,
}

/// A single toast.
///
/// Notices sharing an `id` belong to the same operation: a `Loading` notice
/// is later superseded by the `Success` or `Error` notice with its id.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// NotificationBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out notification bus.
pub struct NotificationBus {
    sender: broadcast::Sender<Notice>,
    next_id: AtomicU64,
}

impl NotificationBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed notices are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to all notices published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Publish a `Loading` notice and return a handle that settles it.
    pub fn loading(&self, message: impl Into<String>) -> NoticeHandle<'_> {
        let id = self.allocate_id();
        self.publish(id, NoticeKind::Loading, message.into());
        NoticeHandle { bus: self, id }
    }

    /// Publish a standalone success notice.
    pub fn success(&self, message: impl Into<String>) {
        let id = self.allocate_id();
        self.publish(id, NoticeKind::Success, message.into());
    }

    /// Publish a standalone error notice.
    pub fn error(&self, message: impl Into<String>) {
        let id = self.allocate_id();
        self.publish(id, NoticeKind::Error, message.into());
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn publish(&self, id: u64, kind: NoticeKind, message: String) {
        tracing::debug!(id, ?kind, %message, "Notice");
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(Notice {
            id,
            kind,
            message,
            timestamp: Utc::now(),
        });
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Pending `Loading` notice. Consumed by exactly one of
/// [`success`](Self::success) or [`failure`](Self::failure).
#[must_use = "a loading notice should be settled with success or failure"]
pub struct NoticeHandle<'a> {
    bus: &'a NotificationBus,
    id: u64,
}

impl NoticeHandle<'_> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn success(self, message: impl Into<String>) {
        self.bus.publish(self.id, NoticeKind::Success, message.into());
    }

    pub fn failure(self, message: impl Into<String>) {
        self.bus.publish(self.id, NoticeKind::Error, message.into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
