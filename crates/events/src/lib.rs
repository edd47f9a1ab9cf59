//! User-facing notification channel.
//!
//! Store operations and the project form report progress here instead of
//! returning it through callbacks. Front-ends subscribe and render each
//! [`Notice`] as a toast.

pub mod bus;

pub use bus::{Notice, NoticeHandle, NoticeKind, NotificationBus};
