//! Notification events and their delivery.
//!
//! Producers hold a [`NotificationHandle`] and emit without waiting for
//! delivery; a [`NotificationDispatcher`] task forwards each event to the
//! configured [`NotificationAgent`]s.

mod dispatcher;
mod events;
mod handle;

pub use dispatcher::*;
pub use events::*;
pub use handle::*;
