//! Media, seasons, episodes and user requests.
//!
//! A media record carries two independent status tracks (standard and
//! alternate/4K). TV media additionally own seasons and episodes, each with
//! the same two tracks. Requests ask for a title on one track and, for TV,
//! for specific seasons.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteMediaStore;
pub use store::{MediaError, MediaStore, NewMedia, NewMediaRequest, RequestFilter};
pub use types::*;
