// Host layer - adapters for the form platform that owns the submissions.

#[path = "save_event.rs"]
pub mod save_event;

pub use save_event::{HostContext, SaveEvent};
