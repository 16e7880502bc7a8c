//! Playlist synchronization

pub mod conflict;
pub mod engine;
pub mod layout;
pub mod merge;
pub mod report;
pub mod state;
pub mod store;
#[cfg(test)]
pub mod testing;

pub use engine::{SyncEngine, SyncMode, SyncOptions};
pub use layout::{PlaylistLayout, TrackBase};
pub use report::{Action, SyncReport};
pub use state::{SyncState, resolve_state_path};
pub use store::{NodeKind, PlaylistId, PlaylistStore, RemoteNode, TrackId};
