//! Durable queue of actions awaiting server acknowledgement

mod store;
mod types;


pub use store::PersistentActionStore;
pub use types::{ActionKind, MediaCheckpoint, PendingAction};
