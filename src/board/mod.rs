// The draft board: player model, the roster store that owns it, and the
// pure reorder/projection logic that operates on snapshots of it.

pub mod player;
pub mod project;
pub mod reorder;
pub mod store;
