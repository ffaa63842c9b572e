//! Cache abstractions backing the engine: a generic key/value store trait plus a typed wrapper
//! for the published top-N snapshot.

pub mod snapshot_store;
pub mod store;
