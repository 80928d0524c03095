//! Stateful groups: per-group records and the registry that serializes access to them.

pub mod registry;
pub mod state;
