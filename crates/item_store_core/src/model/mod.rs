//! Domain model for stored items.
//!
//! # Responsibility
//! - Define the canonical record persisted by the item store.
//!
//! # Invariants
//! - Every persisted item is identified by a positive `ItemId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod item;
