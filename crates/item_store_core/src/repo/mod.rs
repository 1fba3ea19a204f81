//! Repository layer: synchronous SQL access to the `items` table.
//!
//! # Responsibility
//! - Define the data access contract for items.
//! - Isolate SQLite statement details from the async store and services.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, schema drift) in
//!   addition to DB transport errors.

pub mod item_repo;
