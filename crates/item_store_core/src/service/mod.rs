//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep entry rules out of the storage layer.

pub mod item_service;
