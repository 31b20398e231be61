//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response bodies built from them.

/// Customer and restaurant actors
pub mod actor;
/// Cities, categories, dishes and restaurant listings
pub mod catalog;
/// Orders, order lines and snapshots
pub mod order;
