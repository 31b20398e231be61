//! Business logic services.
//!
//! Services contain the use cases separated from HTTP handlers. They receive
//! an already authenticated actor, validate input, and run their writes in
//! one unit of work.

pub mod account_service;
pub mod auth_service;
pub mod catalog_service;
pub mod order_service;
