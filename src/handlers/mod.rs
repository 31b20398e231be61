//! HTTP request handlers.
//!
//! Handlers extract the request, hand it to a service together with the
//! actor injected by the auth middleware, and shape the response.

pub mod auth;
pub mod health;
pub mod menu;
pub mod orders;
pub mod restaurants;
pub mod users;
