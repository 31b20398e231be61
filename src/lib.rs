//! Food delivery web server.
//!
//! Customers browse restaurants and place orders; restaurants manage their
//! menu and move orders through `PENDING -> COOKING -> DELIVERED -> COMPLETED`.
//! Both kinds authenticate with the same bearer token, which carries the
//! actor kind as a claim.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;
pub mod state;
