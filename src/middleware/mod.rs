//! HTTP middleware components.
//!
//! Middleware run before route handlers. Here they authenticate requests and
//! short-circuit the ones that fail.

/// Bearer token authentication, one function per required actor kind
pub mod auth;
