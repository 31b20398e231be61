//! Authentication building blocks shared by the middleware and services.
//!
//! - `password`: salted Argon2 hashing of actor passwords
//! - `token`: signed, expiring access tokens carrying an actor-kind claim
//! - `resolver`: token to loaded actor, with kind enforcement

pub mod password;
pub mod resolver;
pub mod token;
