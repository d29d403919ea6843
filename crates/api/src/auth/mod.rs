//! Staff authentication primitives.
//!
//! - [`pin`] -- Argon2id PIN hashing, verification and format checks.
//! - [`jwt`] -- Session tokens issued after a successful PIN login.

pub mod jwt;
pub mod pin;
