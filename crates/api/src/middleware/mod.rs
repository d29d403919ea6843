//! Authentication and authorization extractors.
//!
//! - [`auth::AuthStaff`] -- A staff session from a Bearer token.
//! - [`rbac::RequireManager`] -- Requires the `owner` or `manager` role.

pub mod auth;
pub mod rbac;
