//! Request handlers, one module per resource.
//!
//! Handlers are thin: they extract, authorize and delegate to
//! [`crate::booking`] or to the repositories in `salon_db`, then wrap the
//! result in a [`DataResponse`](crate::response::DataResponse).

pub mod appointments;
pub mod auth;
pub mod customers;
pub mod public;
pub mod schedule;
pub mod staff;
