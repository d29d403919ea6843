//! Domain logic for the salon booking backend.
//!
//! This crate has zero internal dependencies so the availability engine,
//! state machines and validation rules can be shared by the API, the
//! repository layer and the notification dispatcher alike.

pub mod appointment_status;
pub mod availability;
pub mod checkout;
pub mod consent;
pub mod error;
pub mod intervals;
pub mod items;
pub mod metadata;
pub mod payment;
pub mod repeat;
pub mod roles;
pub mod slot_key;
pub mod types;
