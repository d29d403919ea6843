//! Row structs and DTOs.
//!
//! Each submodule holds a `FromRow` + `Serialize` struct per table, the
//! `Deserialize` DTOs used to write it, and conversions into the
//! `salon_core` types the availability engine consumes.

pub mod appointment;
pub mod customer;
pub mod location;
pub mod schedule;
pub mod service;
pub mod slot_claim;
pub mod staff;
