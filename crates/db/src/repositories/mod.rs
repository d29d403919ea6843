//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async functions that
//! accept `&PgPool` as the first argument. Functions that must run inside
//! a caller-owned transaction take `&mut PgConnection` instead.

pub mod appointment_item_repo;
pub mod appointment_repo;
pub mod consent_repo;
pub mod customer_repo;
pub mod exception_repo;
pub mod location_repo;
pub mod membership_repo;
pub mod resource_repo;
pub mod service_repo;
pub mod slot_claim_repo;
pub mod staff_repo;
pub mod time_off_repo;
pub mod weekly_hours_repo;

pub use appointment_item_repo::AppointmentItemRepo;
pub use appointment_repo::AppointmentRepo;
pub use consent_repo::ConsentRepo;
pub use customer_repo::CustomerRepo;
pub use exception_repo::ExceptionRepo;
pub use location_repo::LocationRepo;
pub use membership_repo::{MembershipRepo, MembershipSupport};
pub use resource_repo::ResourceRepo;
pub use service_repo::ServiceRepo;
pub use slot_claim_repo::SlotClaimRepo;
pub use staff_repo::StaffRepo;
pub use time_off_repo::TimeOffRepo;
pub use weekly_hours_repo::WeeklyHoursRepo;
