//! Appointment slot availability.
//!
//! [`find_availability`] takes a snapshot of everything that constrains a
//! location's calendar ([`AvailabilityInputs`]) plus a request for a
//! service combination ([`AvailabilityRequest`]) and returns the bookable
//! [`Slot`]s. The computation is pure: loading the snapshot from storage
//! and the shift-plan provider is the caller's job.

mod calendar;
mod day;
mod engine;
pub mod inputs;

pub use calendar::{local_date, local_day, minute_window, weekday_index};
pub use day::saturated_ranges;
pub use engine::find_availability;
pub use inputs::{
    AvailabilityException, AvailabilityInputs, AvailabilityRequest, BusyItem, ExceptionKind,
    LocationRules, ResourcePool, ServiceDefinition, ServiceStep, Slot, StaffAvailability,
    StepAssignment, TimeOff, WeeklyRule,
};
