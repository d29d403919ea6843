//! Shift-plan provider seam.
//!
//! The availability engine prefers a staff member's planned shifts over
//! their weekly rules. Shifts come from an external shift-planning system
//! through [`ShiftPlanProvider`]:
//!
//! - [`HttpShiftPlanClient`] talks to the provider's REST API.
//! - [`StaticShiftPlan`] serves a fixed in-memory plan (tests, or no
//!   provider configured).
//!
//! Employees are identified by the provider's own ids, stored on each staff
//! member as `metadata.shift_plan_employee_id`.

pub mod http;
pub mod provider;
pub mod static_plan;

pub use http::{HttpShiftPlanClient, ShiftPlanConfig};
pub use provider::{ShiftPlanError, ShiftPlanProvider, Shifts};
pub use static_plan::StaticShiftPlan;
