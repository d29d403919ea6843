//! Well-known staff role name constants.
//!
//! These match the `role` column values in the `staff` table.

/// Location owner; full access including staff administration.
pub const ROLE_OWNER: &str = "owner";
/// Manages schedules, staff and appointments.
pub const ROLE_MANAGER: &str = "manager";
/// Works the calendar: appointments and customers.
pub const ROLE_STAFF: &str = "staff";

pub const ALL_ROLES: &[&str] = &[ROLE_OWNER, ROLE_MANAGER, ROLE_STAFF];

/// Whether `role` may administer staff and schedules.
pub fn can_manage(role: &str) -> bool {
    role == ROLE_OWNER || role == ROLE_MANAGER
}

pub fn is_known_role(role: &str) -> bool {
    ALL_ROLES.contains(&role)
}
