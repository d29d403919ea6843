//! Booking orchestration on top of the pure `salon_core` engine.
//!
//! - [`availability`] -- loads an engine snapshot from storage and the shift plan.
//! - [`conflicts`] -- in-transaction double-booking checks.
//! - [`checkout`] -- the public online checkout flow.
//! - [`appointments`] -- backoffice create, move and status changes.
//! - [`items`] -- split, merge and removal of appointment items.
//! - [`series`] -- repeat series creation and propagation.

pub mod appointments;
pub mod availability;
pub mod checkout;
pub mod conflicts;
pub mod items;
pub mod series;

use salon_core::intervals::TimeRange;
use salon_core::items::{appointment_bounds, ItemSpan};
use salon_db::models::appointment::NewAppointmentItem;

use crate::error::AppResult;

/// Appointment start/end covering `items`.
pub(crate) fn bounds_of(items: &[NewAppointmentItem]) -> AppResult<TimeRange> {
    let spans = items
        .iter()
        .map(|item| {
            Ok(ItemSpan {
                service_id: item.service_id,
                staff_id: item.staff_id,
                resource_id: item.resource_id,
                range: TimeRange::new(item.starts_at, item.ends_at)?,
            })
        })
        .collect::<Result<Vec<_>, salon_core::error::CoreError>>()?;
    Ok(appointment_bounds(&spans)?)
}
