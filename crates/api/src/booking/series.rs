//! Repeat series: creating occurrences from a weekly rule and propagating
//! a cancel or a move across occurrences.
//!
//! Series membership lives in each appointment's `metadata.series`.

use chrono::Utc;
use salon_core::appointment_status::AppointmentStatus;
use salon_core::error::CoreError;
use salon_core::metadata::{AppointmentMetadata, BookingChannel, SeriesLink};
use salon_core::payment::PaymentStatus;
use salon_core::repeat::{select_members, PropagationScope, RepeatRule, SeriesMember};
use salon_core::types::{DbId, Timestamp};
use salon_db::models::appointment::{
    Appointment, AppointmentWithItems, NewAppointment, NewAppointmentItem,
};
use salon_db::repositories::{AppointmentItemRepo, AppointmentRepo};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Acquire, PgConnection};
use uuid::Uuid;

use super::appointments::{
    change_status, load_at, lock_for_change, move_by, Checks, StatusChangeRequest,
};
use super::bounds_of;
use super::conflicts::{ensure_free, load_capacities, lock_staff, Capacities};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthStaff;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SkippedOccurrence {
    pub index: u32,
    pub starts_at: Timestamp,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct SeriesCreated {
    pub series_id: Uuid,
    pub created: Vec<AppointmentWithItems>,
    /// Occurrences that collided with existing bookings.
    pub skipped: Vec<SkippedOccurrence>,
}

/// Body of `POST /appointments/{id}/series`.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesChangeRequest {
    pub scope: PropagationScope,
    #[serde(flatten)]
    pub change: SeriesChange,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SeriesChange {
    Cancel { note: Option<String> },
    /// Move this occurrence to `start`; the others move by the same amount.
    Reschedule { start: Timestamp },
}

#[derive(Debug, Serialize)]
pub struct FailedMember {
    pub appointment_id: DbId,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SeriesChangeOutcome {
    pub updated: Vec<DbId>,
    pub failed: Vec<FailedMember>,
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Turn appointment `id` into the first occurrence of a series.
///
/// Runs in one transaction: occurrences that collide with a booking are
/// rolled back to their savepoint and reported as skipped, any other error
/// leaves the appointment as it was.
pub async fn create_series(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    rule: &RepeatRule,
) -> AppResult<SeriesCreated> {
    rule.validate()?;
    let original = load_at(state, staff, id).await?;
    if original.parsed_status()? == AppointmentStatus::Cancelled {
        return Err(AppError::Core(CoreError::Validation(
            "A cancelled appointment cannot be repeated".into(),
        )));
    }

    let items = AppointmentItemRepo::list_for_appointment(&state.pool, id).await?;
    let capacities = load_capacities(&state.pool, original.location_id).await?;
    let series_id = Uuid::new_v4();
    let starts = rule.following_starts(original.starts_at);

    let mut tx = state.pool.begin().await?;
    let (_, mut metadata) = lock_for_change(&mut tx, id).await?;
    if metadata.series.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Appointment already belongs to a series".into(),
        )));
    }

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for (n, start) in starts.iter().enumerate() {
        let index = n as u32 + 1;
        let delta = *start - original.starts_at;
        let moved: Vec<NewAppointmentItem> = items
            .iter()
            .map(|item| NewAppointmentItem::shifted(item, delta))
            .collect();
        let link = SeriesLink {
            series_id,
            index,
            rule: *rule,
        };

        let mut savepoint = tx.begin().await?;
        match insert_occurrence(&mut savepoint, staff, &original, &moved, link, &capacities).await {
            Ok(occurrence) => {
                savepoint.commit().await?;
                created.push(occurrence);
            }
            Err(AppError::Core(CoreError::Conflict(reason))) => {
                savepoint.rollback().await?;
                skipped.push(SkippedOccurrence {
                    index,
                    starts_at: *start,
                    reason,
                });
            }
            Err(e) => return Err(e),
        }
    }

    metadata.series = Some(SeriesLink {
        series_id,
        index: 0,
        rule: *rule,
    });
    metadata.record(
        "series_created",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "series_id": series_id, "occurrences": starts.len() + 1 }),
    );
    AppointmentRepo::set_metadata(&mut tx, id, &metadata.to_value()).await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = id,
        %series_id,
        created = created.len(),
        skipped = skipped.len(),
        "Repeat series created"
    );
    Ok(SeriesCreated {
        series_id,
        created,
        skipped,
    })
}

async fn insert_occurrence(
    conn: &mut PgConnection,
    staff: &AuthStaff,
    original: &Appointment,
    items: &[NewAppointmentItem],
    link: SeriesLink,
    capacities: &Capacities,
) -> AppResult<AppointmentWithItems> {
    let bounds = bounds_of(items)?;
    let status = match original.parsed_status()? {
        AppointmentStatus::Pending => AppointmentStatus::Pending,
        _ => AppointmentStatus::Confirmed,
    };
    let mut metadata = AppointmentMetadata::new(BookingChannel::Backoffice);
    metadata.record(
        "created",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "series_id": link.series_id, "index": link.index, "from_appointment": original.id }),
    );
    metadata.series = Some(link);

    lock_staff(conn, items).await?;
    ensure_free(conn, items, capacities, None).await?;
    let appointment = AppointmentRepo::insert(
        &mut *conn,
        &NewAppointment {
            location_id: original.location_id,
            customer_id: original.customer_id,
            status,
            payment_status: PaymentStatus::Unpaid,
            starts_at: bounds.start,
            ends_at: bounds.end,
            notes: original.notes.clone(),
            idempotency_key: None,
            metadata: metadata.to_value(),
        },
    )
    .await?;
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        rows.push(AppointmentItemRepo::insert(&mut *conn, appointment.id, item).await?);
    }

    Ok(AppointmentWithItems {
        appointment,
        items: rows,
    })
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

/// Apply a cancel or move made to occurrence `id` to the occurrences
/// selected by `scope`. Members are processed independently; failures are
/// reported per member.
pub async fn propagate(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    input: &SeriesChangeRequest,
) -> AppResult<SeriesChangeOutcome> {
    let current = load_at(state, staff, id).await?;
    let link = current.parsed_metadata()?.series.ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "Appointment is not part of a series".into(),
        ))
    })?;

    let members = AppointmentRepo::list_series(&state.pool, link.series_id).await?;
    let indexed: Vec<SeriesMember> = members
        .iter()
        .filter(|m| m.location_id == current.location_id)
        .filter_map(|m| {
            let series = m.parsed_metadata().ok()?.series?;
            Some(SeriesMember {
                appointment_id: m.id,
                index: series.index,
            })
        })
        .collect();
    let selected = select_members(&indexed, link.index, input.scope);

    let mut outcome = SeriesChangeOutcome::default();
    for member_id in selected {
        let Some(member) = members.iter().find(|m| m.id == member_id) else {
            continue;
        };
        let result = match &input.change {
            SeriesChange::Cancel { note } => cancel_member(state, staff, member, note.clone()).await,
            SeriesChange::Reschedule { start } => {
                let delta = *start - current.starts_at;
                let checks = Checks {
                    availability: true,
                    overlap: true,
                };
                move_by(state, staff, member.clone(), delta, checks)
                    .await
                    .map(|_| true)
            }
        };
        match result {
            Ok(true) => outcome.updated.push(member_id),
            Ok(false) => {}
            Err(AppError::Core(e)) => outcome.failed.push(FailedMember {
                appointment_id: member_id,
                error: e.to_string(),
            }),
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        appointment_id = id,
        series_id = %link.series_id,
        scope = ?input.scope,
        updated = outcome.updated.len(),
        failed = outcome.failed.len(),
        "Series change applied"
    );
    Ok(outcome)
}

/// `Ok(false)` when the member is already past the point of cancelling.
async fn cancel_member(
    state: &AppState,
    staff: &AuthStaff,
    member: &Appointment,
    note: Option<String>,
) -> AppResult<bool> {
    let status = member.parsed_status()?;
    if !status.can_transition(AppointmentStatus::Cancelled) {
        return Ok(false);
    }
    let request = StatusChangeRequest {
        status: AppointmentStatus::Cancelled,
        note,
    };
    change_status(state, staff, member.id, &request).await?;
    Ok(true)
}
