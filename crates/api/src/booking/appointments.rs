//! Backoffice appointment operations: create, update, move and the two
//! status machines. Every mutation appends to `metadata.audit`.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use salon_core::appointment_status::AppointmentStatus;
use salon_core::availability::{local_date, AvailabilityRequest};
use salon_core::error::CoreError;
use salon_core::items::{service_sequence, ItemSpan};
use salon_core::metadata::{AppointmentMetadata, BookingChannel};
use salon_core::payment::PaymentStatus;
use salon_core::roles::can_manage;
use salon_core::types::{DbId, Timestamp};
use salon_db::models::appointment::{
    Appointment, AppointmentItem, AppointmentWithItems, NewAppointment, NewAppointmentItem,
    UpdateAppointment,
};
use salon_db::models::location::Location;
use salon_db::repositories::{AppointmentItemRepo, AppointmentRepo, CustomerRepo, ServiceRepo};
use salon_events::bus::{APPOINTMENT_CANCELLED, APPOINTMENT_CREATED, APPOINTMENT_RESCHEDULED};
use salon_events::DomainEvent;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use super::availability::{find_slots, load_location, Audience};
use super::bounds_of;
use super::conflicts::{ensure_free, ensure_no_self_overlap, load_capacities, lock_staff};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthStaff;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /appointments`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub customer_id: Option<DbId>,
    #[validate(length(min = 1, max = 10))]
    pub service_ids: Vec<DbId>,
    pub start: Timestamp,
    pub staff_id: Option<DbId>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// `PENDING` or `CONFIRMED` (default).
    pub status: Option<AppointmentStatus>,
    /// Skip the availability check (managers only).
    #[serde(default)]
    pub force: bool,
    /// Skip the double-booking check (managers only).
    #[serde(default)]
    pub allow_overlap: bool,
}

/// Body of `POST /appointments/{id}/reschedule`.
#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub start: Timestamp,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub allow_overlap: bool,
}

/// Body of `POST /appointments/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
    pub note: Option<String>,
}

/// Body of `POST /appointments/{id}/payment-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentChangeRequest {
    pub payment_status: PaymentStatus,
    pub note: Option<String>,
}

/// How strictly a booking is checked before it is written.
#[derive(Debug, Clone, Copy)]
pub struct Checks {
    pub availability: bool,
    pub overlap: bool,
}

impl Checks {
    fn requested(staff: &AuthStaff, force: bool, allow_overlap: bool) -> AppResult<Self> {
        if (force || allow_overlap) && !can_manage(&staff.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only managers may bypass availability or overlap checks".into(),
            )));
        }
        Ok(Self {
            availability: !force,
            overlap: !allow_overlap,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load an appointment the caller's location owns.
pub async fn load_at(state: &AppState, staff: &AuthStaff, id: DbId) -> AppResult<Appointment> {
    let appointment = AppointmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Appointment", id))?;
    staff.ensure_location(appointment.location_id)?;
    Ok(appointment)
}

pub async fn with_items(pool: &PgPool, appointment: Appointment) -> AppResult<AppointmentWithItems> {
    let items = AppointmentItemRepo::list_for_appointment(pool, appointment.id).await?;
    Ok(AppointmentWithItems { appointment, items })
}

/// Lock the appointment row and parse its metadata.
pub(crate) async fn lock_for_change(
    conn: &mut sqlx::PgConnection,
    id: DbId,
) -> AppResult<(Appointment, AppointmentMetadata)> {
    let appointment = AppointmentRepo::lock(conn, id)
        .await?
        .ok_or(AppError::not_found("Appointment", id))?;
    let metadata = appointment.parsed_metadata()?;
    Ok((appointment, metadata))
}

pub fn publish(
    state: &AppState,
    event_type: &str,
    appointment: &Appointment,
    actor: Option<DbId>,
    payload: serde_json::Value,
) {
    state.event_bus.publish(
        DomainEvent::new(event_type, appointment.location_id)
            .with_appointment(appointment.id)
            .with_actor(actor)
            .with_payload(payload),
    );
}

async fn ensure_customer_visible(
    state: &AppState,
    location_id: DbId,
    customer_id: DbId,
) -> AppResult<()> {
    CustomerRepo::find_at_location(&state.pool, location_id, customer_id, state.memberships.customers)
        .await?
        .ok_or(AppError::not_found("Customer", customer_id))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

pub async fn create(
    state: &AppState,
    staff: &AuthStaff,
    input: &CreateAppointmentRequest,
) -> AppResult<AppointmentWithItems> {
    input.validate()?;
    let checks = Checks::requested(staff, input.force, input.allow_overlap)?;
    let status = input.status.unwrap_or(AppointmentStatus::Confirmed);
    if !matches!(status, AppointmentStatus::Pending | AppointmentStatus::Confirmed) {
        return Err(AppError::Core(CoreError::Validation(
            "New appointments start as PENDING or CONFIRMED".into(),
        )));
    }

    let location = load_location(state, staff.location_id).await?;
    if let Some(customer_id) = input.customer_id {
        ensure_customer_visible(state, location.id, customer_id).await?;
    }

    let items = if checks.availability {
        items_from_availability(state, &location, input).await?
    } else {
        items_from_catalog(state, &location, input).await?
    };
    let bounds = bounds_of(&items)?;
    let capacities = load_capacities(&state.pool, location.id).await?;

    let now = Utc::now();
    let mut metadata = AppointmentMetadata::new(BookingChannel::Backoffice);
    metadata.record(
        "created",
        Some(staff.staff_id),
        now,
        json!({ "force": input.force, "allow_overlap": input.allow_overlap }),
    );

    let mut tx = state.pool.begin().await?;
    lock_staff(&mut tx, &items).await?;
    if checks.overlap {
        ensure_no_self_overlap(&items)?;
        ensure_free(&mut tx, &items, &capacities, None).await?;
    }
    let appointment = AppointmentRepo::insert(
        &mut tx,
        &NewAppointment {
            location_id: location.id,
            customer_id: input.customer_id,
            status,
            payment_status: PaymentStatus::Unpaid,
            starts_at: bounds.start,
            ends_at: bounds.end,
            notes: input.notes.clone(),
            idempotency_key: None,
            metadata: metadata.to_value(),
        },
    )
    .await?;
    let mut rows = Vec::with_capacity(items.len());
    for item in &items {
        rows.push(AppointmentItemRepo::insert(&mut tx, appointment.id, item).await?);
    }
    tx.commit().await?;

    tracing::info!(
        appointment_id = appointment.id,
        location_id = location.id,
        staff_id = staff.staff_id,
        items = rows.len(),
        "Appointment created"
    );
    publish(
        state,
        APPOINTMENT_CREATED,
        &appointment,
        Some(staff.staff_id),
        json!({ "status": status.as_str(), "channel": "backoffice" }),
    );

    Ok(AppointmentWithItems {
        appointment,
        items: rows,
    })
}

/// Items of the computed slot starting exactly at `input.start`.
async fn items_from_availability(
    state: &AppState,
    location: &Location,
    input: &CreateAppointmentRequest,
) -> AppResult<Vec<NewAppointmentItem>> {
    let date = local_date(input.start, location.utc_offset_minutes);
    let request = AvailabilityRequest {
        service_ids: input.service_ids.clone(),
        from: date,
        to: date,
        staff_id: input.staff_id,
        now: Utc::now(),
        exclude_appointment: None,
    };
    let slot = find_slots(state, location, &request, Audience::Backoffice)
        .await?
        .into_iter()
        .find(|s| s.start == input.start)
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "The requested time is not available".into(),
            ))
        })?;
    Ok(slot
        .assignments
        .iter()
        .map(NewAppointmentItem::from_assignment)
        .collect())
}

/// Lay the services' steps end to end from `input.start` without
/// consulting availability. Staffed steps go to `input.staff_id`.
async fn items_from_catalog(
    state: &AppState,
    location: &Location,
    input: &CreateAppointmentRequest,
) -> AppResult<Vec<NewAppointmentItem>> {
    let services = ServiceRepo::list_active(&state.pool, location.id).await?;
    let mut cursor = input.start;
    let mut items = Vec::new();

    for &service_id in &input.service_ids {
        let service = services
            .iter()
            .find(|s| s.id == service_id)
            .ok_or(AppError::not_found("Service", service_id))?;
        for step in service.parsed_steps()? {
            let staff_id = match (step.needs_staff, input.staff_id) {
                (true, None) => {
                    return Err(AppError::Core(CoreError::Validation(
                        "staff_id is required when bypassing availability".into(),
                    )))
                }
                (true, staff_id) => staff_id,
                (false, _) => None,
            };
            let ends_at = cursor + Duration::minutes(i64::from(step.duration_minutes));
            items.push(NewAppointmentItem {
                service_id,
                staff_id,
                resource_id: step.resource_ids.first().copied(),
                starts_at: cursor,
                ends_at,
                buffer_before_minutes: step.buffer_before_minutes as i32,
                buffer_after_minutes: step.buffer_after_minutes as i32,
            });
            cursor = ends_at;
        }
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Update / move
// ---------------------------------------------------------------------------

pub async fn update_details(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    input: &UpdateAppointment,
) -> AppResult<Appointment> {
    let current = load_at(state, staff, id).await?;
    if let Some(customer_id) = input.customer_id {
        ensure_customer_visible(state, current.location_id, customer_id).await?;
    }

    let mut tx = state.pool.begin().await?;
    let (_, mut metadata) = lock_for_change(&mut tx, id).await?;
    metadata.record(
        "updated",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "customer_id": input.customer_id, "notes_changed": input.notes.is_some() }),
    );
    let appointment = AppointmentRepo::update_details(&mut tx, id, input, &metadata.to_value()).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = id, staff_id = staff.staff_id, "Appointment updated");
    Ok(appointment)
}

pub async fn reschedule(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    input: &RescheduleRequest,
) -> AppResult<AppointmentWithItems> {
    let checks = Checks::requested(staff, input.force, input.allow_overlap)?;
    let appointment = load_at(state, staff, id).await?;
    let delta = input.start - appointment.starts_at;
    move_by(state, staff, appointment, delta, checks).await
}

/// Move every item of `appointment` by `delta`.
pub(crate) async fn move_by(
    state: &AppState,
    staff: &AuthStaff,
    appointment: Appointment,
    delta: Duration,
    checks: Checks,
) -> AppResult<AppointmentWithItems> {
    let status = appointment.parsed_status()?;
    if matches!(status, AppointmentStatus::Cancelled | AppointmentStatus::Completed) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "A {status} appointment cannot be moved"
        ))));
    }
    if delta.is_zero() {
        return with_items(&state.pool, appointment).await;
    }

    let items = AppointmentItemRepo::list_for_appointment(&state.pool, appointment.id).await?;
    let moved: Vec<NewAppointmentItem> = items
        .iter()
        .map(|item| NewAppointmentItem::shifted(item, delta))
        .collect();

    let location = load_location(state, appointment.location_id).await?;
    if checks.availability {
        ensure_bookable(state, &location, &appointment, &items, &moved).await?;
    }
    let capacities = load_capacities(&state.pool, location.id).await?;

    let mut tx = state.pool.begin().await?;
    let (locked, mut metadata) = lock_for_change(&mut tx, appointment.id).await?;
    lock_staff(&mut tx, &moved).await?;
    if checks.overlap {
        ensure_free(&mut tx, &moved, &capacities, Some(appointment.id)).await?;
    }
    let mut rows = Vec::with_capacity(items.len());
    for (item, target) in items.iter().zip(&moved) {
        rows.push(
            AppointmentItemRepo::update_range(&mut tx, item.id, target.starts_at, target.ends_at)
                .await?,
        );
    }
    metadata.record(
        "rescheduled",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "from": locked.starts_at, "delta_minutes": delta.num_minutes() }),
    );
    AppointmentRepo::set_metadata(&mut tx, appointment.id, &metadata.to_value()).await?;
    let updated = AppointmentRepo::refresh_bounds(&mut tx, appointment.id).await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = updated.id,
        staff_id = staff.staff_id,
        delta_minutes = delta.num_minutes(),
        "Appointment rescheduled"
    );
    publish(
        state,
        APPOINTMENT_RESCHEDULED,
        &updated,
        Some(staff.staff_id),
        json!({ "from": locked.starts_at, "to": updated.starts_at }),
    );

    Ok(AppointmentWithItems {
        appointment: updated,
        items: rows,
    })
}

/// The moved items must match a slot the engine would offer, with the
/// appointment's own old times ignored and every staff member kept.
async fn ensure_bookable(
    state: &AppState,
    location: &Location,
    appointment: &Appointment,
    items: &[AppointmentItem],
    moved: &[NewAppointmentItem],
) -> AppResult<()> {
    let mut service_minutes = HashMap::new();
    for service in ServiceRepo::list_active(&state.pool, location.id).await? {
        let minutes: i64 = service
            .parsed_steps()?
            .iter()
            .map(|s| i64::from(s.duration_minutes))
            .sum();
        service_minutes.insert(service.id, minutes);
    }
    let spans: Vec<ItemSpan> = items.iter().map(AppointmentItem::span).collect::<Result<_, _>>()?;
    let service_ids = service_sequence(&spans, |id| service_minutes.get(&id).copied());

    let mut staff_ids: Vec<DbId> = items.iter().filter_map(|i| i.staff_id).collect();
    staff_ids.sort_unstable();
    staff_ids.dedup();
    let preferred = match staff_ids.as_slice() {
        [only] => Some(*only),
        _ => None,
    };

    let bounds = bounds_of(moved)?;
    let date = local_date(bounds.start, location.utc_offset_minutes);
    let request = AvailabilityRequest {
        service_ids,
        from: date,
        to: date,
        staff_id: preferred,
        now: Utc::now(),
        exclude_appointment: Some(appointment.id),
    };
    let slots = find_slots(state, location, &request, Audience::Backoffice).await?;

    let fits = slots.iter().filter(|s| s.start == bounds.start).any(|slot| {
        moved.iter().all(|item| match item.staff_id {
            None => true,
            Some(staff_id) => slot.assignments.iter().any(|a| {
                a.staff_id == Some(staff_id)
                    && a.range.start < item.ends_at
                    && item.starts_at < a.range.end
            }),
        })
    });
    if !fits {
        return Err(AppError::Core(CoreError::Conflict(
            "The new time is not available".into(),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Status machines
// ---------------------------------------------------------------------------

pub async fn change_status(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    input: &StatusChangeRequest,
) -> AppResult<Appointment> {
    load_at(state, staff, id).await?;

    let mut tx = state.pool.begin().await?;
    let (current, mut metadata) = lock_for_change(&mut tx, id).await?;
    let from = current.parsed_status()?;
    from.validate_transition(input.status)?;
    metadata.record(
        "status_changed",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "from": from, "to": input.status, "note": input.note }),
    );
    let appointment = AppointmentRepo::set_status(&mut tx, id, input.status, &metadata.to_value()).await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = id,
        staff_id = staff.staff_id,
        from = %from,
        to = %input.status,
        "Appointment status changed"
    );
    if input.status == AppointmentStatus::Cancelled {
        publish(
            state,
            APPOINTMENT_CANCELLED,
            &appointment,
            Some(staff.staff_id),
            json!({ "from": from }),
        );
    }
    Ok(appointment)
}

pub async fn change_payment_status(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    input: &PaymentChangeRequest,
) -> AppResult<Appointment> {
    load_at(state, staff, id).await?;

    let mut tx = state.pool.begin().await?;
    let (current, mut metadata) = lock_for_change(&mut tx, id).await?;
    let from = current.parsed_payment_status()?;
    from.validate_transition(input.payment_status)?;
    metadata.record_payment(
        from,
        input.payment_status,
        Some(staff.staff_id),
        Utc::now(),
        input.note.clone(),
    );
    let appointment =
        AppointmentRepo::set_payment_status(&mut tx, id, input.payment_status, &metadata.to_value())
            .await?;
    tx.commit().await?;

    tracing::info!(
        appointment_id = id,
        staff_id = staff.staff_id,
        from = from.as_str(),
        to = input.payment_status.as_str(),
        "Payment status changed"
    );
    Ok(appointment)
}
