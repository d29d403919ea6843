//! Online checkout: turn a computed slot into a confirmed (or pending)
//! appointment.
//!
//! Two guards keep concurrent checkouts apart. A short-lived slot claim
//! serializes requests racing for the same computed slot, and the booking
//! transaction locks the involved staff rows and re-checks overlaps before
//! inserting. The idempotency key makes client retries return the original
//! booking.

use chrono::Utc;
use salon_core::appointment_status::AppointmentStatus;
use salon_core::availability::{local_date, AvailabilityRequest, Slot};
use salon_core::checkout::{CheckoutInput, NormalizedContact};
use salon_core::consent::ConsentAction;
use salon_core::error::CoreError;
use salon_core::metadata::{AppointmentMetadata, BookingChannel};
use salon_core::payment::PaymentStatus;
use salon_core::slot_key::claim_expiry;
use salon_core::types::DbId;
use salon_db::models::appointment::{AppointmentWithItems, NewAppointment, NewAppointmentItem};
use salon_db::models::customer::{CreateCustomer, Customer};
use salon_db::models::location::Location;
use salon_db::repositories::{
    AppointmentItemRepo, AppointmentRepo, ConsentRepo, CustomerRepo, MembershipRepo,
    SlotClaimRepo,
};
use salon_events::bus::APPOINTMENT_CREATED;
use serde::Serialize;
use serde_json::json;

use super::appointments::{publish, with_items};
use super::availability::{find_slots, load_location, Audience};
use super::bounds_of;
use super::conflicts::{ensure_free, load_capacities, lock_staff};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// `source` stored on consent records granted during checkout.
pub const CONSENT_SOURCE: &str = "online_checkout";

const IDEMPOTENCY_CONSTRAINT: &str = "uq_appointments_idempotency_key";

#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    #[serde(flatten)]
    pub booking: AppointmentWithItems,
    /// `true` when the idempotency key matched an earlier booking.
    pub replayed: bool,
}

pub async fn checkout(
    state: &AppState,
    location_id: DbId,
    input: &CheckoutInput,
) -> AppResult<CheckoutOutcome> {
    let contact = input.validate_and_normalize()?;
    let location = load_location(state, location_id).await?;

    if let Some(existing) =
        AppointmentRepo::find_by_idempotency_key(&state.pool, location.id, &input.idempotency_key)
            .await?
    {
        tracing::info!(
            appointment_id = existing.id,
            location_id = location.id,
            "Checkout replayed from idempotency key"
        );
        return Ok(CheckoutOutcome {
            booking: with_items(&state.pool, existing).await?,
            replayed: true,
        });
    }

    // Looked up before the slot is checked; a new customer is only written
    // inside the booking transaction.
    let known = find_customer(state, location.id, &contact).await?;

    let now = Utc::now();
    let date = local_date(input.start, location.utc_offset_minutes);
    let request = AvailabilityRequest {
        service_ids: input.service_ids.clone(),
        from: date,
        to: date,
        staff_id: input.staff_id,
        now,
        exclude_appointment: None,
    };
    let slot = find_slots(state, &location, &request, Audience::Online)
        .await?
        .into_iter()
        .find(|s| s.start == input.start)
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "The requested slot is no longer available".into(),
            ))
        })?;

    let key = slot.slot_key.clone();
    let expires_at = claim_expiry(now, state.config.slot_claim_ttl_secs);
    let claimed = SlotClaimRepo::try_claim(
        &state.pool,
        location.id,
        &key,
        &input.idempotency_key,
        now,
        expires_at,
    )
    .await?;
    if !claimed {
        tracing::info!(location_id = location.id, slot_key = %key, "Slot claim lost");
        return Err(AppError::Core(CoreError::Conflict(
            "The requested slot is being booked by someone else".into(),
        )));
    }

    let result = book(state, &location, input, &contact, known, &slot, &key).await;

    if let Err(e) =
        SlotClaimRepo::release(&state.pool, location.id, &key, &input.idempotency_key).await
    {
        tracing::warn!(error = %e, slot_key = %key, "Failed to release slot claim");
    }

    match result {
        Ok(booking) => {
            let appointment = &booking.appointment;
            tracing::info!(
                appointment_id = appointment.id,
                location_id = location.id,
                customer_id = ?appointment.customer_id,
                status = %appointment.status,
                "Online checkout completed"
            );
            publish(
                state,
                APPOINTMENT_CREATED,
                appointment,
                None,
                json!({ "status": appointment.status, "channel": "online" }),
            );
            Ok(CheckoutOutcome {
                booking,
                replayed: false,
            })
        }
        Err(e) if is_idempotency_violation(&e) => {
            // A concurrent request with the same key committed first.
            let existing = AppointmentRepo::find_by_idempotency_key(
                &state.pool,
                location.id,
                &input.idempotency_key,
            )
            .await?
            .ok_or(e)?;
            Ok(CheckoutOutcome {
                booking: with_items(&state.pool, existing).await?,
                replayed: true,
            })
        }
        Err(e) => Err(e),
    }
}

async fn book(
    state: &AppState,
    location: &Location,
    input: &CheckoutInput,
    contact: &NormalizedContact,
    known: Option<Customer>,
    slot: &Slot,
    key: &str,
) -> AppResult<AppointmentWithItems> {
    let items: Vec<NewAppointmentItem> = slot
        .assignments
        .iter()
        .map(NewAppointmentItem::from_assignment)
        .collect();
    let bounds = bounds_of(&items)?;
    let capacities = load_capacities(&state.pool, location.id).await?;

    let status = if location.requires_confirmation {
        AppointmentStatus::Pending
    } else {
        AppointmentStatus::Confirmed
    };

    let mut tx = state.pool.begin().await?;
    let customer = match known {
        Some(customer) => customer,
        None => {
            CustomerRepo::create(
                &mut tx,
                location.id,
                &CreateCustomer {
                    first_name: contact.first_name.clone(),
                    last_name: contact.last_name.clone(),
                    email: contact.email.clone(),
                    phone: contact.phone.clone(),
                    notes: None,
                    metadata: None,
                },
            )
            .await?
        }
    };
    if state.memberships.customers && customer.location_id != location.id {
        MembershipRepo::ensure_customer(&mut tx, customer.id, location.id).await?;
    }

    lock_staff(&mut tx, &items).await?;
    ensure_free(&mut tx, &items, &capacities, None).await?;

    let mut metadata = AppointmentMetadata::new(BookingChannel::Online);
    metadata.slot_key = Some(key.to_string());
    metadata.record(
        "created",
        None,
        Utc::now(),
        json!({ "customer_id": customer.id, "status": status }),
    );
    let appointment = AppointmentRepo::insert(
        &mut tx,
        &NewAppointment {
            location_id: location.id,
            customer_id: Some(customer.id),
            status,
            payment_status: PaymentStatus::Unpaid,
            starts_at: bounds.start,
            ends_at: bounds.end,
            notes: input.notes.clone(),
            idempotency_key: Some(input.idempotency_key.clone()),
            metadata: metadata.to_value(),
        },
    )
    .await?;
    let mut rows = Vec::with_capacity(items.len());
    for item in &items {
        rows.push(AppointmentItemRepo::insert(&mut tx, appointment.id, item).await?);
    }

    let mut consents = input.consents.clone();
    consents.sort();
    consents.dedup();
    for consent_type in consents {
        ConsentRepo::record(
            &mut tx,
            customer.id,
            consent_type,
            ConsentAction::Granted,
            CONSENT_SOURCE,
        )
        .await?;
    }
    tx.commit().await?;

    Ok(AppointmentWithItems {
        appointment,
        items: rows,
    })
}

/// Email first, then phone, within the location. With customer
/// memberships, a match at another location is linked instead of
/// duplicated.
async fn find_customer(
    state: &AppState,
    location_id: DbId,
    contact: &NormalizedContact,
) -> AppResult<Option<Customer>> {
    let with_memberships = state.memberships.customers;
    if let Some(email) = contact.email.as_deref() {
        if let Some(found) =
            CustomerRepo::find_by_email(&state.pool, location_id, email, with_memberships).await?
        {
            return Ok(Some(found));
        }
    }
    if let Some(phone) = contact.phone.as_deref() {
        if let Some(found) =
            CustomerRepo::find_by_phone(&state.pool, location_id, phone, with_memberships).await?
        {
            return Ok(Some(found));
        }
    }
    if !with_memberships {
        return Ok(None);
    }
    Ok(CustomerRepo::find_anywhere(
        &state.pool,
        contact.email.as_deref(),
        contact.phone.as_deref(),
    )
    .await?)
}

fn is_idempotency_violation(err: &AppError) -> bool {
    match err {
        AppError::Database(sqlx::Error::Database(db_err)) => {
            db_err.constraint() == Some(IDEMPOTENCY_CONSTRAINT)
        }
        _ => false,
    }
}
