//! Editing an appointment's items. The appointment's bounds are
//! recomputed from its items after every edit.

use chrono::Utc;
use salon_core::items::{ensure_removable, merge_items, split_item};
use salon_core::types::{DbId, Timestamp};
use salon_db::models::appointment::{AppointmentItem, AppointmentWithItems, NewAppointmentItem};
use salon_db::repositories::{AppointmentItemRepo, AppointmentRepo};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgConnection;

use super::appointments::{load_at, lock_for_change};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthStaff;
use crate::state::AppState;

/// Body of `POST /appointments/{id}/items/{item_id}/split`.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitItemRequest {
    pub at: Timestamp,
}

/// Body of `POST /appointments/{id}/items/merge`.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeItemsRequest {
    pub item_ids: [DbId; 2],
}

fn find_item(items: &[AppointmentItem], item_id: DbId) -> AppResult<&AppointmentItem> {
    items
        .iter()
        .find(|i| i.id == item_id)
        .ok_or(AppError::not_found("AppointmentItem", item_id))
}

/// Write metadata, refresh bounds and reload the items.
async fn finish(
    conn: &mut PgConnection,
    id: DbId,
    metadata: &serde_json::Value,
) -> AppResult<AppointmentWithItems> {
    AppointmentRepo::set_metadata(conn, id, metadata).await?;
    let appointment = AppointmentRepo::refresh_bounds(conn, id).await?;
    let items = AppointmentItemRepo::list_for_appointment(&mut *conn, id).await?;
    Ok(AppointmentWithItems { appointment, items })
}

/// Split one item in two at `at`. The first part keeps the leading
/// buffer, the second the trailing one.
pub async fn split(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    item_id: DbId,
    input: &SplitItemRequest,
) -> AppResult<AppointmentWithItems> {
    load_at(state, staff, id).await?;

    let mut tx = state.pool.begin().await?;
    let (_, mut metadata) = lock_for_change(&mut tx, id).await?;
    let items = AppointmentItemRepo::list_for_appointment(&mut *tx, id).await?;
    let item = find_item(&items, item_id)?;
    let (first, second) = split_item(&item.span()?, input.at)?;

    AppointmentItemRepo::update_range(&mut tx, item.id, first.range.start, first.range.end).await?;
    AppointmentItemRepo::set_buffers(&mut tx, item.id, item.buffer_before_minutes, 0).await?;
    let created = AppointmentItemRepo::insert(
        &mut tx,
        id,
        &NewAppointmentItem {
            service_id: second.service_id,
            staff_id: second.staff_id,
            resource_id: second.resource_id,
            starts_at: second.range.start,
            ends_at: second.range.end,
            buffer_before_minutes: 0,
            buffer_after_minutes: item.buffer_after_minutes,
        },
    )
    .await?;

    metadata.record(
        "item_split",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "item_id": item.id, "new_item_id": created.id, "at": input.at }),
    );
    let result = finish(&mut tx, id, &metadata.to_value()).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = id, item_id, new_item_id = created.id, "Appointment item split");
    Ok(result)
}

/// Merge two adjacent items with the same service, staff and resource.
pub async fn merge(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    input: &MergeItemsRequest,
) -> AppResult<AppointmentWithItems> {
    load_at(state, staff, id).await?;
    let [a_id, b_id] = input.item_ids;
    if a_id == b_id {
        return Err(AppError::BadRequest("Cannot merge an item with itself".into()));
    }

    let mut tx = state.pool.begin().await?;
    let (_, mut metadata) = lock_for_change(&mut tx, id).await?;
    let items = AppointmentItemRepo::list_for_appointment(&mut *tx, id).await?;
    let a = find_item(&items, a_id)?;
    let b = find_item(&items, b_id)?;
    let merged = merge_items(&a.span()?, &b.span()?)?;
    let (first, second) = if a.starts_at <= b.starts_at { (a, b) } else { (b, a) };

    AppointmentItemRepo::update_range(&mut tx, first.id, merged.range.start, merged.range.end)
        .await?;
    AppointmentItemRepo::set_buffers(
        &mut tx,
        first.id,
        first.buffer_before_minutes,
        second.buffer_after_minutes,
    )
    .await?;
    AppointmentItemRepo::delete(&mut tx, second.id).await?;

    metadata.record(
        "items_merged",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "kept_item_id": first.id, "removed_item_id": second.id }),
    );
    let result = finish(&mut tx, id, &metadata.to_value()).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = id, kept = first.id, removed = second.id, "Appointment items merged");
    Ok(result)
}

/// Remove one item. The last item of an appointment cannot be removed.
pub async fn remove(
    state: &AppState,
    staff: &AuthStaff,
    id: DbId,
    item_id: DbId,
) -> AppResult<AppointmentWithItems> {
    load_at(state, staff, id).await?;

    let mut tx = state.pool.begin().await?;
    let (_, mut metadata) = lock_for_change(&mut tx, id).await?;
    let items = AppointmentItemRepo::list_for_appointment(&mut *tx, id).await?;
    let item = find_item(&items, item_id)?;
    ensure_removable(items.len())?;

    AppointmentItemRepo::delete(&mut tx, item.id).await?;
    metadata.record(
        "item_removed",
        Some(staff.staff_id),
        Utc::now(),
        json!({ "item_id": item.id, "service_id": item.service_id }),
    );
    let result = finish(&mut tx, id, &metadata.to_value()).await?;
    tx.commit().await?;

    tracing::info!(appointment_id = id, item_id, "Appointment item removed");
    Ok(result)
}
