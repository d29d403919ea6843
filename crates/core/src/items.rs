//! Appointment item arithmetic: bounds, split, merge and shifting.
//!
//! An appointment's start and end are never stored independently of its
//! items; they are always recomputed with [`appointment_bounds`].

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::intervals::TimeRange;
use crate::types::{DbId, Timestamp};

/// Shortest item a split may produce.
pub const MIN_ITEM_MINUTES: i64 = 5;

/// The scheduling-relevant part of an appointment item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpan {
    pub service_id: DbId,
    pub staff_id: Option<DbId>,
    pub resource_id: Option<DbId>,
    pub range: TimeRange,
}

/// Overall `[start, end)` of an appointment. Fails on an empty item list.
pub fn appointment_bounds(items: &[ItemSpan]) -> Result<TimeRange, CoreError> {
    let start = items.iter().map(|i| i.range.start).min();
    let end = items.iter().map(|i| i.range.end).max();
    match (start, end) {
        (Some(start), Some(end)) => TimeRange::new(start, end),
        _ => Err(CoreError::Validation(
            "An appointment must have at least one item".into(),
        )),
    }
}

/// Refuse to remove an item when it is the appointment's last one.
pub fn ensure_removable(item_count: usize) -> Result<(), CoreError> {
    if item_count <= 1 {
        return Err(CoreError::Validation(
            "Cannot remove the last item of an appointment".into(),
        ));
    }
    Ok(())
}

/// Split `item` at `at` into two consecutive items with the same service,
/// staff and resource. Both parts must last at least [`MIN_ITEM_MINUTES`].
pub fn split_item(item: &ItemSpan, at: Timestamp) -> Result<(ItemSpan, ItemSpan), CoreError> {
    let min = Duration::minutes(MIN_ITEM_MINUTES);
    if at - item.range.start < min || item.range.end - at < min {
        return Err(CoreError::Validation(format!(
            "Split point must leave at least {MIN_ITEM_MINUTES} minutes on each side"
        )));
    }
    let first = ItemSpan {
        range: TimeRange::new(item.range.start, at)?,
        ..*item
    };
    let second = ItemSpan {
        range: TimeRange::new(at, item.range.end)?,
        ..*item
    };
    Ok((first, second))
}

/// Merge two adjacent items that share service, staff and resource.
pub fn merge_items(a: &ItemSpan, b: &ItemSpan) -> Result<ItemSpan, CoreError> {
    if a.service_id != b.service_id || a.staff_id != b.staff_id || a.resource_id != b.resource_id {
        return Err(CoreError::Validation(
            "Only items with the same service, staff and resource can be merged".into(),
        ));
    }
    let (first, second) = if a.range.start <= b.range.start { (a, b) } else { (b, a) };
    if first.range.end != second.range.start {
        return Err(CoreError::Validation(
            "Only adjacent items can be merged".into(),
        ));
    }
    Ok(ItemSpan {
        range: TimeRange::new(first.range.start, second.range.end)?,
        ..*first
    })
}

/// Move every item by `delta`.
pub fn shift_items(items: &[ItemSpan], delta: Duration) -> Vec<ItemSpan> {
    items
        .iter()
        .map(|i| ItemSpan {
            range: i.range.shift(delta),
            ..*i
        })
        .collect()
}

/// Recover the booked service sequence from an appointment's items.
///
/// Steps and split parts of one service are contiguous items with the same
/// service id. They are folded into one entry until their combined length
/// reaches `service_minutes` for that service; the next item of the same
/// service then starts a repeated booking of it. A gap always starts a new
/// entry.
pub fn service_sequence(
    items: &[ItemSpan],
    service_minutes: impl Fn(DbId) -> Option<i64>,
) -> Vec<DbId> {
    let mut ordered: Vec<&ItemSpan> = items.iter().collect();
    ordered.sort_by_key(|i| i.range.start);

    let mut sequence = Vec::new();
    // (service, end of the last folded item, minutes folded so far)
    let mut current: Option<(DbId, Timestamp, i64)> = None;
    for item in ordered {
        let minutes = item.range.duration_minutes();
        match current.as_mut() {
            Some((service_id, end, filled))
                if *service_id == item.service_id
                    && *end == item.range.start
                    && service_minutes(item.service_id).map_or(true, |total| *filled + minutes <= total) =>
            {
                *end = item.range.end;
                *filled += minutes;
            }
            _ => {
                sequence.push(item.service_id);
                current = Some((item.service_id, item.range.end, minutes));
            }
        }
    }
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn item(service_id: DbId, staff_id: DbId, h1: u32, m1: u32, h2: u32, m2: u32) -> ItemSpan {
        ItemSpan {
            service_id,
            staff_id: Some(staff_id),
            resource_id: None,
            range: TimeRange::new(at(h1, m1), at(h2, m2)).unwrap(),
        }
    }

    #[test]
    fn bounds_span_all_items() {
        let bounds = appointment_bounds(&[item(1, 1, 10, 0, 10, 30), item(2, 2, 9, 30, 10, 0)]).unwrap();
        assert_eq!(bounds.start, at(9, 30));
        assert_eq!(bounds.end, at(10, 30));
    }

    #[test]
    fn bounds_require_an_item() {
        assert_matches!(appointment_bounds(&[]), Err(CoreError::Validation(_)));
    }

    #[test]
    fn last_item_is_not_removable() {
        assert!(ensure_removable(1).is_err());
        assert!(ensure_removable(2).is_ok());
    }

    #[test]
    fn split_produces_consecutive_parts() {
        let (a, b) = split_item(&item(1, 1, 9, 0, 10, 0), at(9, 20)).unwrap();
        assert_eq!(a.range.end, at(9, 20));
        assert_eq!(b.range.start, at(9, 20));
        assert_eq!(b.range.end, at(10, 0));
        assert_eq!(a.staff_id, b.staff_id);
    }

    #[test]
    fn split_rejects_tiny_parts() {
        assert!(split_item(&item(1, 1, 9, 0, 10, 0), at(9, 4)).is_err());
        assert!(split_item(&item(1, 1, 9, 0, 10, 0), at(9, 56)).is_err());
        assert!(split_item(&item(1, 1, 9, 0, 10, 0), at(11, 0)).is_err());
    }

    #[test]
    fn merge_adjacent_in_any_order() {
        let merged = merge_items(&item(1, 1, 9, 30, 10, 0), &item(1, 1, 9, 0, 9, 30)).unwrap();
        assert_eq!(merged.range.start, at(9, 0));
        assert_eq!(merged.range.end, at(10, 0));
    }

    #[test]
    fn merge_rejects_gap_or_mismatch() {
        assert!(merge_items(&item(1, 1, 9, 0, 9, 30), &item(1, 1, 9, 45, 10, 0)).is_err());
        assert!(merge_items(&item(1, 1, 9, 0, 9, 30), &item(1, 2, 9, 30, 10, 0)).is_err());
        assert!(merge_items(&item(1, 1, 9, 0, 9, 30), &item(2, 1, 9, 30, 10, 0)).is_err());
    }

    #[test]
    fn sequence_keeps_repeated_service() {
        let items = [item(1, 1, 9, 0, 10, 0), item(1, 1, 10, 0, 11, 0), item(2, 1, 11, 0, 11, 30)];
        let minutes = |id: DbId| Some(if id == 1 { 60 } else { 30 });
        assert_eq!(service_sequence(&items, minutes), vec![1, 1, 2]);
    }

    #[test]
    fn sequence_folds_split_parts_and_steps() {
        // A 60 minute service split at 09:20, then a two-step 60 minute service.
        let items = [
            item(1, 1, 9, 0, 9, 20),
            item(1, 1, 9, 20, 10, 0),
            item(2, 1, 10, 0, 10, 30),
            item(2, 2, 10, 30, 11, 0),
        ];
        assert_eq!(service_sequence(&items, |_| Some(60)), vec![1, 2]);
    }

    #[test]
    fn sequence_breaks_on_gap() {
        let items = [item(1, 1, 9, 0, 9, 20), item(1, 1, 9, 30, 10, 0)];
        assert_eq!(service_sequence(&items, |_| None), vec![1, 1]);
        assert!(service_sequence(&[], |_| None).is_empty());
    }

    #[test]
    fn shift_moves_every_item() {
        let shifted = shift_items(&[item(1, 1, 9, 0, 9, 30)], Duration::minutes(90));
        assert_eq!(shifted[0].range.start, at(10, 30));
    }
}
