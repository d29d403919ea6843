//! Fixed in-memory shift plan.

use std::collections::HashMap;

use async_trait::async_trait;
use salon_core::intervals::{normalize, TimeRange};

use crate::provider::{ShiftPlanError, ShiftPlanProvider, Shifts};

/// Serves shifts from a map. Employees not in the map are unknown.
#[derive(Debug, Clone, Default)]
pub struct StaticShiftPlan {
    shifts: HashMap<String, Vec<TimeRange>>,
}

impl StaticShiftPlan {
    pub fn new(shifts: HashMap<String, Vec<TimeRange>>) -> Self {
        Self { shifts }
    }

    pub fn with_shifts(mut self, employee_id: impl Into<String>, shifts: Vec<TimeRange>) -> Self {
        self.shifts.insert(employee_id.into(), shifts);
        self
    }
}

#[async_trait]
impl ShiftPlanProvider for StaticShiftPlan {
    async fn fetch_shifts(
        &self,
        employee_ids: &[String],
        range: TimeRange,
    ) -> Result<Shifts, ShiftPlanError> {
        Ok(employee_ids
            .iter()
            .filter_map(|id| {
                let planned = self.shifts.get(id)?;
                let overlapping = planned.iter().filter(|s| s.overlaps(&range)).copied().collect();
                Some((id.clone(), normalize(overlapping)))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn range(h1: u32, h2: u32) -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2026, 3, 2, h1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, h2, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn returns_only_known_employees_and_overlapping_shifts() {
        let plan = StaticShiftPlan::default()
            .with_shifts("E-1", vec![range(8, 12), range(18, 20)])
            .with_shifts("E-2", vec![]);

        let shifts = plan
            .fetch_shifts(&["E-1".into(), "E-2".into(), "E-3".into()], range(9, 17))
            .await
            .unwrap();

        assert_eq!(shifts.get("E-1"), Some(&vec![range(8, 12)]));
        assert_eq!(shifts.get("E-2"), Some(&vec![]));
        assert!(!shifts.contains_key("E-3"));
    }
}
