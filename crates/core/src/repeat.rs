//! Repeat series: expanding a weekly rule into occurrences and choosing
//! which occurrences a change propagates to.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Hard cap on occurrences in one series, the first one included.
pub const MAX_OCCURRENCES: u32 = 52;
/// Longest allowed spacing between occurrences.
pub const MAX_EVERY_WEEKS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRule {
    pub every_weeks: u32,
    /// Total occurrences including the original appointment.
    pub count: Option<u32>,
    /// Last date (UTC) an occurrence may start on.
    pub until: Option<chrono::NaiveDate>,
}

impl RepeatRule {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.every_weeks == 0 || self.every_weeks > MAX_EVERY_WEEKS {
            return Err(CoreError::Validation(format!(
                "every_weeks must be between 1 and {MAX_EVERY_WEEKS}"
            )));
        }
        match (self.count, self.until) {
            (None, None) => Err(CoreError::Validation(
                "A repeat rule needs either a count or an end date".into(),
            )),
            (Some(c), _) if c < 2 || c > MAX_OCCURRENCES => Err(CoreError::Validation(format!(
                "count must be between 2 and {MAX_OCCURRENCES}"
            ))),
            _ => Ok(()),
        }
    }

    /// Start instants of the occurrences after the first one.
    pub fn following_starts(&self, first_start: Timestamp) -> Vec<Timestamp> {
        let limit = self.count.unwrap_or(MAX_OCCURRENCES).min(MAX_OCCURRENCES);
        (1..limit)
            .map(|n| first_start + Duration::weeks(i64::from(n * self.every_weeks)))
            .take_while(|start| self.until.map_or(true, |until| start.date_naive() <= until))
            .collect()
    }
}

/// Which occurrences a change to one occurrence applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationScope {
    This,
    Following,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesMember {
    pub appointment_id: DbId,
    pub index: u32,
}

/// Appointment ids affected by a change made to occurrence `current_index`.
pub fn select_members(
    members: &[SeriesMember],
    current_index: u32,
    scope: PropagationScope,
) -> Vec<DbId> {
    let mut selected: Vec<&SeriesMember> = members
        .iter()
        .filter(|m| match scope {
            PropagationScope::This => m.index == current_index,
            PropagationScope::Following => m.index >= current_index,
            PropagationScope::All => true,
        })
        .collect();
    selected.sort_by_key(|m| m.index);
    selected.into_iter().map(|m| m.appointment_id).collect()
}
