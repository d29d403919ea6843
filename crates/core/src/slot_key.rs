//! Deterministic slot keys and claim lifetime.
//!
//! A slot key identifies "this exact combination of staff, resources and
//! times at this location". Two checkouts racing for the same computed slot
//! produce the same key, which the `booking_slot_claims` table uses as its
//! uniqueness constraint.

use chrono::Duration;
use sha2::{Digest, Sha256};

use crate::availability::StepAssignment;
use crate::types::{DbId, Timestamp};

/// Default lifetime of a slot claim in seconds.
pub const DEFAULT_CLAIM_TTL_SECS: i64 = 120;

/// Hex-encoded SHA-256 over the canonical form of the assignments.
pub fn slot_key(location_id: DbId, assignments: &[StepAssignment]) -> String {
    let mut parts: Vec<String> = assignments
        .iter()
        .map(|a| {
            format!(
                "{}:{}:{}-{}",
                a.staff_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                a.resource_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                a.blocked.start.timestamp(),
                a.blocked.end.timestamp(),
            )
        })
        .collect();
    parts.sort();

    let canonical = format!("loc:{location_id}|{}", parts.join("|"));
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// When a claim taken at `claimed_at` stops protecting its slot.
pub fn claim_expiry(claimed_at: Timestamp, ttl_secs: i64) -> Timestamp {
    claimed_at + Duration::seconds(ttl_secs.max(1))
}
