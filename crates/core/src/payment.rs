//! Payment status and its declared transition table.
//!
//! ```text
//! UNPAID             -> PENDING, PAID, PARTIALLY_PAID
//! PENDING            -> PAID, PARTIALLY_PAID, FAILED, UNPAID
//! PARTIALLY_PAID     -> PAID, PARTIALLY_REFUNDED, REFUNDED
//! PAID               -> PARTIALLY_REFUNDED, REFUNDED
//! FAILED             -> PENDING, UNPAID
//! PARTIALLY_REFUNDED -> REFUNDED
//! REFUNDED           -> (terminal)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
    PartiallyPaid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    /// Return the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }

    /// Parse a status string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(Self::Unpaid),
            "PENDING" => Some(Self::Pending),
            "PAID" => Some(Self::Paid),
            "PARTIALLY_PAID" => Some(Self::PartiallyPaid),
            "FAILED" => Some(Self::Failed),
            "REFUNDED" => Some(Self::Refunded),
            "PARTIALLY_REFUNDED" => Some(Self::PartiallyRefunded),
            _ => None,
        }
    }

    /// All valid status values.
    pub const ALL: &'static [&'static str] = &[
        "UNPAID",
        "PENDING",
        "PAID",
        "PARTIALLY_PAID",
        "FAILED",
        "REFUNDED",
        "PARTIALLY_REFUNDED",
    ];

    pub fn valid_transitions(&self) -> &'static [PaymentStatus] {
        match self {
            Self::Unpaid => &[Self::Pending, Self::Paid, Self::PartiallyPaid],
            Self::Pending => &[Self::Paid, Self::PartiallyPaid, Self::Failed, Self::Unpaid],
            Self::PartiallyPaid => &[Self::Paid, Self::PartiallyRefunded, Self::Refunded],
            Self::Paid => &[Self::PartiallyRefunded, Self::Refunded],
            Self::Failed => &[Self::Pending, Self::Unpaid],
            Self::PartiallyRefunded => &[Self::Refunded],
            Self::Refunded => &[],
        }
    }

    pub fn can_transition(&self, to: PaymentStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Same-state changes are rejected along with undeclared ones.
    pub fn validate_transition(&self, to: PaymentStatus) -> Result<(), CoreError> {
        if *self == to {
            return Err(CoreError::Validation(format!(
                "Payment status is already {self}"
            )));
        }
        if !self.can_transition(to) {
            return Err(CoreError::Validation(format!(
                "Invalid payment status transition: {self} -> {to}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unpaid_to_paid() {
        assert!(PaymentStatus::Unpaid.can_transition(PaymentStatus::Paid));
    }

    #[test]
    fn unpaid_cannot_be_refunded() {
        assert!(!PaymentStatus::Unpaid.can_transition(PaymentStatus::Refunded));
    }

    #[test]
    fn pending_can_fail_and_retry() {
        assert!(PaymentStatus::Pending.can_transition(PaymentStatus::Failed));
        assert!(PaymentStatus::Failed.can_transition(PaymentStatus::Pending));
    }

    #[test]
    fn paid_can_only_be_refunded() {
        assert_eq!(
            PaymentStatus::Paid.valid_transitions(),
            &[PaymentStatus::PartiallyRefunded, PaymentStatus::Refunded]
        );
    }

    #[test]
    fn refunded_is_terminal() {
        assert!(PaymentStatus::Refunded.valid_transitions().is_empty());
    }

    #[test]
    fn same_state_is_rejected() {
        assert_matches!(
            PaymentStatus::Paid.validate_transition(PaymentStatus::Paid),
            Err(CoreError::Validation(msg)) if msg.contains("already")
        );
    }

    #[test]
    fn undeclared_transition_is_rejected() {
        let err = PaymentStatus::Refunded
            .validate_transition(PaymentStatus::Paid)
            .unwrap_err();
        assert!(err.to_string().contains("REFUNDED -> PAID"));
    }

    #[test]
    fn every_status_round_trips() {
        for name in PaymentStatus::ALL {
            assert_eq!(PaymentStatus::from_str(name).unwrap().as_str(), *name);
        }
    }
}
