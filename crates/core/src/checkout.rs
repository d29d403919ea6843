//! Online checkout input: validation and contact normalization.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use crate::consent::ConsentType;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Separators customers commonly type into phone numbers.
static PHONE_SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-()./]").expect("valid regex"));

/// Optional leading `+`, then 6 to 15 digits (E.164 length bound).
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{6,15}$").expect("valid regex"));

static IDEMPOTENCY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_:\-]+$").expect("valid regex"));

/// Customer-supplied contact details.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
}

/// Body of `POST /public/locations/{id}/checkout`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutInput {
    #[validate(length(min = 1, max = 10))]
    pub service_ids: Vec<DbId>,
    pub start: Timestamp,
    pub staff_id: Option<DbId>,
    #[validate(nested)]
    pub customer: CustomerDetails,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Client-generated key; replays with the same key return the same booking.
    #[validate(length(min = 8, max = 128))]
    pub idempotency_key: String,
    #[serde(default)]
    pub consents: Vec<ConsentType>,
}

/// Contact details after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContact {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CheckoutInput {
    /// Run field validation and return normalized contact details.
    pub fn validate_and_normalize(&self) -> Result<NormalizedContact, CoreError> {
        self.validate()?;

        if !IDEMPOTENCY_KEY_RE.is_match(&self.idempotency_key) {
            return Err(CoreError::Validation(
                "idempotency_key may only contain letters, digits, '-', '_' and ':'".into(),
            ));
        }

        let email = self.customer.email.as_deref().and_then(normalize_email);
        let phone = match self.customer.phone.as_deref() {
            Some(raw) => Some(normalize_phone(raw).ok_or_else(|| {
                CoreError::Validation(format!("Invalid phone number: {raw}"))
            })?),
            None => None,
        };
        if email.is_none() && phone.is_none() {
            return Err(CoreError::Validation(
                "Either an email address or a phone number is required".into(),
            ));
        }

        Ok(NormalizedContact {
            first_name: self.customer.first_name.trim().to_string(),
            last_name: self.customer.last_name.trim().to_string(),
            email,
            phone,
        })
    }
}

/// Strip separators, turn a `00` international prefix into `+`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let stripped = PHONE_SEPARATORS_RE.replace_all(raw.trim(), "");
    let phone = match stripped.strip_prefix("00") {
        Some(rest) => format!("+{rest}"),
        None => stripped.into_owned(),
    };
    PHONE_RE.is_match(&phone).then_some(phone)
}

pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    (!email.is_empty()).then_some(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn input(customer: serde_json::Value) -> CheckoutInput {
        serde_json::from_value(json!({
            "service_ids": [1],
            "start": "2026-03-02T09:00:00Z",
            "customer": customer,
            "idempotency_key": "checkout-0001",
        }))
        .unwrap()
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("+49 (170) 123-4567").as_deref(), Some("+491701234567"));
        assert_eq!(normalize_phone("0049 170 1234567").as_deref(), Some("+491701234567"));
        assert_eq!(normalize_phone("0170/1234567").as_deref(), Some("01701234567"));
        assert!(normalize_phone("call me").is_none());
        assert!(normalize_phone("123").is_none());
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(normalize_email("  Anna@Example.COM ").as_deref(), Some("anna@example.com"));
        assert!(normalize_email("   ").is_none());
    }

    #[test]
    fn valid_input_normalizes_contact() {
        let contact = input(json!({
            "first_name": " Anna ",
            "last_name": "Muster",
            "email": "Anna@Example.com",
        }))
        .validate_and_normalize()
        .unwrap();
        assert_eq!(contact.first_name, "Anna");
        assert_eq!(contact.email.as_deref(), Some("anna@example.com"));
        assert!(contact.phone.is_none());
    }

    #[test]
    fn contact_channel_required() {
        let result = input(json!({ "first_name": "Anna", "last_name": "Muster" })).validate_and_normalize();
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("email address or a phone"));
    }

    #[test]
    fn invalid_email_is_rejected() {
        let result = input(json!({
            "first_name": "Anna",
            "last_name": "Muster",
            "email": "not-an-email",
        }))
        .validate_and_normalize();
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn invalid_phone_is_rejected() {
        let result = input(json!({
            "first_name": "Anna",
            "last_name": "Muster",
            "phone": "abc-def-ghij",
        }))
        .validate_and_normalize();
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("phone"));
    }

    #[test]
    fn short_idempotency_key_is_rejected() {
        let mut checkout = input(json!({ "first_name": "A", "last_name": "B", "phone": "+4917012345" }));
        checkout.idempotency_key = "short".into();
        assert!(checkout.validate_and_normalize().is_err());

        checkout.idempotency_key = "has spaces in it".into();
        assert!(checkout.validate_and_normalize().is_err());
    }

    #[test]
    fn empty_service_list_is_rejected() {
        let mut checkout = input(json!({ "first_name": "A", "last_name": "B", "phone": "+4917012345" }));
        checkout.service_ids.clear();
        assert!(checkout.validate_and_normalize().is_err());
    }
}
