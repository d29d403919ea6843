//! Customer consent tracking.
//!
//! Consents are an append-only history of GRANTED / REVOKED events per
//! type. The current state of a type is its most recent event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    Terms,
    MarketingEmail,
    MarketingSms,
    MarketingWhatsapp,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terms => "terms",
            Self::MarketingEmail => "marketing_email",
            Self::MarketingSms => "marketing_sms",
            Self::MarketingWhatsapp => "marketing_whatsapp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "terms" => Some(Self::Terms),
            "marketing_email" => Some(Self::MarketingEmail),
            "marketing_sms" => Some(Self::MarketingSms),
            "marketing_whatsapp" => Some(Self::MarketingWhatsapp),
            _ => None,
        }
    }

    pub const ALL: &'static [&'static str] =
        &["terms", "marketing_email", "marketing_sms", "marketing_whatsapp"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentAction {
    Granted,
    Revoked,
}

impl ConsentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::Revoked => "REVOKED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GRANTED" => Some(Self::Granted),
            "REVOKED" => Some(Self::Revoked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentEvent {
    pub consent_type: ConsentType,
    pub action: ConsentAction,
    pub at: Timestamp,
}

/// Current state per consent type. Types never mentioned are absent.
///
/// Events with equal timestamps resolve in slice order.
pub fn current_consents(events: &[ConsentEvent]) -> BTreeMap<ConsentType, bool> {
    let mut ordered: Vec<&ConsentEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.at);

    let mut state = BTreeMap::new();
    for event in ordered {
        state.insert(event.consent_type, event.action == ConsentAction::Granted);
    }
    state
}

pub fn is_granted(events: &[ConsentEvent], consent_type: ConsentType) -> bool {
    current_consents(events)
        .get(&consent_type)
        .copied()
        .unwrap_or(false)
}
