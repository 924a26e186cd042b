use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimType {
    BaggageDelay,
    BaggageLossDamage,
    LostTravelDocuments,
    MedicalEmergency,
    TripPostponement,
    TripCancellation,
    TripShortening,
    TripDisruption,
}

impl ClaimType {
    pub fn label(&self) -> &'static str {
        match self {
            ClaimType::BaggageDelay => "Baggage Delay",
            ClaimType::BaggageLossDamage => "Baggage Loss/Damage",
            ClaimType::LostTravelDocuments => "Lost Travel Documents",
            ClaimType::MedicalEmergency => "Medical Emergency",
            ClaimType::TripPostponement => "Trip Postponement",
            ClaimType::TripCancellation => "Trip Cancellation",
            ClaimType::TripShortening => "Trip Shortening",
            ClaimType::TripDisruption => "Trip Disruption",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The approved claim. Written once when validation succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claim_number: String,
    pub claim_type: ClaimType,
    pub reason: String,
    pub incident_at: DateTime<Utc>,
    pub intimated_at: DateTime<Utc>,
    pub policy_number: String,
    pub flight_number: Option<String>,
    pub compensation_amount: Decimal,
    pub currency: String,
}

impl ClaimRecord {
    /// Payout formatted for display, e.g. `$800.00`.
    pub fn formatted_amount(&self) -> String {
        format_amount(&self.currency, self.compensation_amount)
    }
}

pub fn format_amount(currency: &str, amount: Decimal) -> String {
    format!("{currency}{:.2}", amount)
}

/// `CLM-TRV-<year>-<6 digits>`. Random, not guaranteed unique.
pub fn generate_claim_number(at: DateTime<Utc>) -> String {
    let digits = rand::rng().random_range(100_000..=999_999);
    format!("CLM-TRV-{}-{}", at.year(), digits)
}
