use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JourneyType {
    Outward,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    OnTime,
    Cancelled,
    Delayed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSegment {
    pub flight_number: String,
    pub route: String,
    pub date: NaiveDate,
    pub airline: String,
    pub journey_type: JourneyType,
    pub status: FlightStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub passenger_name: String,
    pub segments: Vec<FlightSegment>,
}

impl Itinerary {
    pub fn segment(&self, flight_number: &str) -> Option<&FlightSegment> {
        self.segments
            .iter()
            .find(|s| s.flight_number.eq_ignore_ascii_case(flight_number))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageLimit {
    pub limit: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub policy_number: String,
    pub policy_holder: String,
    pub policy_type: String,
    pub status: String,
    pub coverage: BTreeMap<String, CoverageLimit>,
}

impl PolicyRecord {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("ACTIVE")
    }
}

/// Source of a passenger's flight segments.
#[async_trait]
pub trait ItineraryProvider: Send + Sync {
    async fn itinerary(&self, passenger_id: &str) -> Result<Itinerary>;
}

/// Source of a passenger's policy record.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    async fn policy(&self, passenger_id: &str) -> Result<PolicyRecord>;
}

/// Coverage currency of the demo policies. Payouts use the flow currency instead.
pub const COVERAGE_CURRENCY: &str = "SGD";

struct Passenger {
    passport: &'static str,
    name: &'static str,
    policy_number: &'static str,
    policy_type: &'static str,
}

enum TravelDate {
    Today,
    InThreeDays,
    Fixed(i32, u32, u32),
}

struct SegmentRow {
    flight: &'static str,
    route: &'static str,
    date: TravelDate,
    airline: &'static str,
    journey: JourneyType,
}

const PREMIER: &str = "Income Travel Insurance - Premier Plan";
const SIA: &str = "Singapore Airlines";
const ANA: &str = "All Nippon Airways";

const PASSENGERS: &[Passenger] = &[
    Passenger { passport: "CSGHY654JK", name: "Rachel Ng", policy_number: "TRV-2026-001487", policy_type: PREMIER },
    Passenger { passport: "CSGHY456JK", name: "Broker Account", policy_number: "TRV-2026-001687", policy_type: "Income Travel Insurance - Business Plan" },
    Passenger { passport: "CSGHY623JK", name: "Mei Ling Chen", policy_number: "INC-TRV-2024-79045", policy_type: PREMIER },
    Passenger { passport: "CSGHY622JK", name: "Cheryl Chan", policy_number: "INC-TRV-2024-79145", policy_type: PREMIER },
    Passenger { passport: "CSGHY664JK", name: "Elizabeth Choy", policy_number: "INC-TRV-2024-79245", policy_type: PREMIER },
    Passenger { passport: "CSGHY224JK", name: "Kelly Pan", policy_number: "INC-TRV-2024-78946", policy_type: PREMIER },
    Passenger { passport: "CSGHY304JK", name: "Sophia Poh", policy_number: "INC-TRV-2024-79747", policy_type: PREMIER },
    Passenger { passport: "CSBNY384JK", name: "Emily Wong", policy_number: "INC-TRV-2024-79048", policy_type: PREMIER },
];

fn segment_rows(passport: &str) -> &'static [SegmentRow] {
    use JourneyType::{Outward, Return};
    use TravelDate::{Fixed, InThreeDays, Today};

    match passport {
        "CSGHY654JK" => &[
            SegmentRow { flight: "SQ882", route: "SIN → HAK", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "NH886", route: "HAK → NRT", date: Today, airline: ANA, journey: Outward },
            SegmentRow { flight: "NH885", route: "NRT → HAK", date: InThreeDays, airline: ANA, journey: Return },
            SegmentRow { flight: "SQ883", route: "HAK → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        "CSGHY456JK" => &[
            SegmentRow { flight: "SQ318", route: "SIN → LHR", date: Fixed(2025, 12, 18), airline: SIA, journey: Outward },
            SegmentRow { flight: "BA15", route: "LHR → SIN", date: Fixed(2025, 12, 22), airline: "British Airways", journey: Return },
        ],
        "CSGHY623JK" => &[
            SegmentRow { flight: "SQ636", route: "SIN → BKK", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "SQ637", route: "BKK → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        "CSGHY622JK" => &[
            SegmentRow { flight: "SQ178", route: "SIN → SYD", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "SQ179", route: "SYD → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        "CSGHY664JK" => &[
            SegmentRow { flight: "SQ254", route: "SIN → HKG", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "SQ255", route: "HKG → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        "CSGHY224JK" => &[
            SegmentRow { flight: "SQ231", route: "SIN → CDG", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "SQ232", route: "CDG → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        "CSGHY304JK" => &[
            SegmentRow { flight: "SQ828", route: "SIN → NRT", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "SQ829", route: "NRT → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        "CSBNY384JK" => &[
            SegmentRow { flight: "SQ322", route: "SIN → LHR", date: Today, airline: SIA, journey: Outward },
            SegmentRow { flight: "SQ321", route: "LHR → SIN", date: InThreeDays, airline: SIA, journey: Return },
        ],
        _ => &[],
    }
}

/// Fixed travel records for the demo passengers. Most segments are dated relative to
/// "today" so a freshly started session always has a current trip.
#[derive(Debug, Clone, Default)]
pub struct StaticTravelProvider {
    today: Option<NaiveDate>,
}

impl StaticTravelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins "today" instead of reading the clock.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn passenger(&self, passenger_id: &str) -> Result<&'static Passenger> {
        PASSENGERS
            .iter()
            .find(|p| p.passport.eq_ignore_ascii_case(passenger_id.trim()))
            .ok_or_else(|| {
                FlowError::ProviderUnavailable(format!("no travel record for passenger {passenger_id}"))
            })
    }

    fn resolve(&self, date: &TravelDate) -> Result<NaiveDate> {
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());
        let resolved = match date {
            TravelDate::Today => Some(today),
            TravelDate::InThreeDays => today.checked_add_days(Days::new(3)),
            TravelDate::Fixed(y, m, d) => NaiveDate::from_ymd_opt(*y, *m, *d),
        };
        resolved.ok_or_else(|| FlowError::ProviderUnavailable("segment date out of range".to_string()))
    }
}

#[async_trait]
impl ItineraryProvider for StaticTravelProvider {
    async fn itinerary(&self, passenger_id: &str) -> Result<Itinerary> {
        let passenger = self.passenger(passenger_id)?;
        let segments = segment_rows(passenger.passport)
            .iter()
            .map(|row| {
                Ok(FlightSegment {
                    flight_number: row.flight.to_string(),
                    route: row.route.to_string(),
                    date: self.resolve(&row.date)?,
                    airline: row.airline.to_string(),
                    journey_type: row.journey,
                    status: FlightStatus::OnTime,
                    status_reason: None,
                    terminal: None,
                    gate: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Itinerary {
            passenger_name: passenger.name.to_string(),
            segments,
        })
    }
}

#[async_trait]
impl PolicyProvider for StaticTravelProvider {
    async fn policy(&self, passenger_id: &str) -> Result<PolicyRecord> {
        let passenger = self.passenger(passenger_id)?;
        let coverage = [
            ("baggage_delay", 500u32),
            ("lost_documents", 1_000),
            ("medical_expense", 500_000),
        ]
        .into_iter()
        .map(|(name, limit)| {
            (
                name.to_string(),
                CoverageLimit {
                    limit: Decimal::from(limit),
                    currency: COVERAGE_CURRENCY.to_string(),
                },
            )
        })
        .collect();

        Ok(PolicyRecord {
            policy_number: passenger.policy_number.to_string(),
            policy_holder: passenger.name.to_string(),
            policy_type: passenger.policy_type.to_string(),
            status: "ACTIVE".to_string(),
            coverage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_itinerary_dates_follow_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let provider = StaticTravelProvider::with_today(today);

        let itinerary = provider.itinerary("CSGHY654JK").await.unwrap();
        assert_eq!(itinerary.passenger_name, "Rachel Ng");
        assert_eq!(itinerary.segments.len(), 4);
        assert_eq!(itinerary.segments[0].date, today);

        let return_leg = itinerary.segment("sq883").unwrap();
        assert_eq!(return_leg.route, "HAK → SIN");
        assert_eq!(return_leg.journey_type, JourneyType::Return);
        assert_eq!(return_leg.date, NaiveDate::from_ymd_opt(2026, 3, 13).unwrap());
    }

    #[tokio::test]
    async fn test_policy_carries_coverage_in_its_own_currency() {
        let provider = StaticTravelProvider::new();
        let policy = provider.policy("CSGHY654JK").await.unwrap();

        assert_eq!(policy.policy_number, "TRV-2026-001487");
        assert!(policy.is_active());
        let medical = &policy.coverage["medical_expense"];
        assert_eq!(medical.limit, Decimal::from(500_000));
        assert_eq!(medical.currency, "SGD");
    }

    #[tokio::test]
    async fn test_unknown_passenger_is_unavailable() {
        let provider = StaticTravelProvider::new();
        assert!(matches!(
            provider.itinerary("NOPE").await,
            Err(FlowError::ProviderUnavailable(_))
        ));
    }
}
