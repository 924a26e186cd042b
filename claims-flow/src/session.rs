use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    claim::ClaimRecord,
    compensation::DelayChoice,
    error::{FlowError, Result},
    flow::FlowId,
    provider::{Itinerary, PolicyRecord},
    timeline::Timeline,
};

pub const WELCOME: &str = "welcome";
pub const OPTIONS: &str = "options";
pub const COMPLETE: &str = "complete";

/// The single active conversation with one passenger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub passenger_id: String,
    pub step: String,
    pub flow: Option<FlowId>,
    pub menu: Vec<FlowId>,
    pub timeline: Timeline,
    pub collected_documents: Vec<String>,
    pub optional_document: Option<String>,
    pub selected_flight: Option<String>,
    pub selected_reason: Option<String>,
    pub delay: Option<DelayChoice>,
    pub policy: Option<PolicyRecord>,
    pub itinerary: Option<Itinerary>,
    pub claim_record: Option<ClaimRecord>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, passenger_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            passenger_id: passenger_id.into(),
            step: WELCOME.to_string(),
            flow: None,
            menu: Vec::new(),
            timeline: Timeline::new(),
            collected_documents: Vec::new(),
            optional_document: None,
            selected_flight: None,
            selected_reason: None,
            delay: None,
            policy: None,
            itinerary: None,
            claim_record: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_generated_id(passenger_id: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), passenger_id)
    }

    pub fn is_complete(&self) -> bool {
        self.step == COMPLETE
    }

    /// Makes `flow` the active flow and clears everything collected for a previous one.
    pub(crate) fn activate(&mut self, flow: FlowId) {
        self.flow = Some(flow);
        self.clear_flow_state();
    }

    /// Drops the active flow and returns to the menu.
    pub(crate) fn deactivate(&mut self) {
        self.flow = None;
        self.clear_flow_state();
        self.step = OPTIONS.to_string();
    }

    fn clear_flow_state(&mut self) {
        self.collected_documents.clear();
        self.optional_document = None;
        self.selected_flight = None;
        self.selected_reason = None;
        self.delay = None;
    }

    pub(crate) fn record_claim(&mut self, record: ClaimRecord) -> Result<&ClaimRecord> {
        if let Some(existing) = &self.claim_record {
            return Err(FlowError::TimelineInvariant(format!(
                "claim {} is already recorded",
                existing.claim_number
            )));
        }
        Ok(self.claim_record.insert(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimType;
    use rust_decimal_macros::dec;

    fn record(number: &str) -> ClaimRecord {
        ClaimRecord {
            claim_number: number.to_string(),
            claim_type: ClaimType::MedicalEmergency,
            reason: "Medical emergency during travel (Hospitalization)".to_string(),
            incident_at: Utc::now(),
            intimated_at: Utc::now(),
            policy_number: "TRV-2026-001487".to_string(),
            flight_number: None,
            compensation_amount: dec!(2500),
            currency: "$".to_string(),
        }
    }

    #[test]
    fn test_new_session_starts_in_welcome() {
        let session = Session::with_generated_id("CSGHY654JK");
        assert_eq!(session.step, WELCOME);
        assert!(session.timeline.is_empty());
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_claim_record_is_written_once() {
        let mut session = Session::new("s-1", "CSGHY654JK");
        session.record_claim(record("CLM-TRV-2026-123456")).unwrap();

        assert!(session.record_claim(record("CLM-TRV-2026-654321")).is_err());
        assert_eq!(
            session.claim_record.as_ref().unwrap().claim_number,
            "CLM-TRV-2026-123456"
        );
    }

    #[test]
    fn test_activating_a_flow_clears_previous_answers() {
        let mut session = Session::new("s-1", "CSGHY654JK");
        session.activate(FlowId::Baggage);
        session.selected_flight = Some("SQ883".to_string());
        session.delay = Some(DelayChoice::Hours(24));

        session.activate(FlowId::CancelTrip);
        assert_eq!(session.flow, Some(FlowId::CancelTrip));
        assert!(session.selected_flight.is_none());
        assert!(session.delay.is_none());
    }
}
