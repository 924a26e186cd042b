use std::sync::Arc;

use async_trait::async_trait;
use claims_flow::{
    Agent, ConversationEngine, DelayChoice, EngineConfig, ExecutionStatus, FlowCatalog,
    FlowError, FlowId, Itinerary, ItineraryProvider, MessageKind, Panel, PolicyProvider,
    PolicyRecord, Session, StaticTravelProvider, ValidationStatus,
};
use rust_decimal_macros::dec;

/// Fails every lookup.
struct Offline;

#[async_trait]
impl ItineraryProvider for Offline {
    async fn itinerary(&self, _passenger_id: &str) -> claims_flow::Result<Itinerary> {
        Err(FlowError::ProviderUnavailable("travel records offline".to_string()))
    }
}

#[async_trait]
impl PolicyProvider for Offline {
    async fn policy(&self, _passenger_id: &str) -> claims_flow::Result<PolicyRecord> {
        Err(FlowError::ProviderUnavailable("policy service offline".to_string()))
    }
}

fn engine_with(
    itineraries: Arc<dyn ItineraryProvider>,
    policies: Arc<dyn PolicyProvider>,
) -> ConversationEngine {
    let catalog = Arc::new(FlowCatalog::standard(&EngineConfig::default()).unwrap());
    ConversationEngine::new(catalog, itineraries, policies)
}

fn engine() -> ConversationEngine {
    let provider = Arc::new(StaticTravelProvider::new());
    engine_with(provider.clone(), provider)
}

async fn started(engine: &ConversationEngine) -> Session {
    let mut session = Session::new("session-1", "CSGHY654JK");
    engine.start(&mut session).await.unwrap();
    session
}

fn validation_steps(session: &Session) -> Vec<(String, ValidationStatus)> {
    session
        .timeline
        .iter()
        .filter_map(|m| match &m.kind {
            MessageKind::ValidationStep { name, status, .. } => Some((name.clone(), *status)),
            _ => None,
        })
        .collect()
}

fn agent_lines(session: &Session, who: Agent) -> Vec<String> {
    session
        .timeline
        .iter()
        .filter_map(|m| match &m.kind {
            MessageKind::AgentUtterance { agent, content } if *agent == who => Some(content.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn baggage_delay_claim_end_to_end() {
    let engine = engine();
    let mut session = started(&engine).await;
    let mut lengths = vec![session.timeline.len()];

    engine.select_option(&mut session, "baggage").await.unwrap();
    assert_eq!(session.step, "select-flight");
    assert!(session.timeline.iter().any(|m| matches!(
        m.kind,
        MessageKind::Panel(Panel::Itinerary(_))
    )));
    lengths.push(session.timeline.len());

    engine.select_flight(&mut session, "SQ883").await.unwrap();
    assert_eq!(session.step, "ask-delay-hours");
    lengths.push(session.timeline.len());

    engine
        .select_delay(&mut session, DelayChoice::Hours(24))
        .await
        .unwrap();
    assert_eq!(session.step, "upload-document");
    lengths.push(session.timeline.len());

    let result = engine.upload_document(&mut session, "pir.pdf").await.unwrap();
    lengths.push(session.timeline.len());

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(session.step, "complete");
    assert!(lengths.windows(2).all(|w| w[0] < w[1]));

    let steps = validation_steps(&session);
    assert_eq!(steps.len(), 6);
    assert!(steps.iter().all(|(_, s)| *s == ValidationStatus::Completed));
    assert_eq!(steps[5].0, "Claim Payment Amount Calculation");
    let last_description = session
        .timeline
        .validation_steps()
        .last()
        .map(|m| match &m.kind {
            MessageKind::ValidationStep { description, .. } => description.clone(),
            _ => String::new(),
        })
        .unwrap();
    assert_eq!(
        last_description,
        "Calculating claim payment: 24 hours ÷ 6 × $200 = $800"
    );

    let record = session.claim_record.as_ref().unwrap();
    assert_eq!(record.compensation_amount, dec!(800));
    assert_eq!(record.flight_number.as_deref(), Some("SQ883"));
    assert_eq!(record.reason, "Baggage delayed for 24 hours on flight SQ883");
    assert_eq!(record.policy_number, "TRV-2026-001487");
    assert_eq!(
        (record.intimated_at - record.incident_at).num_hours(),
        24
    );

    let panels: Vec<_> = session
        .timeline
        .iter()
        .filter_map(|m| match &m.kind {
            MessageKind::Panel(p) => Some(p),
            _ => None,
        })
        .collect();
    assert!(panels.iter().any(|p| matches!(p, Panel::ClaimInitiated { .. })));
    assert!(panels.iter().any(|p| matches!(
        p,
        Panel::PaymentDetails { compensation_amount, .. } if *compensation_amount == dec!(800)
    )));
    assert!(matches!(panels.last(), Some(Panel::ClaimSummary(_))));

    let closing = agent_lines(&session, Agent::Orchestrator).pop().unwrap();
    assert!(closing.starts_with("Your baggage delay claim has been successfully processed!"));
}

#[tokio::test]
async fn trip_cancellation_waits_for_four_documents() {
    let engine = engine();
    let mut session = started(&engine).await;

    engine.select_option(&mut session, "cancel-trip").await.unwrap();
    engine
        .select_reason(&mut session, "natural-disaster")
        .await
        .unwrap();
    assert_eq!(session.step, "upload-cancel-documents");
    assert!(session.timeline.iter().any(|m| matches!(
        &m.kind,
        MessageKind::Panel(Panel::DocumentChecklist { items, .. }) if items.len() == 4
    )));

    for (i, file) in ["admin.pdf", "transport.pdf", "hotel.pdf"].iter().enumerate() {
        engine.upload_document(&mut session, file).await.unwrap();
        assert_eq!(session.step, "upload-cancel-documents");
        assert_eq!(session.collected_documents.len(), i + 1);

        let err = engine.proceed_to_validation(&mut session).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidTransition { .. }));
    }
    let progress = agent_lines(&session, Agent::TripChange).pop().unwrap();
    assert_eq!(
        progress,
        "Document received (3/4). Please upload 1 more document to proceed with your claim."
    );

    engine.upload_document(&mut session, "refund.pdf").await.unwrap();
    assert_eq!(session.step, "cancel-ready-to-proceed");
    let ready = agent_lines(&session, Agent::TripChange).pop().unwrap();
    assert_eq!(
        ready,
        "All 4 required documents received! You can now proceed with your claim or optionally upload a Death Certificate."
    );

    let result = engine.proceed_to_validation(&mut session).await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(validation_steps(&session).len(), 6);

    let record = session.claim_record.as_ref().unwrap();
    assert_eq!(record.compensation_amount, dec!(1000));
    assert_eq!(record.reason, "Trip Cancellation due to Natural Disaster");
    assert!(record.flight_number.is_none());
}

#[tokio::test]
async fn trip_disruption_validates_on_fourth_upload() {
    let engine = engine();
    let mut session = started(&engine).await;

    engine.select_option(&mut session, "trip-disruption").await.unwrap();
    engine
        .select_reason(&mut session, "serious-sickness")
        .await
        .unwrap();
    for file in ["cardiac.pdf", "tickets.pdf", "hotel.pdf"] {
        engine.upload_document(&mut session, file).await.unwrap();
    }
    assert_eq!(session.step, "upload-disruption-documents");

    let result = engine.upload_document(&mut session, "refund.pdf").await.unwrap();
    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(
        session.claim_record.as_ref().unwrap().compensation_amount,
        dec!(1500)
    );
}

#[tokio::test]
async fn reset_twice_matches_reset_once() {
    let engine = engine();
    let mut session = started(&engine).await;
    engine.select_option(&mut session, "baggage").await.unwrap();
    engine.select_flight(&mut session, "SQ882").await.unwrap();

    engine.reset_session(&mut session).await.unwrap();
    let once = session.clone();
    engine.reset_session(&mut session).await.unwrap();

    let shape = |s: &Session| {
        (
            s.step.clone(),
            s.flow,
            s.menu.clone(),
            s.collected_documents.clone(),
            s.claim_record.clone(),
            s.timeline.iter().map(|m| m.kind.clone()).collect::<Vec<_>>(),
        )
    };
    assert_eq!(shape(&once), shape(&session));
    assert_eq!(session.flow, None);
    assert_eq!(session.menu.len(), 13);
}

#[tokio::test]
async fn policy_outage_offers_reduced_menu() {
    let provider = Arc::new(StaticTravelProvider::new());
    let engine = engine_with(provider, Arc::new(Offline));
    let mut session = Session::new("session-2", "CSGHY654JK");

    let err = engine.start(&mut session).await.unwrap_err();
    assert!(err.is_surfaced_in_timeline());
    assert_eq!(session.step, "options");
    assert!(session.policy.is_none());
    assert!(!session.menu.contains(&FlowId::Baggage));
    assert!(session.menu.contains(&FlowId::Medical));

    let err = engine.select_option(&mut session, "baggage").await.unwrap_err();
    assert!(matches!(err, FlowError::InvalidOption { .. }));
}

#[tokio::test]
async fn itinerary_outage_returns_to_menu() {
    let provider = Arc::new(StaticTravelProvider::new());
    let engine = engine_with(Arc::new(Offline), provider);
    let mut session = started(&engine).await;

    let err = engine.select_option(&mut session, "baggage").await.unwrap_err();
    assert!(matches!(err, FlowError::ProviderUnavailable(_)));
    assert_eq!(session.step, "options");
    assert_eq!(session.flow, None);

    let apology = agent_lines(&session, Agent::Baggage).pop().unwrap();
    assert_eq!(apology, "I couldn't fetch your itinerary. Please try again later.");
    assert!(session.timeline.iter().any(|m| matches!(
        m.kind,
        MessageKind::ApiResult { success: false, .. }
    )));

    // the menu still works afterwards
    engine.select_option(&mut session, "medical").await.unwrap();
    assert_eq!(session.step, "select-medical-type");
}
