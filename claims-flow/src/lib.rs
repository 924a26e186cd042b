pub mod catalog;
pub mod claim;
pub mod compensation;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod message;
pub mod pacing;
pub mod provider;
pub mod runner;
pub mod scope;
pub mod session;
pub mod storage;
pub mod template;
pub mod timeline;
pub mod transcript;
pub mod validation;

// Re-export commonly used types
pub use catalog::FlowCatalog;
pub use claim::{ClaimRecord, ClaimType};
pub use compensation::{CompensationRule, DelayChoice, QuickDelay};
pub use config::EngineConfig;
pub use engine::{Action, ConversationEngine, ExecutionResult, ExecutionStatus};
pub use error::{FlowError, Result};
pub use flow::{FlowBuilder, FlowDefinition, FlowId, FlowStep, StepKind};
pub use message::{Agent, Message, MessageKind, Panel, ValidationStatus};
pub use pacing::{Beat, NoPacing, Pacer, TokioPacer};
pub use provider::{
    FlightSegment, Itinerary, ItineraryProvider, PolicyProvider, PolicyRecord,
    StaticTravelProvider,
};
pub use runner::{ConversationRunner, RunOutcome};
pub use scope::{ActionScope, CancelSignal, ProgressSink};
pub use session::Session;
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use timeline::Timeline;
pub use validation::{ValidationOutcome, ValidationRunner};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_simple_claim_execution() {
        let provider = Arc::new(StaticTravelProvider::new());
        let catalog = Arc::new(FlowCatalog::standard(&EngineConfig::default()).unwrap());
        let engine = ConversationEngine::new(catalog, provider.clone(), provider);

        let mut session = Session::new("test_session", "CSGHY623JK");
        engine.start(&mut session).await.unwrap();
        engine.select_option(&mut session, "shorten-docs").await.unwrap();
        let result = engine.upload_document(&mut session, "receipt.pdf").await.unwrap();

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.step, "complete");
        let record = session.claim_record.unwrap();
        assert_eq!(record.claim_type, ClaimType::TripShortening);
        assert_eq!(record.policy_number, "INC-TRV-2024-79045");
    }
}
