use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claim::ClaimRecord;
use crate::provider::{Itinerary, PolicyRecord};

/// Persona that authored an agent utterance or a validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Agent {
    Orchestrator,
    Baggage,
    BaggageLoss,
    Documents,
    Medical,
    TripChange,
    TripDisruption,
    Claims,
    Payment,
}

impl Agent {
    pub fn display_name(&self) -> &'static str {
        match self {
            Agent::Orchestrator => "Jiffy Jane",
            Agent::Baggage => "Baggage Claims Agent",
            Agent::BaggageLoss => "Baggage Loss/Damage Agent",
            Agent::Documents => "Document Claims Agent",
            Agent::Medical => "Medical Claims Agent",
            Agent::TripChange => "Trip Change Agent",
            Agent::TripDisruption => "Trip Disruption Agent",
            Agent::Claims => "Claim Processing Agent",
            Agent::Payment => "Payment Processing Agent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationStatus {
    Processing,
    Completed,
}

/// Structured payloads rendered as cards rather than chat bubbles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "panel", rename_all = "kebab-case")]
pub enum Panel {
    Itinerary(Itinerary),
    PolicyInfo(PolicyRecord),
    ClaimInitiated {
        claim_number: String,
        subject: String,
        flight_number: Option<String>,
        delay: Option<String>,
    },
    PaymentDetails {
        claim_number: String,
        policy_number: String,
        compensation_amount: Decimal,
        currency: String,
    },
    ClaimSummary(ClaimRecord),
    DocumentChecklist {
        title: String,
        items: Vec<String>,
        optional: Option<String>,
    },
    /// A panel kind added by a newer engine.
    #[serde(other)]
    Unknown,
}

/// What a timeline entry is. Serialized with a `type` tag; tags this build does not know
/// about deserialize into [`MessageKind::Unknown`] so readers never fail on newer timelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageKind {
    SystemNote {
        content: String,
    },
    UserEcho {
        content: String,
    },
    AgentUtterance {
        agent: Agent,
        content: String,
    },
    ApiCall {
        agent: Agent,
        operation: String,
        target: String,
    },
    ApiResult {
        agent: Agent,
        operation: String,
        success: bool,
        summary: String,
    },
    ValidationStep {
        agent: Agent,
        step: usize,
        total: usize,
        name: String,
        description: String,
        status: ValidationStatus,
    },
    Panel(Panel),
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    pub fn agent(&self) -> Option<Agent> {
        match self {
            MessageKind::AgentUtterance { agent, .. }
            | MessageKind::ApiCall { agent, .. }
            | MessageKind::ApiResult { agent, .. }
            | MessageKind::ValidationStep { agent, .. } => Some(*agent),
            _ => None,
        }
    }

    /// Kebab-case tag, identical to the serialized `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::SystemNote { .. } => "system-note",
            MessageKind::UserEcho { .. } => "user-echo",
            MessageKind::AgentUtterance { .. } => "agent-utterance",
            MessageKind::ApiCall { .. } => "api-call",
            MessageKind::ApiResult { .. } => "api-result",
            MessageKind::ValidationStep { .. } => "validation-step",
            MessageKind::Panel(_) => "panel",
            MessageKind::Unknown => "unknown",
        }
    }
}

/// A single entry of the conversation timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::SystemNote {
            content: content.into(),
        })
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::UserEcho {
            content: content.into(),
        })
    }

    pub fn agent(agent: Agent, content: impl Into<String>) -> Self {
        Self::new(MessageKind::AgentUtterance {
            agent,
            content: content.into(),
        })
    }

    pub fn panel(panel: Panel) -> Self {
        Self::new(MessageKind::Panel(panel))
    }

    pub fn is_processing_step(&self) -> bool {
        matches!(
            self.kind,
            MessageKind::ValidationStep {
                status: ValidationStatus::Processing,
                ..
            }
        )
    }
}
