use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    claim::ClaimType,
    compensation::{CompensationRule, DelayChoice, QuickDelay},
    error::{FlowError, Result},
    message::Agent,
};

/// Menu option ids. Each one selects exactly one [`FlowDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowId {
    Baggage,
    BaggageLoss,
    Documents,
    Medical,
    PostponeTrip,
    CancelTrip,
    ShortenTrip,
    TripDisruption,
    BaggageLossDocs,
    PostponeDocs,
    CancelDocs,
    ShortenDocs,
    DisruptionDocs,
}

impl FlowId {
    pub const ALL: [FlowId; 13] = [
        FlowId::Baggage,
        FlowId::BaggageLoss,
        FlowId::Documents,
        FlowId::Medical,
        FlowId::PostponeTrip,
        FlowId::CancelTrip,
        FlowId::ShortenTrip,
        FlowId::TripDisruption,
        FlowId::BaggageLossDocs,
        FlowId::PostponeDocs,
        FlowId::CancelDocs,
        FlowId::ShortenDocs,
        FlowId::DisruptionDocs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowId::Baggage => "baggage",
            FlowId::BaggageLoss => "baggage-loss",
            FlowId::Documents => "documents",
            FlowId::Medical => "medical",
            FlowId::PostponeTrip => "postpone-trip",
            FlowId::CancelTrip => "cancel-trip",
            FlowId::ShortenTrip => "shorten-trip",
            FlowId::TripDisruption => "trip-disruption",
            FlowId::BaggageLossDocs => "baggage-loss-docs",
            FlowId::PostponeDocs => "postpone-docs",
            FlowId::CancelDocs => "cancel-docs",
            FlowId::ShortenDocs => "shorten-docs",
            FlowId::DisruptionDocs => "disruption-docs",
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowId {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        FlowId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| FlowError::UnknownFlow(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonOption {
    pub code: String,
    pub label: String,
}

impl ReasonOption {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub description: String,
}

impl ValidationCheck {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Longest custom delay a passenger can report, 30 days.
pub const MAX_DELAY_HOURS: u32 = 720;

/// Which delay answers a delay step accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "kebab-case")]
pub enum DelayOptions {
    Hours { presets: Vec<u32>, allow_custom: bool },
    Quick { options: Vec<QuickDelay> },
}

impl DelayOptions {
    pub fn accepts(&self, choice: &DelayChoice) -> bool {
        match (self, choice) {
            (_, DelayChoice::Hours(h)) if *h == 0 || *h > MAX_DELAY_HOURS => false,
            (
                DelayOptions::Hours {
                    presets,
                    allow_custom,
                },
                DelayChoice::Hours(h),
            ) => *allow_custom || presets.contains(h),
            (DelayOptions::Quick { options }, DelayChoice::Option(q)) => options.contains(q),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepKind {
    SelectFlight,
    SelectDelay(DelayOptions),
    SelectReason,
    /// One file moves the flow one step forward.
    UploadSingle,
    /// Accumulates files until the flow's required count is reached.
    UploadBatch,
    ReadyToProceed,
    Validating,
}

impl StepKind {
    pub fn is_upload(&self) -> bool {
        matches!(self, StepKind::UploadSingle | StepKind::UploadBatch)
    }
}

/// Something said or shown when a step becomes current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cue {
    Say(String),
    ShowItinerary,
    Checklist {
        title: String,
        items: Vec<String>,
        optional: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    pub id: String,
    pub kind: StepKind,
    pub on_enter: Vec<Cue>,
}

impl FlowStep {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            on_enter: Vec::new(),
        }
    }

    pub fn say(mut self, line: impl Into<String>) -> Self {
        self.on_enter.push(Cue::Say(line.into()));
        self
    }

    pub fn show_itinerary(mut self) -> Self {
        self.on_enter.push(Cue::ShowItinerary);
        self
    }

    pub fn checklist(
        mut self,
        title: impl Into<String>,
        items: &[&str],
        optional: Option<&str>,
    ) -> Self {
        self.on_enter.push(Cue::Checklist {
            title: title.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
            optional: optional.map(str::to_string),
        });
        self
    }
}

pub const DEFAULT_PROGRESS_NOTE: &str =
    "Document received ({count}/{required}). Please upload {remaining} more document{plural} to proceed with your claim.";

/// Static configuration of one claim-type conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub id: FlowId,
    pub claim_type: ClaimType,
    pub intake_agent: Agent,
    pub menu_label: String,
    pub activation_note: String,
    pub opening: Vec<String>,
    pub steps: Vec<FlowStep>,
    pub reasons: Vec<ReasonOption>,
    pub required_documents: usize,
    pub optional_document: Option<String>,
    pub progress_note: String,
    pub validation_steps: Vec<ValidationCheck>,
    pub compensation: CompensationRule,
    pub currency: String,
    /// Lower-case noun used in "your ... claim".
    pub claim_noun: String,
    pub summary_reason: String,
}

impl FlowDefinition {
    pub fn first_step(&self) -> Option<&FlowStep> {
        self.steps.first()
    }

    pub fn step(&self, id: &str) -> Option<&FlowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn next_step(&self, id: &str) -> Option<&FlowStep> {
        let index = self.steps.iter().position(|s| s.id == id)?;
        self.steps.get(index + 1)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    pub fn requires_itinerary(&self) -> bool {
        self.steps.iter().any(|s| s.kind == StepKind::SelectFlight)
    }

    pub fn reason(&self, code: &str) -> Option<&ReasonOption> {
        self.reasons.iter().find(|r| r.code == code)
    }

    /// Checks the structural rules every flow must satisfy.
    pub fn validate(&self) -> Result<()> {
        let broken = |why: &str| FlowError::UnknownFlow(format!("{}: {}", self.id, why));

        match self.steps.last() {
            Some(step) if step.kind == StepKind::Validating => {}
            _ => return Err(broken("last step must be a validating step")),
        }
        if self
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Validating)
            .count()
            != 1
        {
            return Err(broken("exactly one validating step is required"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if self.steps[..i].iter().any(|s| s.id == step.id) {
                return Err(broken("duplicate step id"));
            }
        }
        let has_batch = self.steps.iter().any(|s| s.kind == StepKind::UploadBatch);
        if has_batch != (self.required_documents > 0) {
            return Err(broken("batch upload step and required document count disagree"));
        }
        if self.steps.iter().any(|s| s.kind == StepKind::SelectReason) && self.reasons.is_empty()
        {
            return Err(broken("reason step without reason options"));
        }
        if self.validation_steps.is_empty() {
            return Err(broken("no validation steps"));
        }
        Ok(())
    }
}

/// Builder for [`FlowDefinition`].
pub struct FlowBuilder {
    flow: FlowDefinition,
}

impl FlowBuilder {
    pub fn new(id: FlowId, claim_type: ClaimType, intake_agent: Agent) -> Self {
        Self {
            flow: FlowDefinition {
                id,
                claim_type,
                intake_agent,
                menu_label: claim_type.label().to_string(),
                activation_note: format!("{} Activated", intake_agent.display_name()),
                opening: Vec::new(),
                steps: Vec::new(),
                reasons: Vec::new(),
                required_documents: 0,
                optional_document: None,
                progress_note: DEFAULT_PROGRESS_NOTE.to_string(),
                validation_steps: Vec::new(),
                compensation: CompensationRule::fixed(Default::default()),
                currency: "$".to_string(),
                claim_noun: claim_type.label().to_lowercase(),
                summary_reason: format!("{} during travel", claim_type.label()),
            },
        }
    }

    pub fn menu_label(mut self, label: impl Into<String>) -> Self {
        self.flow.menu_label = label.into();
        self
    }

    pub fn activation_note(mut self, note: impl Into<String>) -> Self {
        self.flow.activation_note = note.into();
        self
    }

    pub fn opening(mut self, line: impl Into<String>) -> Self {
        self.flow.opening.push(line.into());
        self
    }

    pub fn step(mut self, step: FlowStep) -> Self {
        self.flow.steps.push(step);
        self
    }

    pub fn reasons(mut self, reasons: &[(&str, &str)]) -> Self {
        self.flow.reasons = reasons
            .iter()
            .map(|(code, label)| ReasonOption::new(*code, *label))
            .collect();
        self
    }

    pub fn required_documents(mut self, count: usize) -> Self {
        self.flow.required_documents = count;
        self
    }

    pub fn optional_document(mut self, label: impl Into<String>) -> Self {
        self.flow.optional_document = Some(label.into());
        self
    }

    pub fn validation(mut self, steps: &[(&str, &str)]) -> Self {
        self.flow.validation_steps = steps
            .iter()
            .map(|(name, description)| ValidationCheck::new(*name, *description))
            .collect();
        self
    }

    pub fn compensation(mut self, rule: CompensationRule) -> Self {
        self.flow.compensation = rule;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.flow.currency = currency.into();
        self
    }

    pub fn claim_noun(mut self, noun: impl Into<String>) -> Self {
        self.flow.claim_noun = noun.into();
        self
    }

    pub fn summary_reason(mut self, template: impl Into<String>) -> Self {
        self.flow.summary_reason = template.into();
        self
    }

    pub fn build(self) -> Result<FlowDefinition> {
        self.flow.validate()?;
        Ok(self.flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn small_flow() -> FlowBuilder {
        FlowBuilder::new(FlowId::Medical, ClaimType::MedicalEmergency, Agent::Medical)
            .reasons(&[("outpatient", "Outpatient Treatment")])
            .step(FlowStep::new("select-medical-type", StepKind::SelectReason))
            .step(FlowStep::new("upload-medical-document", StepKind::UploadSingle))
            .step(FlowStep::new("processing-medical", StepKind::Validating))
            .validation(&[("Policy Validation", "Checking policy status ✓")])
            .compensation(CompensationRule::fixed(dec!(2500)))
    }

    #[test]
    fn test_builder_produces_linear_steps() {
        let flow = small_flow().build().unwrap();

        assert_eq!(flow.activation_note, "Medical Claims Agent Activated");
        assert_eq!(flow.first_step().unwrap().id, "select-medical-type");
        assert_eq!(
            flow.next_step("select-medical-type").unwrap().id,
            "upload-medical-document"
        );
        assert!(flow.next_step("processing-medical").is_none());
        assert!(!flow.requires_itinerary());
        assert_eq!(flow.reason("outpatient").unwrap().label, "Outpatient Treatment");
    }

    #[test]
    fn test_builder_rejects_batch_without_count() {
        let result = small_flow()
            .step(FlowStep::new("upload-more", StepKind::UploadBatch))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_delay_options_accept_only_their_shape() {
        let hours = DelayOptions::Hours {
            presets: vec![6, 8, 12, 18, 20, 24],
            allow_custom: false,
        };
        assert!(hours.accepts(&DelayChoice::Hours(24)));
        assert!(!hours.accepts(&DelayChoice::Hours(7)));
        assert!(!hours.accepts(&DelayChoice::Option(QuickDelay::TwoDays)));

        let custom = DelayOptions::Hours {
            presets: vec![6],
            allow_custom: true,
        };
        assert!(custom.accepts(&DelayChoice::Hours(MAX_DELAY_HOURS)));
        assert!(!custom.accepts(&DelayChoice::Hours(MAX_DELAY_HOURS + 1)));
        assert!(!custom.accepts(&DelayChoice::Hours(0)));

        let quick = DelayOptions::Quick {
            options: QuickDelay::ALL.to_vec(),
        };
        assert!(quick.accepts(&DelayChoice::Option(QuickDelay::LostMissing)));
        assert!(!quick.accepts(&DelayChoice::Hours(15)));
    }

    #[test]
    fn test_flow_id_parses_menu_ids() {
        assert_eq!("cancel-trip".parse::<FlowId>().unwrap(), FlowId::CancelTrip);
        assert!(matches!(
            "gift-card".parse::<FlowId>(),
            Err(FlowError::UnknownFlow(_))
        ));
    }
}
