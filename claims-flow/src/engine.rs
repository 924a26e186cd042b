use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    catalog::FlowCatalog,
    claim::{ClaimRecord, format_amount, generate_claim_number},
    compensation::DelayChoice,
    error::{FlowError, Result},
    flow::{Cue, FlowDefinition, FlowId, FlowStep, StepKind, ValidationCheck},
    message::{Agent, Message, MessageKind, Panel},
    pacing::{Beat, NoPacing, Pacer},
    provider::{ItineraryProvider, PolicyProvider},
    scope::ActionScope,
    session::{COMPLETE, OPTIONS, Session},
    template::Vars,
    validation::ValidationRunner,
};

const ITINERARY_UNAVAILABLE: &str = "I couldn't fetch your itinerary. Please try again later.";
const POLICY_UNAVAILABLE: &str = "I couldn't retrieve your policy details right now, so I can only help with claims that don't need your flight itinerary.";
const CLOSING: &str = "Your {claim_noun} claim has been successfully processed! The claim payment will be transferred to your registered bank account within 3-5 business days. Is there anything else I can help you with?";

/// A user action, independent of the transport that delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    SelectOption { option: String },
    SelectFlight { flight_number: String },
    SelectDelay(DelayChoice),
    SelectReason { reason: String },
    UploadDocument { filename: String },
    UploadOptionalDocument { filename: String },
    Proceed,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectOption { .. } => "select-option",
            Action::SelectFlight { .. } => "select-flight",
            Action::SelectDelay(_) => "select-delay",
            Action::SelectReason { .. } => "select-reason",
            Action::UploadDocument { .. } => "upload-document",
            Action::UploadOptionalDocument { .. } => "upload-optional-document",
            Action::Proceed => "proceed",
        }
    }
}

/// Status of one engine call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub step: String,
    /// Messages appended by the call.
    pub appended: usize,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "kebab-case")]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// Claim processed, conversation finished
    Completed,
    /// A provider failed; the explanation is already in the timeline
    Error(String),
}

/// Drives a [`Session`] through the scripted claim conversations.
///
/// The engine holds no per-session state. Every operation takes the session by mutable
/// reference, checks that the action is legal in the current step and only then mutates.
pub struct ConversationEngine {
    catalog: Arc<FlowCatalog>,
    itineraries: Arc<dyn ItineraryProvider>,
    policies: Arc<dyn PolicyProvider>,
    pacer: Arc<dyn Pacer>,
}

impl ConversationEngine {
    pub fn new(
        catalog: Arc<FlowCatalog>,
        itineraries: Arc<dyn ItineraryProvider>,
        policies: Arc<dyn PolicyProvider>,
    ) -> Self {
        Self {
            catalog,
            itineraries,
            policies,
            pacer: Arc::new(NoPacing),
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn catalog(&self) -> &FlowCatalog {
        &self.catalog
    }

    pub async fn start(&self, session: &mut Session) -> Result<ExecutionResult> {
        self.start_in(session, &ActionScope::detached()).await
    }

    pub async fn select_option(&self, session: &mut Session, option: &str) -> Result<ExecutionResult> {
        self.detached(session, Action::SelectOption { option: option.to_string() }).await
    }

    pub async fn select_flight(&self, session: &mut Session, flight_number: &str) -> Result<ExecutionResult> {
        self.detached(session, Action::SelectFlight { flight_number: flight_number.to_string() }).await
    }

    pub async fn select_delay(&self, session: &mut Session, choice: DelayChoice) -> Result<ExecutionResult> {
        self.detached(session, Action::SelectDelay(choice)).await
    }

    pub async fn select_reason(&self, session: &mut Session, reason: &str) -> Result<ExecutionResult> {
        self.detached(session, Action::SelectReason { reason: reason.to_string() }).await
    }

    pub async fn upload_document(&self, session: &mut Session, filename: &str) -> Result<ExecutionResult> {
        self.detached(session, Action::UploadDocument { filename: filename.to_string() }).await
    }

    pub async fn upload_optional_document(&self, session: &mut Session, filename: &str) -> Result<ExecutionResult> {
        self.detached(session, Action::UploadOptionalDocument { filename: filename.to_string() }).await
    }

    pub async fn proceed_to_validation(&self, session: &mut Session) -> Result<ExecutionResult> {
        self.detached(session, Action::Proceed).await
    }

    pub async fn reset_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        self.reset_in(session, &ActionScope::detached()).await
    }

    async fn detached(&self, session: &mut Session, action: Action) -> Result<ExecutionResult> {
        self.apply(session, action, &ActionScope::detached()).await
    }

    /// Greets the passenger and offers the claim menu.
    pub async fn start_in(&self, session: &mut Session, scope: &ActionScope) -> Result<ExecutionResult> {
        let before = session.timeline.len();
        let outcome = self.greet(session, scope).await;
        self.finish(session, before, outcome)
    }

    /// Discards the session's state and greets the same passenger again.
    pub async fn reset_in(&self, session: &mut Session, scope: &ActionScope) -> Result<ExecutionResult> {
        info!(session_id = %session.id, step = %session.step, "Resetting session");
        *session = Session::new(session.id.clone(), session.passenger_id.clone());
        self.start_in(session, scope).await
    }

    pub async fn apply(
        &self,
        session: &mut Session,
        action: Action,
        scope: &ActionScope,
    ) -> Result<ExecutionResult> {
        let before = session.timeline.len();
        let outcome = match action {
            Action::SelectOption { option } => self.on_select_option(session, &option, scope).await,
            Action::SelectFlight { flight_number } => {
                self.on_select_flight(session, &flight_number, scope).await
            }
            Action::SelectDelay(choice) => self.on_select_delay(session, choice, scope).await,
            Action::SelectReason { reason } => self.on_select_reason(session, &reason, scope).await,
            Action::UploadDocument { filename } => {
                self.on_upload_document(session, &filename, scope).await
            }
            Action::UploadOptionalDocument { filename } => {
                self.on_upload_optional_document(session, &filename)
            }
            Action::Proceed => self.on_proceed(session, scope).await,
        };
        self.finish(session, before, outcome)
    }

    fn finish(&self, session: &Session, before: usize, outcome: Result<()>) -> Result<ExecutionResult> {
        outcome?;
        let status = if session.is_complete() {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::WaitingForInput
        };
        Ok(ExecutionResult {
            step: session.step.clone(),
            appended: session.timeline.len().saturating_sub(before),
            status,
        })
    }

    async fn beat(&self, beat: Beat, session: &Session, scope: &ActionScope) -> Result<()> {
        scope.checkpoint(self.pacer.as_ref(), beat, session).await
    }

    async fn greet(&self, session: &mut Session, scope: &ActionScope) -> Result<()> {
        let policy = self.policies.policy(&session.passenger_id).await;

        match policy {
            Ok(policy) => {
                session.timeline.push(Message::agent(
                    Agent::Orchestrator,
                    format!(
                        "Hi {}! I'm Jiffy Jane, your Claims Assistant. I can see your policy is active.",
                        policy.policy_holder
                    ),
                ));
                self.beat(Beat::Normal, session, scope).await?;
                session.timeline.push(Message::panel(Panel::PolicyInfo(policy.clone())));
                session.policy = Some(policy);
                self.beat(Beat::Normal, session, scope).await?;
                session
                    .timeline
                    .push(Message::agent(Agent::Orchestrator, "I can help you with:"));
                session.menu = self.catalog.menu(true);
                session.step = OPTIONS.to_string();
                info!(session_id = %session.id, passenger_id = %session.passenger_id, "Session started");
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Policy lookup failed");
                session.timeline.push(Message::agent(
                    Agent::Orchestrator,
                    "Hi! I'm Jiffy Jane, your Claims Assistant.",
                ));
                session.timeline.push(Message::agent(Agent::Orchestrator, POLICY_UNAVAILABLE));
                session
                    .timeline
                    .push(Message::agent(Agent::Orchestrator, "I can help you with:"));
                session.menu = self.catalog.menu(false);
                session.step = OPTIONS.to_string();
                Err(unavailable(e))
            }
        }
    }

    async fn on_select_option(&self, session: &mut Session, option: &str, scope: &ActionScope) -> Result<()> {
        if session.step != OPTIONS {
            return Err(FlowError::invalid_transition("select-option", &session.step));
        }
        let flow_id = option
            .parse::<FlowId>()
            .ok()
            .filter(|id| session.menu.contains(id))
            .ok_or_else(|| FlowError::invalid_option(option, OPTIONS))?;
        let flow = self.catalog.get(flow_id)?;
        let first = flow
            .first_step()
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;

        info!(session_id = %session.id, flow = %flow_id, "Flow selected");
        session.activate(flow_id);
        session.timeline.push(Message::user(&flow.menu_label));
        self.beat(Beat::Normal, session, scope).await?;
        session.timeline.push(Message::system(&flow.activation_note));
        for line in &flow.opening {
            self.beat(Beat::Normal, session, scope).await?;
            session.timeline.push(Message::agent(flow.intake_agent, line));
        }
        self.beat(Beat::Normal, session, scope).await?;

        self.enter_step(session, flow, first, None, scope).await
    }

    async fn on_select_flight(&self, session: &mut Session, flight_number: &str, scope: &ActionScope) -> Result<()> {
        let (flow, step) = self.current_step(session, "select-flight")?;
        if step.kind != StepKind::SelectFlight {
            return Err(FlowError::invalid_transition("select-flight", &step.id));
        }
        let segment = session
            .itinerary
            .as_ref()
            .and_then(|it| it.segment(flight_number))
            .ok_or_else(|| FlowError::invalid_option(flight_number, &step.id))?;

        session.selected_flight = Some(segment.flight_number.clone());
        session.timeline.push(Message::user(&segment.flight_number));
        self.beat(Beat::Normal, session, scope).await?;
        self.advance(session, flow, &step.id, None, scope).await
    }

    async fn on_select_delay(&self, session: &mut Session, choice: DelayChoice, scope: &ActionScope) -> Result<()> {
        let (flow, step) = self.current_step(session, "select-delay")?;
        let StepKind::SelectDelay(options) = &step.kind else {
            return Err(FlowError::invalid_transition("select-delay", &step.id));
        };
        if !options.accepts(&choice) {
            return Err(FlowError::invalid_option(choice, &step.id));
        }

        session.delay = Some(choice);
        session.timeline.push(Message::user(choice.to_string()));
        self.beat(Beat::Normal, session, scope).await?;
        self.advance(session, flow, &step.id, None, scope).await
    }

    async fn on_select_reason(&self, session: &mut Session, code: &str, scope: &ActionScope) -> Result<()> {
        let (flow, step) = self.current_step(session, "select-reason")?;
        if step.kind != StepKind::SelectReason {
            return Err(FlowError::invalid_transition("select-reason", &step.id));
        }
        let reason = flow
            .reason(code)
            .ok_or_else(|| FlowError::invalid_option(code, &step.id))?;

        session.selected_reason = Some(reason.code.clone());
        session.timeline.push(Message::user(&reason.label));
        self.beat(Beat::Normal, session, scope).await?;
        self.advance(session, flow, &step.id, None, scope).await
    }

    async fn on_upload_document(&self, session: &mut Session, filename: &str, scope: &ActionScope) -> Result<()> {
        let (flow, step) = self.current_step(session, "upload-document")?;
        if !step.kind.is_upload() {
            return Err(FlowError::invalid_transition("upload-document", &step.id));
        }
        let filename = accepted_filename(filename)?;

        session.collected_documents.push(filename.to_string());
        session
            .timeline
            .push(Message::user(format!("Uploaded: {filename}")));
        info!(
            session_id = %session.id,
            flow = %flow.id,
            step = %step.id,
            collected = session.collected_documents.len(),
            "Document uploaded"
        );
        self.beat(Beat::Normal, session, scope).await?;

        if step.kind == StepKind::UploadBatch
            && session.collected_documents.len() < flow.required_documents
        {
            let note = self.vars(session, flow, None, None).fill(&flow.progress_note);
            session.timeline.push(Message::agent(flow.intake_agent, note));
            return Ok(());
        }

        self.advance(session, flow, &step.id, Some(filename), scope).await
    }

    fn on_upload_optional_document(&self, session: &mut Session, filename: &str) -> Result<()> {
        let (flow, step) = self.current_step(session, "upload-optional-document")?;
        let label = match (&flow.optional_document, &step.kind) {
            (Some(label), StepKind::UploadBatch | StepKind::ReadyToProceed) => label,
            _ => {
                return Err(FlowError::invalid_transition(
                    "upload-optional-document",
                    &step.id,
                ));
            }
        };
        let filename = accepted_filename(filename)?;

        session.optional_document = Some(filename.to_string());
        session
            .timeline
            .push(Message::user(format!("Uploaded {label}: {filename}")));
        Ok(())
    }

    async fn on_proceed(&self, session: &mut Session, scope: &ActionScope) -> Result<()> {
        let (flow, step) = self.current_step(session, "proceed")?;
        if step.kind != StepKind::ReadyToProceed {
            return Err(FlowError::invalid_transition("proceed", &step.id));
        }
        if session.collected_documents.len() < flow.required_documents {
            return Err(FlowError::invalid_transition("proceed", &step.id));
        }
        session.timeline.push(Message::user("Proceed with claim"));
        self.beat(Beat::Brief, session, scope).await?;
        self.advance(session, flow, &step.id, None, scope).await
    }

    fn current_step(&self, session: &Session, action: &str) -> Result<(&FlowDefinition, FlowStep)> {
        let flow = session
            .flow
            .ok_or_else(|| FlowError::invalid_transition(action, &session.step))?;
        let flow = self.catalog.get(flow)?;
        let step = flow
            .step(&session.step)
            .ok_or_else(|| FlowError::invalid_transition(action, &session.step))?;
        Ok((flow, step.clone()))
    }

    async fn advance(
        &self,
        session: &mut Session,
        flow: &FlowDefinition,
        from: &str,
        filename: Option<&str>,
        scope: &ActionScope,
    ) -> Result<()> {
        let next = flow
            .next_step(from)
            .ok_or_else(|| FlowError::UnknownFlow(format!("{}: no step after '{}'", flow.id, from)))?;
        self.enter_step(session, flow, next, filename, scope).await
    }

    async fn enter_step(
        &self,
        session: &mut Session,
        flow: &FlowDefinition,
        step: &FlowStep,
        filename: Option<&str>,
        scope: &ActionScope,
    ) -> Result<()> {
        if step.kind == StepKind::SelectFlight && !self.fetch_itinerary(session, flow, scope).await? {
            return Err(FlowError::ProviderUnavailable(ITINERARY_UNAVAILABLE.to_string()));
        }

        session.step = step.id.clone();
        let vars = self.vars(session, flow, filename, None);
        for (i, cue) in step.on_enter.iter().enumerate() {
            if i > 0 {
                self.beat(Beat::Brief, session, scope).await?;
            }
            let message = match cue {
                Cue::Say(text) => Message::agent(flow.intake_agent, vars.fill(text)),
                Cue::ShowItinerary => match &session.itinerary {
                    Some(itinerary) => Message::panel(Panel::Itinerary(itinerary.clone())),
                    None => continue,
                },
                Cue::Checklist { title, items, optional } => Message::panel(Panel::DocumentChecklist {
                    title: title.clone(),
                    items: items.clone(),
                    optional: optional.clone(),
                }),
            };
            session.timeline.push(message);
        }

        if step.kind == StepKind::Validating {
            self.process_claim(session, flow, scope).await?;
        }
        Ok(())
    }

    /// Returns `false` after writing the failure to the timeline and leaving the flow.
    async fn fetch_itinerary(&self, session: &mut Session, flow: &FlowDefinition, scope: &ActionScope) -> Result<bool> {
        session.timeline.push(Message::new(MessageKind::ApiCall {
            agent: flow.intake_agent,
            operation: "get-itinerary".to_string(),
            target: session.passenger_id.clone(),
        }));
        self.beat(Beat::Normal, session, scope).await?;

        match self.itineraries.itinerary(&session.passenger_id).await {
            Ok(itinerary) => {
                session.timeline.push(Message::new(MessageKind::ApiResult {
                    agent: flow.intake_agent,
                    operation: "get-itinerary".to_string(),
                    success: true,
                    summary: format!(
                        "{} flight segments for {}",
                        itinerary.segments.len(),
                        itinerary.passenger_name
                    ),
                }));
                session.itinerary = Some(itinerary);
                self.beat(Beat::Brief, session, scope).await?;
                Ok(true)
            }
            Err(e) => {
                warn!(session_id = %session.id, flow = %flow.id, error = %e, "Itinerary lookup failed");
                session.timeline.push(Message::new(MessageKind::ApiResult {
                    agent: flow.intake_agent,
                    operation: "get-itinerary".to_string(),
                    success: false,
                    summary: e.to_string(),
                }));
                session
                    .timeline
                    .push(Message::agent(flow.intake_agent, ITINERARY_UNAVAILABLE));
                session.deactivate();
                Ok(false)
            }
        }
    }

    async fn process_claim(&self, session: &mut Session, flow: &FlowDefinition, scope: &ActionScope) -> Result<()> {
        let amount = flow.compensation.calculate(session.delay)?;
        let intimated_at = Utc::now();
        let incident_at = match session.delay.and_then(|d| d.hours()) {
            Some(hours) => intimated_at
                .checked_sub_signed(ChronoDuration::hours(i64::from(hours)))
                .ok_or_else(|| FlowError::invalid_option(hours, "delay"))?,
            None => intimated_at,
        };
        let policy_number = session
            .policy
            .as_ref()
            .map(|p| p.policy_number.clone())
            .unwrap_or_default();
        let vars = self.vars(session, flow, None, Some(amount));

        self.beat(Beat::Long, session, scope).await?;
        session
            .timeline
            .push(Message::system("Orchestrator Agent → Calling Claim Processing Agent"));
        self.beat(Beat::Normal, session, scope).await?;
        session.timeline.push(Message::agent(
            Agent::Claims,
            vars.fill("I'm the Claim Processing Agent. I'll now perform the required validations for your {claim_noun} claim."),
        ));

        let claim_number = generate_claim_number(intimated_at);
        self.beat(Beat::Long, session, scope).await?;
        session.timeline.push(Message::panel(Panel::ClaimInitiated {
            claim_number: claim_number.clone(),
            subject: format!("{} Claim", flow.claim_type.label()),
            flight_number: session.selected_flight.clone(),
            delay: session.delay.map(|d| d.to_string()),
        }));
        self.beat(Beat::Normal, session, scope).await?;
        session
            .timeline
            .push(Message::agent(Agent::Claims, "Starting validation process..."));
        self.beat(Beat::Brief, session, scope).await?;

        let steps: Vec<ValidationCheck> = flow
            .validation_steps
            .iter()
            .map(|check| ValidationCheck::new(vars.fill(&check.name), vars.fill(&check.description)))
            .collect();
        let outcome = ValidationRunner::new(self.pacer.as_ref(), scope)
            .run(session, &steps)
            .await?;
        if !outcome.all_passed {
            return Err(FlowError::TimelineInvariant(format!(
                "validation stopped after {} steps",
                outcome.steps_run
            )));
        }

        let record = ClaimRecord {
            claim_number: claim_number.clone(),
            claim_type: flow.claim_type,
            reason: vars.fill(&flow.summary_reason),
            incident_at,
            intimated_at,
            policy_number: policy_number.clone(),
            flight_number: session.selected_flight.clone(),
            compensation_amount: amount,
            currency: flow.currency.clone(),
        };
        let record = session.record_claim(record)?.clone();

        self.beat(Beat::Normal, session, scope).await?;
        session.timeline.push(Message::agent(
            Agent::Claims,
            "All validations completed successfully! Your claim has been approved.",
        ));
        self.beat(Beat::Normal, session, scope).await?;
        session
            .timeline
            .push(Message::system("Orchestrator Agent → Calling Payment Processing Agent"));
        self.beat(Beat::Normal, session, scope).await?;
        session.timeline.push(Message::agent(
            Agent::Payment,
            "I'm the Payment Processing Agent. I'll now process your claim payment.",
        ));
        self.beat(Beat::Long, session, scope).await?;
        session.timeline.push(Message::panel(Panel::PaymentDetails {
            claim_number: claim_number.clone(),
            policy_number,
            compensation_amount: amount,
            currency: flow.currency.clone(),
        }));
        self.beat(Beat::Normal, session, scope).await?;
        session.timeline.push(Message::panel(Panel::ClaimSummary(record)));
        self.beat(Beat::Normal, session, scope).await?;
        session
            .timeline
            .push(Message::agent(Agent::Orchestrator, vars.fill(CLOSING)));
        session.step = COMPLETE.to_string();

        info!(
            session_id = %session.id,
            flow = %flow.id,
            claim_number = %claim_number,
            amount = %format_amount(&flow.currency, amount),
            "Claim approved"
        );
        Ok(())
    }

    fn vars(
        &self,
        session: &Session,
        flow: &FlowDefinition,
        filename: Option<&str>,
        amount: Option<Decimal>,
    ) -> Vars {
        let mut vars = Vars::new();
        let count = session.collected_documents.len();
        let remaining = flow.required_documents.saturating_sub(count);

        vars.set("claim_type", flow.claim_type.label())
            .set("claim_type_lower", flow.claim_type.label().to_lowercase())
            .set("claim_noun", flow.claim_noun.as_str())
            .set("currency", flow.currency.as_str())
            .set("required", flow.required_documents.to_string())
            .set("count", count.to_string())
            .set("remaining", remaining.to_string())
            .set("plural", if remaining == 1 { "" } else { "s" });

        if let Some(flight) = &session.selected_flight {
            vars.set("flight", flight.as_str());
        }
        if let Some(reason) = session
            .selected_reason
            .as_deref()
            .and_then(|code| flow.reason(code))
        {
            vars.set("reason", reason.label.as_str());
        }
        if let Some(delay) = session.delay {
            vars.set("delay", delay.to_string());
            if let Some(hours) = delay.hours() {
                vars.set("hours", hours.to_string());
            }
            let (phrase, issue, status) = match delay {
                DelayChoice::Option(q) if delay.is_lost() => (
                    "is lost or missing".to_string(),
                    "lost baggage",
                    q.label().to_lowercase(),
                ),
                DelayChoice::Hours(_) => (
                    format!("has been delayed for {delay}"),
                    "delay",
                    format!("delayed for {delay}"),
                ),
                DelayChoice::Option(_) => (
                    format!("has been delayed for {delay}"),
                    "delayed baggage",
                    format!("delayed for {delay}"),
                ),
            };
            vars.set("delay_phrase", phrase)
                .set("baggage_issue", issue)
                .set("baggage_status", status);
        }
        if let Some(filename) = filename {
            vars.set("filename", filename);
        }
        if let Some(amount) = amount {
            vars.set("amount", amount.normalize().to_string());
        }
        vars
    }
}

fn accepted_filename(filename: &str) -> Result<&str> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(FlowError::UploadRejected("no file selected".to_string()));
    }
    Ok(trimmed)
}

fn unavailable(e: FlowError) -> FlowError {
    match e {
        FlowError::ProviderUnavailable(_) => e,
        other => FlowError::ProviderUnavailable(other.to_string()),
    }
}
