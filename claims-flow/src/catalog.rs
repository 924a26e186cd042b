use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    claim::ClaimType,
    compensation::{CompensationRule, QuickDelay},
    config::EngineConfig,
    error::{FlowError, Result},
    flow::{DelayOptions, FlowBuilder, FlowDefinition, FlowId, FlowStep, StepKind},
    message::Agent,
};

pub const DELAY_PRESETS: [u32; 6] = [6, 8, 12, 18, 20, 24];

const DEATH_CERTIFICATE: &str = "Death Certificate";
const CHECKLIST_TITLE: &str = "Upload Documents for following:";

const PIR_REQUEST: &str = "I understand your baggage {delay_phrase}. To process your claim, I'll need you to upload your Property Irregularity Report (PIR) document. This is the report you received from the airline when you reported the {baggage_issue}.";
const PIR_PROMPT: &str = "Please upload your PIR document:";
const PIR_RECEIVED: &str = "Thank you! I've received your PIR document ({filename}). Now let me initiate the claims processing workflow.";

const TRIP_REASONS: &[(&str, &str)] = &[
    ("death-serious-sickness", "Death / Serious Sickness"),
    ("government-stop", "Government Authorities stopping travel"),
    ("riot-strike", "Riot/Strike/Civil Commotion"),
    ("natural-disaster", "Natural Disaster"),
    ("home-damage", "Serious Damage to home"),
    ("court-appearance", "Court Appearance"),
    ("child-guardian", "Child traveler – guardian cancels trip"),
];

const DISRUPTION_REASONS: &[(&str, &str)] = &[
    ("serious-sickness", "Serious Sickness (You/Travel Companion)"),
    ("government-stop", "Government Authorities stopping travel"),
    ("riot-strike", "Riot/Strike/Civil Commotion"),
    ("natural-disaster", "Natural Disaster"),
    ("home-damage", "Serious Damage to home"),
    ("court-appearance", "Court Appearance"),
    ("child-guardian", "Child traveler – guardian cancels trip"),
];

/// Every flow the assistant can run, keyed by menu id. Built once at startup.
#[derive(Debug, Clone)]
pub struct FlowCatalog {
    flows: HashMap<FlowId, FlowDefinition>,
}

impl FlowCatalog {
    pub fn standard(config: &EngineConfig) -> Result<Self> {
        let currency = config.payout_currency.as_str();
        let flows = [
            baggage_delay(currency)?,
            baggage_loss(currency)?,
            lost_documents(currency)?,
            medical(currency)?,
            trip_change(TripChange::Postpone, currency)?,
            trip_change(TripChange::Cancel, currency)?,
            trip_change(TripChange::Shorten, currency)?,
            trip_disruption(currency)?,
            quick_claim(FlowId::BaggageLossDocs, ClaimType::BaggageLossDamage, Agent::BaggageLoss, "upload-baggage-loss-docs", dec!(800), currency)?,
            quick_claim(FlowId::PostponeDocs, ClaimType::TripPostponement, Agent::TripChange, "upload-postpone-docs", dec!(600), currency)?,
            quick_claim(FlowId::CancelDocs, ClaimType::TripCancellation, Agent::TripChange, "upload-cancel-docs", dec!(1200), currency)?,
            quick_claim(FlowId::ShortenDocs, ClaimType::TripShortening, Agent::TripChange, "upload-shorten-docs", dec!(500), currency)?,
            quick_claim(FlowId::DisruptionDocs, ClaimType::TripDisruption, Agent::TripDisruption, "upload-disruption-docs", dec!(400), currency)?,
        ];

        Ok(Self::from_flows(flows))
    }

    pub fn from_flows(flows: impl IntoIterator<Item = FlowDefinition>) -> Self {
        Self {
            flows: flows.into_iter().map(|f| (f.id, f)).collect(),
        }
    }

    pub fn get(&self, id: FlowId) -> Result<&FlowDefinition> {
        self.flows
            .get(&id)
            .ok_or_else(|| FlowError::UnknownFlow(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Menu in display order. Without a policy record only flows that never need the
    /// itinerary are offered.
    pub fn menu(&self, policy_available: bool) -> Vec<FlowId> {
        FlowId::ALL
            .into_iter()
            .filter_map(|id| self.flows.get(&id))
            .filter(|flow| policy_available || !flow.requires_itinerary())
            .map(|flow| flow.id)
            .collect()
    }
}

fn baggage_delay(currency: &str) -> Result<FlowDefinition> {
    FlowBuilder::new(FlowId::Baggage, ClaimType::BaggageDelay, Agent::Baggage)
        .menu_label("Baggage Delayed")
        .step(
            FlowStep::new("select-flight", StepKind::SelectFlight)
                .say("Please select the flight from your travel itinerary for which your baggage was delayed, then click \"Proceed.\"")
                .show_itinerary(),
        )
        .step(
            FlowStep::new(
                "ask-delay-hours",
                StepKind::SelectDelay(DelayOptions::Hours {
                    presets: DELAY_PRESETS.to_vec(),
                    allow_custom: true,
                }),
            )
            .say("Thank you for selecting flight {flight}. How long has your baggage been delayed? Please select from the options below:"),
        )
        .step(
            FlowStep::new("upload-document", StepKind::UploadSingle)
                .say(PIR_REQUEST)
                .say(PIR_PROMPT),
        )
        .step(FlowStep::new("processing", StepKind::Validating).say(PIR_RECEIVED))
        .validation(&[
            ("Policy Validation", "Verifying policy status and coverage..."),
            ("Uploaded Document Validation", "Validating PIR document authenticity..."),
            ("Flight Information Verification", "Confirming flight details and delay status..."),
            ("Coverage Eligibility Check", "Checking baggage delay coverage eligibility..."),
            ("Delay Duration Verification", "Verifying reported delay duration..."),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {hours} hours ÷ 6 × {currency}200 = {currency}{amount}"),
        ])
        .compensation(CompensationRule::PerDelayBlock {
            block_hours: 6,
            per_block: dec!(200),
        })
        .currency(currency)
        .claim_noun("baggage delay")
        .summary_reason("Baggage {baggage_status} on flight {flight}")
        .build()
}

fn baggage_loss(currency: &str) -> Result<FlowDefinition> {
    FlowBuilder::new(FlowId::BaggageLoss, ClaimType::BaggageLossDamage, Agent::BaggageLoss)
        .menu_label("Baggage Loss/Damage")
        .opening("I am sorry to hear that your baggage has been lost.")
        .step(
            FlowStep::new("select-flight-baggage-loss", StepKind::SelectFlight)
                .say("Please select the flight where your baggage was lost or damaged then click \"Proceed\"")
                .show_itinerary(),
        )
        .step(
            FlowStep::new(
                "ask-delay-hours-baggage-loss",
                StepKind::SelectDelay(DelayOptions::Quick {
                    options: QuickDelay::ALL.to_vec(),
                }),
            )
            .say("Thank you for selecting flight {flight}. How long has your baggage been missing? Please select from the options below:"),
        )
        .step(
            FlowStep::new("upload-document-baggage-loss", StepKind::UploadSingle)
                .say(PIR_REQUEST)
                .say(PIR_PROMPT),
        )
        .step(FlowStep::new("processing-baggage-loss", StepKind::Validating).say(PIR_RECEIVED))
        .validation(&[
            ("Policy Validation", "Verifying policy status and baggage coverage..."),
            ("Uploaded Document Validation", "Validating PIR document authenticity..."),
            ("Flight Information Verification", "Confirming flight details..."),
            ("Baggage Status Verification", "Verifying baggage loss/damage status..."),
            ("Coverage Eligibility Check", "Checking baggage loss/damage coverage eligibility..."),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {currency}{amount} (based on policy terms)"),
        ])
        .compensation(CompensationRule::ByQuickDelay {
            fifteen_hours: dec!(400),
            two_days: dec!(600),
            lost_missing: dec!(1000),
        })
        .currency(currency)
        .claim_noun("baggage loss/damage")
        .summary_reason("Baggage {baggage_status} on flight {flight}")
        .build()
}

fn lost_documents(currency: &str) -> Result<FlowDefinition> {
    FlowBuilder::new(FlowId::Documents, ClaimType::LostTravelDocuments, Agent::Documents)
        .menu_label("Lost Travel Documents")
        .opening("I'm sorry to hear that your travel documents have been lost.")
        .opening("Our records indicate that you are travelling on flight SQ882 from Singapore (SIN) to Haikou (HAK).")
        .reasons(&[
            ("passport", "Passport"),
            ("visa", "Visa"),
            ("other", "Other Document"),
        ])
        .step(
            FlowStep::new("select-document-type", StepKind::SelectReason)
                .say("Please select the type of document that was lost:"),
        )
        .step(
            FlowStep::new("upload-document-proof", StepKind::UploadSingle)
                .say("I understand you've lost your {reason}. To process your claim, I'll need you to upload a police report or loss report documenting the incident.")
                .say("Please upload your police report or loss report:"),
        )
        .step(
            FlowStep::new("upload-proof-of-travel", StepKind::UploadSingle)
                .say("Thank you! I've received your police/loss report ({filename}). Next, I'll need proof of your travel.")
                .say("Please upload your proof of travel (e.g., flight tickets, boarding passes, hotel bookings):"),
        )
        .step(
            FlowStep::new("upload-lost-item-declaration", StepKind::UploadSingle)
                .say("Great! I've received your proof of travel ({filename}). Finally, I'll need a Lost Item Declaration.")
                .checklist(
                    "Lost Item Declaration Required",
                    &[
                        "Date and Time of Loss / Theft",
                        "Location of incident",
                        "Detailed explanation of what happened",
                        "List of Lost / Stolen documents",
                    ],
                    None,
                )
                .say("Please upload your Lost Item Declaration:"),
        )
        .step(
            FlowStep::new("processing-documents", StepKind::Validating)
                .say("Thank you! I've received all required documents. Now let me initiate the claims processing workflow."),
        )
        .validation(&[
            ("Policy Validation", "Verifying policy status and document coverage..."),
            ("Document Verification", "Validating police report authenticity..."),
            ("Coverage Eligibility Check", "Checking lost document coverage eligibility..."),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {currency}{amount} (fixed coverage)"),
        ])
        .compensation(CompensationRule::fixed(dec!(500)))
        .currency(currency)
        .claim_noun("lost document")
        .summary_reason("Lost travel documents during trip ({reason})")
        .build()
}

fn medical(currency: &str) -> Result<FlowDefinition> {
    FlowBuilder::new(FlowId::Medical, ClaimType::MedicalEmergency, Agent::Medical)
        .menu_label("Medical Expenses")
        .opening("I'm sorry to hear that you experienced a medical emergency during your travels.")
        .opening("Our records indicate that you are travelling on flight SQ882 from Singapore (SIN) to Tokyo Narita (NRT).")
        .reasons(&[
            ("hospitalization", "Hospitalization"),
            ("outpatient", "Outpatient Treatment"),
            ("emergency", "Emergency Treatment"),
            ("medication", "Medication Purchase"),
        ])
        .step(
            FlowStep::new("select-medical-type", StepKind::SelectReason)
                .say("Please describe your medical emergency situation or select from the common types below:"),
        )
        .step(
            FlowStep::new("upload-medical-document", StepKind::UploadSingle)
                .say("I understand you need to file a claim for {reason}. To process your claim, I'll need you to upload your medical bills and/or hospital reports.")
                .say("Please upload your medical bills or reports:"),
        )
        .step(
            FlowStep::new("processing-medical", StepKind::Validating)
                .say("Thank you! I've received your medical document ({filename}). Now let me initiate the claims processing workflow."),
        )
        .validation(&[
            ("Policy Validation", "Verifying policy status and medical coverage..."),
            ("Medical Document Verification", "Validating medical bills and reports..."),
            ("Treatment Verification", "Confirming treatment details..."),
            ("Coverage Eligibility Check", "Checking medical emergency coverage eligibility..."),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {currency}{amount} (based on submitted bills)"),
        ])
        .compensation(CompensationRule::fixed(dec!(2500)))
        .currency(currency)
        .claim_noun("medical emergency")
        .summary_reason("Medical emergency during travel ({reason})")
        .build()
}

#[derive(Clone, Copy)]
enum TripChange {
    Postpone,
    Cancel,
    Shorten,
}

struct TripChangeText {
    id: FlowId,
    claim_type: ClaimType,
    prefix: &'static str,
    menu_label: &'static str,
    verb: &'static str,
    opening: &'static str,
    checklist: [&'static str; 4],
    expense_check: &'static str,
    amount: Decimal,
}

impl TripChange {
    fn text(self) -> TripChangeText {
        match self {
            TripChange::Postpone => TripChangeText {
                id: FlowId::PostponeTrip,
                claim_type: ClaimType::TripPostponement,
                prefix: "postpone",
                menu_label: "Postponing the Trip",
                verb: "postponing",
                opening: "Our records indicate that you are travelling on flight SQ706 from Singapore (SIN) to Bangkok (BKK).",
                checklist: [
                    "Additional administrative charges by the tour operators",
                    "Additional transport expenses",
                    "Additional accommodation expenses",
                    "Letter requesting for refund of any prepaid charges/expenses - with a decision",
                ],
                expense_check: "Verifying additional expenses claimed...",
                amount: dec!(250),
            },
            TripChange::Cancel => TripChangeText {
                id: FlowId::CancelTrip,
                claim_type: ClaimType::TripCancellation,
                prefix: "cancel",
                menu_label: "Cancelling the Trip",
                verb: "cancelling",
                opening: "Our records indicate that you are travelling on flight SQ892 from Singapore (SIN) to Hong Kong (HKG).",
                checklist: [
                    "Cancellation administrative charges by the tour operators",
                    "Cancellation charges for transport",
                    "Cancellation charges for accommodation expenses",
                    "Letter requesting for refund of any prepaid charges/expenses - with a decision of payment",
                ],
                expense_check: "Verifying non-refundable expenses claimed...",
                amount: dec!(1000),
            },
            TripChange::Shorten => TripChangeText {
                id: FlowId::ShortenTrip,
                claim_type: ClaimType::TripShortening,
                prefix: "shorten",
                menu_label: "Shortening the Trip",
                verb: "shortening",
                opening: "Our records indicate that you are travelling on flight SQ894 from Singapore (SIN) to Tokyo Haneda (HND).",
                checklist: [
                    "Additional administrative charges by the tour operators",
                    "Additional transport expenses for return",
                    "Additional accommodation expenses",
                    "Letter requesting for refund of any prepaid charges/expenses - with a decision of payment",
                ],
                expense_check: "Verifying unused travel expenses claimed...",
                amount: dec!(600),
            },
        }
    }
}

fn trip_change(kind: TripChange, currency: &str) -> Result<FlowDefinition> {
    let text = kind.text();
    let p = text.prefix;

    FlowBuilder::new(text.id, text.claim_type, Agent::TripChange)
        .menu_label(text.menu_label)
        .activation_note(format!("{} Agent Activated", text.claim_type.label()))
        .opening(text.opening)
        .reasons(TRIP_REASONS)
        .step(
            FlowStep::new(format!("select-{p}-reason"), StepKind::SelectReason)
                .say(format!("What is the primary reason for {} the trip?", text.verb)),
        )
        .step(
            FlowStep::new(format!("upload-{p}-documents"), StepKind::UploadBatch)
                .say(format!(
                    "Thank you for selecting \"{{reason}}\" as the reason for {} your trip. To process your claim, please upload the following documents:",
                    text.verb
                ))
                .checklist(
                    CHECKLIST_TITLE,
                    &text.checklist,
                    Some("Death Certificate (optional for initial payment)"),
                )
                .say("Please upload your documents:"),
        )
        .step(
            FlowStep::new(format!("{p}-ready-to-proceed"), StepKind::ReadyToProceed).say(format!(
                "All {{required}} required documents received! You can now proceed with your claim or optionally upload a {DEATH_CERTIFICATE}."
            )),
        )
        .step(FlowStep::new(format!("processing-{p}"), StepKind::Validating))
        .required_documents(4)
        .optional_document(DEATH_CERTIFICATE)
        .validation(&[
            ("Policy Purchase Date Validation", "Verify Policy Purchase date. Purchase date is 10 days prior to travel date ✓"),
            ("Travel Date Validation", "Verifying that date of travel is within 30 days ✓"),
            ("Document Verification", "Validating all {required} submitted documents..."),
            ("Reason Verification", "Confirming eligibility based on reason provided..."),
            ("Expense Verification", text.expense_check),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {currency}{amount} (based on policy terms)"),
        ])
        .compensation(CompensationRule::fixed(text.amount))
        .currency(currency)
        .claim_noun(text.claim_type.label().to_lowercase())
        .summary_reason(format!("{} due to {{reason}}", text.claim_type.label()))
        .build()
}

fn trip_disruption(currency: &str) -> Result<FlowDefinition> {
    FlowBuilder::new(FlowId::TripDisruption, ClaimType::TripDisruption, Agent::TripDisruption)
        .menu_label("Trip Disruption")
        .opening("Our records indicate that you are travelling on flight SQ637 from Tokyo Narita (NRT) to Singapore (SIN).")
        .reasons(DISRUPTION_REASONS)
        .step(
            FlowStep::new("select-disruption-reason", StepKind::SelectReason)
                .say("What is the primary reason for the trip disruption?"),
        )
        .step(
            FlowStep::new("upload-disruption-documents", StepKind::UploadBatch)
                .say("Thank you for selecting \"{reason}\" as the reason for your trip disruption. To process your claim, please upload the following documents:")
                .checklist(
                    CHECKLIST_TITLE,
                    &[
                        "Cardiac arrest report for insured by a medical practitioner",
                        "New Tickets & Invoice",
                        "Additional Accommodation Invoice",
                        "Letter requesting for refund of any prepaid charges/expenses- with a decision of payment",
                    ],
                    None,
                )
                .say("Please upload your documents:"),
        )
        .step(
            FlowStep::new("processing-disruption", StepKind::Validating)
                .say("All {required} required documents received. Now let me initiate the claims processing workflow."),
        )
        .required_documents(4)
        .validation(&[
            ("Policy Purchase Date Validation", "Verifying Policy Purchase date. ✓"),
            ("Enhanced PreX Plan Verification", "Verifying Enhanced PreX Plan ✓"),
            ("Prestige Plan Verification", "Prestige Plan Verified ✓"),
            ("Preexisting Medical Condition Check", "Copayment for preexisting medical condition: 50% ✓"),
            ("Document Verification", "Validating all {required} submitted documents..."),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {currency}{amount} (based on policy terms)"),
        ])
        .compensation(CompensationRule::fixed(dec!(1500)))
        .currency(currency)
        .claim_noun("trip disruption")
        .summary_reason("Trip disruption due to {reason}")
        .build()
}

/// Single-document shortcut flows. They skip the guided questions and pay their own
/// fixed amount.
fn quick_claim(
    id: FlowId,
    claim_type: ClaimType,
    agent: Agent,
    upload_step: &str,
    amount: Decimal,
    currency: &str,
) -> Result<FlowDefinition> {
    FlowBuilder::new(id, claim_type, agent)
        .menu_label(format!("{} - Quick Claim", claim_type.label()))
        .activation_note(format!("{} Agent Activated", claim_type.label()))
        .step(
            FlowStep::new(upload_step, StepKind::UploadSingle)
                .say(format!("Please upload your supporting document for this {} claim:", claim_type.label().to_lowercase())),
        )
        .step(
            FlowStep::new("processing-generic", StepKind::Validating)
                .say("Thank you! I've received your document ({filename}). Now let me initiate the claims processing workflow."),
        )
        .validation(&[
            ("Policy Validation", "Verifying policy status and {claim_type_lower} coverage..."),
            ("Document Verification", "Validating submitted documents..."),
            ("Coverage Eligibility Check", "Checking {claim_type_lower} coverage eligibility..."),
            ("Claim Payment Amount Calculation", "Calculating claim payment: {currency}{amount} (based on policy terms)"),
        ])
        .compensation(CompensationRule::fixed(amount))
        .currency(currency)
        .claim_noun(claim_type.label())
        .summary_reason("{claim_type} during travel")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> FlowCatalog {
        FlowCatalog::standard(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_standard_catalog_has_every_flow() {
        let catalog = catalog();
        assert_eq!(catalog.len(), FlowId::ALL.len());
        for id in FlowId::ALL {
            catalog.get(id).unwrap().validate().unwrap();
        }
    }

    #[test]
    fn test_step_ids_match_the_published_flow_table() {
        let catalog = catalog();
        let steps = |id| catalog.get(id).unwrap().step_ids().collect::<Vec<_>>();

        assert_eq!(
            steps(FlowId::Baggage),
            vec!["select-flight", "ask-delay-hours", "upload-document", "processing"]
        );
        assert_eq!(
            steps(FlowId::Documents),
            vec![
                "select-document-type",
                "upload-document-proof",
                "upload-proof-of-travel",
                "upload-lost-item-declaration",
                "processing-documents",
            ]
        );
        assert_eq!(
            steps(FlowId::CancelTrip),
            vec![
                "select-cancel-reason",
                "upload-cancel-documents",
                "cancel-ready-to-proceed",
                "processing-cancel",
            ]
        );
        assert_eq!(
            steps(FlowId::TripDisruption),
            vec![
                "select-disruption-reason",
                "upload-disruption-documents",
                "processing-disruption",
            ]
        );
        assert_eq!(
            steps(FlowId::ShortenDocs),
            vec!["upload-shorten-docs", "processing-generic"]
        );
    }

    #[test]
    fn test_validation_step_counts() {
        let catalog = catalog();
        let count = |id| catalog.get(id).unwrap().validation_steps.len();

        assert_eq!(count(FlowId::Baggage), 6);
        assert_eq!(count(FlowId::BaggageLoss), 6);
        assert_eq!(count(FlowId::PostponeTrip), 6);
        assert_eq!(count(FlowId::TripDisruption), 6);
        assert_eq!(count(FlowId::Documents), 4);
        assert_eq!(count(FlowId::Medical), 5);
        assert_eq!(count(FlowId::CancelDocs), 4);
    }

    #[test]
    fn test_fixed_amounts_depend_on_entry_point() {
        let catalog = catalog();
        let fixed = |id| catalog.get(id).unwrap().compensation.calculate(None).unwrap();

        assert_eq!(fixed(FlowId::CancelTrip), dec!(1000));
        assert_eq!(fixed(FlowId::CancelDocs), dec!(1200));
        assert_eq!(fixed(FlowId::ShortenTrip), dec!(600));
        assert_eq!(fixed(FlowId::ShortenDocs), dec!(500));
        assert_eq!(fixed(FlowId::TripDisruption), dec!(1500));
        assert_eq!(fixed(FlowId::DisruptionDocs), dec!(400));
    }

    #[test]
    fn test_reduced_menu_drops_itinerary_flows() {
        let catalog = catalog();
        let full = catalog.menu(true);
        let reduced = catalog.menu(false);

        assert_eq!(full.len(), 13);
        assert_eq!(full[0], FlowId::Baggage);
        assert!(!reduced.contains(&FlowId::Baggage));
        assert!(!reduced.contains(&FlowId::BaggageLoss));
        assert!(reduced.contains(&FlowId::CancelTrip));
        assert_eq!(reduced.len(), 11);
    }

    #[test]
    fn test_payout_currency_is_configurable() {
        let catalog =
            FlowCatalog::standard(&EngineConfig::default().with_payout_currency("SGD ")).unwrap();
        assert_eq!(catalog.get(FlowId::Medical).unwrap().currency, "SGD ");
    }
}
