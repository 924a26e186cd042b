//! Plays the scripted claim conversations end to end and prints each transcript.
//!
//! `scripted_demo [baggage|cancel-trip]` runs one scenario; without an argument both run.
//! Set `CLAIMS_PACING_MS=0` to skip the pauses.

use std::sync::Arc;

use anyhow::{Context, bail};
use claims_assistant_service::{ServiceConfig, init_tracing};
use claims_flow::{
    Action, ConversationEngine, ConversationRunner, DelayChoice, FlowCatalog,
    InMemorySessionStorage, NoPacing, Pacer, StaticTravelProvider, TokioPacer,
    transcript::render_message,
};

struct Scenario {
    name: &'static str,
    passenger_id: &'static str,
    actions: Vec<Action>,
}

fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "baggage",
            passenger_id: "CSGHY654JK",
            actions: vec![
                Action::SelectOption { option: "baggage".to_string() },
                Action::SelectFlight { flight_number: "SQ883".to_string() },
                Action::SelectDelay(DelayChoice::Hours(24)),
                Action::UploadDocument { filename: "property-irregularity-report.pdf".to_string() },
            ],
        },
        Scenario {
            name: "cancel-trip",
            passenger_id: "CSGHY654JK",
            actions: vec![
                Action::SelectOption { option: "cancel-trip".to_string() },
                Action::SelectReason { reason: "natural-disaster".to_string() },
                Action::UploadDocument { filename: "government-advisory.pdf".to_string() },
                Action::UploadDocument { filename: "transport-booking.pdf".to_string() },
                Action::UploadDocument { filename: "hotel-booking.pdf".to_string() },
                Action::UploadDocument { filename: "refund-statement.pdf".to_string() },
                Action::Proceed,
            ],
        },
    ]
}

fn print_from(timeline: &claims_flow::Timeline, from: usize) -> usize {
    for message in timeline.messages().iter().skip(from) {
        if let Some(block) = render_message(message) {
            println!("{block}");
        }
    }
    timeline.len()
}

async fn play(runner: &ConversationRunner, scenario: Scenario) -> anyhow::Result<()> {
    println!("=== {} ({}) ===", scenario.name, scenario.passenger_id);

    let created = runner.create(scenario.passenger_id).await?;
    let id = created.session.id.clone();
    let mut shown = print_from(&created.session.timeline, 0);

    for action in scenario.actions {
        let name = action.name();
        let outcome = runner
            .run(&id, action)
            .await
            .with_context(|| format!("{} failed at {name}", scenario.name))?;
        shown = print_from(&outcome.session.timeline, shown);
    }

    let session = runner.get(&id).await?;
    match &session.claim_record {
        Some(record) => println!(
            "\n{} approved: {} for {}\n",
            record.claim_number,
            record.formatted_amount(),
            record.reason
        ),
        None => bail!("{} finished without a claim", scenario.name),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    init_tracing(config.log_format, "warn");

    let pacer: Arc<dyn Pacer> = if config.engine.pacing_enabled() {
        Arc::new(TokioPacer::new(config.engine.base_pause))
    } else {
        Arc::new(NoPacing)
    };
    let provider = Arc::new(StaticTravelProvider::new());
    let catalog = Arc::new(FlowCatalog::standard(&config.engine)?);
    let engine = ConversationEngine::new(catalog, provider.clone(), provider).with_pacer(pacer);
    let runner = ConversationRunner::new(Arc::new(engine), Arc::new(InMemorySessionStorage::new()));

    let only = std::env::args().nth(1);
    let selected: Vec<_> = scenarios()
        .into_iter()
        .filter(|s| only.as_deref().is_none_or(|name| name == s.name))
        .collect();
    if selected.is_empty() {
        bail!("unknown scenario; expected 'baggage' or 'cancel-trip'");
    }

    for scenario in selected {
        play(&runner, scenario).await?;
    }
    Ok(())
}
