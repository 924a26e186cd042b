//! Plain-text rendering of a timeline, one block per message.

use std::fmt::Write;

use crate::{
    claim::format_amount,
    message::{Message, MessageKind, Panel, ValidationStatus},
    timeline::Timeline,
};

pub fn render(timeline: &Timeline) -> String {
    let mut out = String::new();
    for message in timeline {
        if let Some(block) = render_message(message) {
            out.push_str(&block);
            out.push('\n');
        }
    }
    out
}

/// `None` for kinds that have no textual form.
pub fn render_message(message: &Message) -> Option<String> {
    let text = match &message.kind {
        MessageKind::SystemNote { content } => format!("  [{content}]"),
        MessageKind::UserEcho { content } => format!("> {content}"),
        MessageKind::AgentUtterance { agent, content } => {
            format!("{}: {}", agent.display_name(), content)
        }
        MessageKind::ApiCall {
            agent,
            operation,
            target,
        } => format!("  {} → {operation}({target})", agent.display_name()),
        MessageKind::ApiResult {
            operation,
            success,
            summary,
            ..
        } => {
            let mark = if *success { "ok" } else { "failed" };
            format!("  {operation} {mark}: {summary}")
        }
        MessageKind::ValidationStep {
            step,
            total,
            name,
            description,
            status,
            ..
        } => {
            let mark = match status {
                ValidationStatus::Processing => "…",
                ValidationStatus::Completed => "✓",
            };
            format!("  [{step}/{total}] {mark} {name}: {description}")
        }
        MessageKind::Panel(Panel::Unknown) | MessageKind::Unknown => return None,
        MessageKind::Panel(panel) => render_panel(panel),
    };
    Some(text)
}

fn render_panel(panel: &Panel) -> String {
    let mut out = String::new();
    match panel {
        Panel::Itinerary(itinerary) => {
            let _ = writeln!(out, "  ┌ Itinerary for {}", itinerary.passenger_name);
            for s in &itinerary.segments {
                let _ = writeln!(
                    out,
                    "  │ {:<6} {:<10} {} {} ({:?})",
                    s.flight_number,
                    s.route,
                    s.date.format("%d %b %Y"),
                    s.airline,
                    s.journey_type
                );
            }
            out.push_str("  └");
        }
        Panel::PolicyInfo(policy) => {
            let _ = write!(
                out,
                "  ┌ Policy {} ({})\n  │ {}\n  └ holder: {}",
                policy.policy_number, policy.status, policy.policy_type, policy.policy_holder
            );
        }
        Panel::ClaimInitiated {
            claim_number,
            subject,
            flight_number,
            delay,
        } => {
            let _ = write!(out, "  ┌ Claim initiated: {claim_number}\n  │ {subject}");
            if let Some(flight) = flight_number {
                let _ = write!(out, "\n  │ flight {flight}");
            }
            if let Some(delay) = delay {
                let _ = write!(out, "\n  │ delay {delay}");
            }
            out.push_str("\n  └");
        }
        Panel::PaymentDetails {
            claim_number,
            policy_number,
            compensation_amount,
            currency,
        } => {
            let _ = write!(
                out,
                "  ┌ Payment for {claim_number}\n  │ policy {policy_number}\n  └ amount {}",
                format_amount(currency, *compensation_amount)
            );
        }
        Panel::ClaimSummary(record) => {
            let _ = write!(
                out,
                "  ┌ Claim summary {}\n  │ type: {}\n  │ reason: {}\n  │ incident: {}\n  │ intimated: {}\n  └ approved amount: {}",
                record.claim_number,
                record.claim_type,
                record.reason,
                record.incident_at.format("%d %b %Y %H:%M"),
                record.intimated_at.format("%d %b %Y %H:%M"),
                record.formatted_amount()
            );
        }
        Panel::DocumentChecklist {
            title,
            items,
            optional,
        } => {
            let _ = writeln!(out, "  ┌ {title}");
            for item in items {
                let _ = writeln!(out, "  │ • {item}");
            }
            if let Some(optional) = optional {
                let _ = writeln!(out, "  │ ◦ {optional}");
            }
            out.push_str("  └");
        }
        Panel::Unknown => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Agent;

    #[test]
    fn test_renders_known_kinds_and_skips_unknown() {
        let mut timeline = Timeline::new();
        timeline.push(Message::user("Cancelling the Trip"));
        timeline.push(Message::new(MessageKind::Unknown));
        timeline.push(Message::panel(Panel::Unknown));
        timeline.push(Message::agent(
            Agent::TripChange,
            "What is the primary reason for cancelling the trip?",
        ));

        let text = render(&timeline);
        assert_eq!(
            text,
            "> Cancelling the Trip\nTrip Change Agent: What is the primary reason for cancelling the trip?\n"
        );
    }

    #[test]
    fn test_validation_step_shows_progress_mark() {
        let message = Message::new(MessageKind::ValidationStep {
            agent: Agent::Claims,
            step: 6,
            total: 6,
            name: "Claim Payment Amount Calculation".to_string(),
            description: "Calculating claim payment: $1000 (based on policy terms)".to_string(),
            status: ValidationStatus::Completed,
        });

        assert_eq!(
            render_message(&message).unwrap(),
            "  [6/6] ✓ Claim Payment Amount Calculation: Calculating claim payment: $1000 (based on policy terms)"
        );
    }
}
