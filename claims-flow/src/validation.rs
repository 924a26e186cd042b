use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    flow::ValidationCheck,
    message::{Agent, Message, MessageKind, ValidationStatus},
    pacing::{Beat, Pacer},
    scope::ActionScope,
    session::Session,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub all_passed: bool,
    pub steps_run: usize,
}

/// Plays a list of validation steps into the session timeline, one at a time.
///
/// Each step is appended as `processing`, held for a beat, flipped to `completed` and held
/// again before the next one starts, so at most one step is ever in progress.
pub struct ValidationRunner<'a> {
    pacer: &'a dyn Pacer,
    scope: &'a ActionScope,
}

impl<'a> ValidationRunner<'a> {
    pub fn new(pacer: &'a dyn Pacer, scope: &'a ActionScope) -> Self {
        Self { pacer, scope }
    }

    pub async fn run(
        &self,
        session: &mut Session,
        steps: &[ValidationCheck],
    ) -> Result<ValidationOutcome> {
        let total = steps.len();

        for (index, check) in steps.iter().enumerate() {
            session.timeline.push(Message::new(MessageKind::ValidationStep {
                agent: Agent::Claims,
                step: index + 1,
                total,
                name: check.name.clone(),
                description: check.description.clone(),
                status: ValidationStatus::Processing,
            }));
            debug!(
                session_id = %session.id,
                step = index + 1,
                total,
                name = %check.name,
                "Validation step started"
            );
            self.scope
                .checkpoint(self.pacer, Beat::Long, session)
                .await?;

            session.timeline.complete_last_validation_step()?;
            self.scope
                .checkpoint(self.pacer, Beat::Brief, session)
                .await?;
        }

        Ok(ValidationOutcome {
            all_passed: true,
            steps_run: total,
        })
    }
}
