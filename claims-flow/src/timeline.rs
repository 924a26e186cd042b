use serde::{Deserialize, Serialize};

use crate::{
    error::{FlowError, Result},
    message::{Message, MessageKind, ValidationStatus},
};

/// Append-only, insertion-ordered log of conversation messages.
///
/// The only in-place mutation allowed is flipping the status of the most recently appended
/// validation step from `processing` to `completed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    messages: Vec<Message>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Marks the last message completed. Fails unless that message is a validation step
    /// still in `processing`.
    pub fn complete_last_validation_step(&mut self) -> Result<()> {
        match self.messages.last_mut().map(|m| &mut m.kind) {
            Some(MessageKind::ValidationStep { status, .. })
                if *status == ValidationStatus::Processing =>
            {
                *status = ValidationStatus::Completed;
                Ok(())
            }
            Some(MessageKind::ValidationStep { name, .. }) => Err(FlowError::TimelineInvariant(
                format!("validation step '{}' is already completed", name),
            )),
            _ => Err(FlowError::TimelineInvariant(
                "last message is not a validation step".to_string(),
            )),
        }
    }

    /// Number of validation steps currently shown as `processing`.
    pub fn processing_steps(&self) -> usize {
        self.messages.iter().filter(|m| m.is_processing_step()).count()
    }

    pub fn validation_steps(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| matches!(m.kind, MessageKind::ValidationStep { .. }))
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
