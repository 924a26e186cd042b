use thiserror::Error;

/// Errors produced by the conversation engine and its runner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Action '{action}' is not allowed in step '{step}'")]
    InvalidTransition { action: String, step: String },

    #[error("'{value}' is not a valid choice in step '{step}'")]
    InvalidOption { value: String, step: String },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Session {0} already has an action in flight")]
    SessionBusy(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Action cancelled by a session reset")]
    Cancelled,

    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Timeline invariant violated: {0}")]
    TimelineInvariant(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl FlowError {
    pub(crate) fn invalid_transition(action: &str, step: &str) -> Self {
        FlowError::InvalidTransition {
            action: action.to_string(),
            step: step.to_string(),
        }
    }

    pub(crate) fn invalid_option(value: impl ToString, step: &str) -> Self {
        FlowError::InvalidOption {
            value: value.to_string(),
            step: step.to_string(),
        }
    }

    /// Errors the engine reports *after* writing an explanatory message to the timeline.
    /// The session the action ran against stays valid and must be kept.
    pub fn is_surfaced_in_timeline(&self) -> bool {
        matches!(self, FlowError::ProviderUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
