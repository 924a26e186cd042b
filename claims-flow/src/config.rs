use std::time::Duration;

/// Settings shared by the catalog and the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Symbol or code prefixed to every payout amount.
    pub payout_currency: String,
    /// Base pause between scripted messages. Zero disables pacing.
    pub base_pause: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payout_currency: "$".to_string(),
            base_pause: Duration::from_millis(500),
        }
    }
}

impl EngineConfig {
    pub fn with_payout_currency(mut self, currency: impl Into<String>) -> Self {
        self.payout_currency = currency.into();
        self
    }

    pub fn with_base_pause(mut self, pause: Duration) -> Self {
        self.base_pause = pause;
        self
    }

    pub fn pacing_enabled(&self) -> bool {
        !self.base_pause.is_zero()
    }
}
