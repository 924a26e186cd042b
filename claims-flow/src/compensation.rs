use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Preset delay durations offered for baggage that is still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuickDelay {
    #[serde(rename = "15-hours")]
    FifteenHours,
    #[serde(rename = "2-days")]
    TwoDays,
    #[serde(rename = "lost-missing")]
    LostMissing,
}

impl QuickDelay {
    pub const ALL: [QuickDelay; 3] = [
        QuickDelay::FifteenHours,
        QuickDelay::TwoDays,
        QuickDelay::LostMissing,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            QuickDelay::FifteenHours => "15-hours",
            QuickDelay::TwoDays => "2-days",
            QuickDelay::LostMissing => "lost-missing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickDelay::FifteenHours => "15 hours",
            QuickDelay::TwoDays => "2 days",
            QuickDelay::LostMissing => "Lost/Missing",
        }
    }

    /// `None` when the baggage is considered lost rather than late.
    pub fn hours(&self) -> Option<u32> {
        match self {
            QuickDelay::FifteenHours => Some(15),
            QuickDelay::TwoDays => Some(48),
            QuickDelay::LostMissing => None,
        }
    }
}

impl FromStr for QuickDelay {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        QuickDelay::ALL
            .into_iter()
            .find(|q| q.code() == s)
            .ok_or_else(|| FlowError::invalid_option(s, "delay"))
    }
}

/// The user's answer to "how long has your baggage been delayed?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DelayChoice {
    Hours(u32),
    Option(QuickDelay),
}

impl DelayChoice {
    pub fn hours(&self) -> Option<u32> {
        match self {
            DelayChoice::Hours(h) => Some(*h),
            DelayChoice::Option(q) => q.hours(),
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, DelayChoice::Option(QuickDelay::LostMissing))
    }
}

impl fmt::Display for DelayChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayChoice::Hours(1) => write!(f, "1 hour"),
            DelayChoice::Hours(h) => write!(f, "{h} hours"),
            DelayChoice::Option(q) => f.write_str(q.label()),
        }
    }
}

/// How a flow turns the collected answers into a payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum CompensationRule {
    /// `floor(hours / block_hours) * per_block`.
    PerDelayBlock { block_hours: u32, per_block: Decimal },
    /// Amount looked up from the quick delay option.
    ByQuickDelay {
        fifteen_hours: Decimal,
        two_days: Decimal,
        lost_missing: Decimal,
    },
    Fixed { amount: Decimal },
}

impl CompensationRule {
    pub fn fixed(amount: Decimal) -> Self {
        CompensationRule::Fixed { amount }
    }

    pub fn calculate(&self, delay: Option<DelayChoice>) -> Result<Decimal> {
        match self {
            CompensationRule::Fixed { amount } => Ok(*amount),
            CompensationRule::PerDelayBlock {
                block_hours,
                per_block,
            } => {
                let hours = match delay {
                    Some(DelayChoice::Hours(h)) => h,
                    other => return Err(missing_delay(other)),
                };
                if *block_hours == 0 {
                    return Err(FlowError::InvalidOption {
                        value: "0".to_string(),
                        step: "block_hours".to_string(),
                    });
                }
                Ok(Decimal::from(hours / block_hours) * per_block)
            }
            CompensationRule::ByQuickDelay {
                fifteen_hours,
                two_days,
                lost_missing,
            } => match delay {
                Some(DelayChoice::Option(QuickDelay::FifteenHours)) => Ok(*fifteen_hours),
                Some(DelayChoice::Option(QuickDelay::TwoDays)) => Ok(*two_days),
                Some(DelayChoice::Option(QuickDelay::LostMissing)) => Ok(*lost_missing),
                other => Err(missing_delay(other)),
            },
        }
    }
}

fn missing_delay(delay: Option<DelayChoice>) -> FlowError {
    FlowError::InvalidOption {
        value: delay.map(|d| d.to_string()).unwrap_or_else(|| "none".to_string()),
        step: "compensation".to_string(),
    }
}
