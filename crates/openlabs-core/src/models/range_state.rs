use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state machine for a Deployed Range.
///
/// `NONE -> SYNTHESIZING -> APPLYING -> ON` on a successful deploy;
/// `ON -> DESTROYING -> NONE` on a successful destroy. Any step may
/// transition to `FAILED`, which is terminal until an operator retries
/// destroy against the persisted state blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RangeState {
    None,
    Synthesizing,
    Applying,
    On,
    Destroying,
    Failed,
}

impl RangeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeState::None => "none",
            RangeState::Synthesizing => "synthesizing",
            RangeState::Applying => "applying",
            RangeState::On => "on",
            RangeState::Destroying => "destroying",
            RangeState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for RangeState {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(RangeState::None),
            "synthesizing" => Ok(RangeState::Synthesizing),
            "applying" => Ok(RangeState::Applying),
            "on" => Ok(RangeState::On),
            "destroying" => Ok(RangeState::Destroying),
            "failed" => Ok(RangeState::Failed),
            other => Err(crate::error::CoreError::Validation(format!(
                "unknown range state: {other}"
            ))),
        }
    }
}
