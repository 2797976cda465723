use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::match_tracker::CorrectionPolicy;

/// Which kind of round the engine runs.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// One target sentence per round.
    #[default]
    Sentence,
    /// Fixed duration with sentences streamed back to back.
    Timed,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Sentence => Mode::Timed,
            Mode::Timed => Mode::Sentence,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    /// Nothing shown yet.
    Idle,
    /// Target shown, clock not running.
    Armed,
    /// Clock running, input accepted.
    Active,
    /// Round finished, input locked.
    Completed,
}

/// Duration of a timed run, restricted to the supported selections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TimeLimit(u64);

impl TimeLimit {
    pub const SUPPORTED: [u64; 4] = [15, 30, 60, 120];

    pub fn from_secs(secs: u64) -> Result<Self, ConfigError> {
        if Self::SUPPORTED.contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(ConfigError::UnsupportedTimeLimit(secs))
        }
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    /// The next supported limit, wrapping around after the longest.
    pub fn cycled(self) -> Self {
        let idx = Self::SUPPORTED
            .iter()
            .position(|&s| s == self.0)
            .unwrap_or(0);
        Self(Self::SUPPORTED[(idx + 1) % Self::SUPPORTED.len()])
    }
}

impl Default for TimeLimit {
    fn default() -> Self {
        Self(60)
    }
}

impl TryFrom<u64> for TimeLimit {
    type Error = ConfigError;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::from_secs(secs)
    }
}

impl From<TimeLimit> for u64 {
    fn from(limit: TimeLimit) -> Self {
        limit.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: Mode,
    pub correction: CorrectionPolicy,
    pub time_limit: TimeLimit,
}

/// Everything the presentation layer needs to draw the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: SessionState,
    pub mode: Mode,
    pub correction: CorrectionPolicy,
    pub round: u32,
    pub target: String,
    pub buffer: String,
    pub progress_percent: f64,
    pub elapsed_secs: f64,
    pub wpm: f64,
    pub cps: f64,
    /// `None` when the policy does not track accuracy.
    pub accuracy_percent: Option<f64>,
    /// Timed mode only.
    pub remaining_secs: Option<u64>,
    /// Timed mode only.
    pub sentences_completed: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_limit_accepts_supported_values() {
        for secs in TimeLimit::SUPPORTED {
            assert_eq!(TimeLimit::from_secs(secs).unwrap().secs(), secs);
        }
        assert_eq!(
            TimeLimit::from_secs(45),
            Err(ConfigError::UnsupportedTimeLimit(45))
        );
        assert_eq!(
            TimeLimit::from_secs(0),
            Err(ConfigError::UnsupportedTimeLimit(0))
        );
    }

    #[test]
    fn time_limit_cycles() {
        let limit = TimeLimit::from_secs(60).unwrap();
        assert_eq!(limit.cycled().secs(), 120);
        assert_eq!(limit.cycled().cycled().secs(), 15);
    }

    #[test]
    fn time_limit_serde_validates() {
        let limit: TimeLimit = serde_json::from_str("30").unwrap();
        assert_eq!(limit.secs(), 30);
        assert!(serde_json::from_str::<TimeLimit>("31").is_err());
        assert_eq!(serde_json::to_string(&limit).unwrap(), "30");
    }

    #[test]
    fn mode_toggles_and_displays() {
        assert_eq!(Mode::Sentence.toggled(), Mode::Timed);
        assert_eq!(Mode::Timed.toggled(), Mode::Sentence);
        assert_eq!(Mode::Timed.to_string(), "timed");
    }

    #[test]
    fn defaults() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.mode, Mode::Sentence);
        assert_eq!(cfg.correction, CorrectionPolicy::StrictPrefix);
        assert_eq!(cfg.time_limit.secs(), 60);
    }
}
