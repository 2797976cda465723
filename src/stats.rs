use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::metrics::{mean, std_dev, Tier};

/// Outcome of one sentence-mode round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceResult {
    pub round: u32,
    pub timestamp: DateTime<Local>,
    pub target: String,
    pub elapsed_secs: f64,
    pub wpm: f64,
    pub cps: f64,
    /// Absent for live-correction rounds, where every kept character is right.
    pub accuracy: Option<f64>,
}

/// Outcome of one timed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedResult {
    pub round: u32,
    pub timestamp: DateTime<Local>,
    /// The configured run length; metrics are computed over this, not wall time.
    pub duration_secs: u64,
    pub wpm: f64,
    pub cps: f64,
    pub chars: usize,
    pub words: f64,
    pub sentences: u32,
}

/// Snapshot of a completed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundRecord {
    Sentence(SentenceResult),
    Timed(TimedResult),
}

impl RoundRecord {
    pub fn round(&self) -> u32 {
        match self {
            RoundRecord::Sentence(r) => r.round,
            RoundRecord::Timed(r) => r.round,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            RoundRecord::Sentence(r) => r.timestamp,
            RoundRecord::Timed(r) => r.timestamp,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        match self {
            RoundRecord::Sentence(r) => r.elapsed_secs,
            RoundRecord::Timed(r) => r.duration_secs as f64,
        }
    }

    pub fn wpm(&self) -> f64 {
        match self {
            RoundRecord::Sentence(r) => r.wpm,
            RoundRecord::Timed(r) => r.wpm,
        }
    }

    pub fn cps(&self) -> f64 {
        match self {
            RoundRecord::Sentence(r) => r.cps,
            RoundRecord::Timed(r) => r.cps,
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        match self {
            RoundRecord::Sentence(r) => r.accuracy,
            RoundRecord::Timed(_) => None,
        }
    }

    pub fn tier(&self) -> Tier {
        Tier::classify(self.wpm(), self.accuracy())
    }
}

/// Aggregate figures over the whole log.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub count: usize,
    pub avg_wpm: f64,
    pub best_wpm: f64,
    pub wpm_std_dev: f64,
    pub avg_cps: f64,
    pub best_cps: f64,
    /// Only over rounds that tracked accuracy; `None` if there were none.
    pub avg_accuracy: Option<f64>,
    pub best_accuracy: Option<f64>,
}

/// Append-only history of completed rounds for this process.
#[derive(Debug, Clone, Default)]
pub struct StatsLog {
    records: Vec<RoundRecord>,
}

impl StatsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: RoundRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// The last `n` records in insertion order.
    pub fn recent(&self, n: usize) -> &[RoundRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// `None` until at least one round has been recorded.
    pub fn aggregate(&self) -> Option<Aggregate> {
        if self.records.is_empty() {
            return None;
        }

        let wpms: Vec<f64> = self.records.iter().map(RoundRecord::wpm).collect();
        let cpss: Vec<f64> = self.records.iter().map(RoundRecord::cps).collect();
        let accs: Vec<f64> = self
            .records
            .iter()
            .filter_map(RoundRecord::accuracy)
            .collect();

        Some(Aggregate {
            count: self.records.len(),
            avg_wpm: mean(&wpms)?,
            best_wpm: max(&wpms)?,
            wpm_std_dev: std_dev(&wpms)?,
            avg_cps: mean(&cpss)?,
            best_cps: max(&cpss)?,
            avg_accuracy: mean(&accs),
            best_accuracy: max(&accs),
        })
    }
}

fn max(data: &[f64]) -> Option<f64> {
    data.iter().copied().reduce(f64::max)
}
