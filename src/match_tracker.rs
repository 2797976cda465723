use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// How typed input that diverges from the target is handled.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CorrectionPolicy {
    /// Accept anything; accuracy is graded against the final text.
    Permissive,
    /// Revert everything past the first wrong character.
    #[default]
    StrictPrefix,
}

impl CorrectionPolicy {
    /// Whether per-position accuracy means anything under this policy.
    /// Strict-prefix input can never be wrong at a position, so it is not tracked.
    pub fn tracks_accuracy(self) -> bool {
        matches!(self, CorrectionPolicy::Permissive)
    }
}

/// Result of checking an input buffer against a target.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// The buffer after the policy was applied.
    pub accepted: String,
    /// Length of the longest prefix of `accepted` that matches the target.
    pub correct_prefix_len: usize,
    /// Positions in `accepted` that match the target, wherever they are.
    pub correct_chars: usize,
    /// Set when the policy cut the buffer short.
    pub truncated: bool,
    pub completed: bool,
    pub progress_percent: f64,
}

impl Evaluation {
    /// Number of characters in the accepted buffer.
    pub fn accepted_len(&self) -> usize {
        self.accepted.chars().count()
    }
}

/// Compares `input` with `target` by ordinal character equality and applies `policy`.
///
/// Both policies clamp the buffer to the target length. Strict-prefix also
/// drops everything from the first mismatch onward.
pub fn evaluate(target: &str, input: &str, policy: CorrectionPolicy) -> Evaluation {
    let target_chars: Vec<char> = target.chars().collect();
    let input_chars: Vec<char> = input.chars().collect();

    let correct_prefix_len = input_chars
        .iter()
        .zip(&target_chars)
        .take_while(|(got, expected)| got == expected)
        .count();

    let keep = match policy {
        CorrectionPolicy::StrictPrefix => correct_prefix_len,
        CorrectionPolicy::Permissive => input_chars.len().min(target_chars.len()),
    };
    let truncated = keep < input_chars.len();
    if truncated {
        trace!(
            dropped = input_chars.len() - keep,
            kept = keep,
            %policy,
            "input truncated"
        );
    }

    let accepted: String = input_chars[..keep].iter().collect();
    let correct_chars = input_chars[..keep]
        .iter()
        .zip(&target_chars)
        .filter(|(got, expected)| got == expected)
        .count();

    let progress_percent = if target_chars.is_empty() {
        0.0
    } else {
        (keep as f64 / target_chars.len() as f64 * 100.0).min(100.0)
    };

    Evaluation {
        completed: is_complete(target, &accepted),
        accepted,
        correct_prefix_len,
        correct_chars,
        truncated,
        progress_percent,
    }
}

/// A round is complete when the buffer and target agree once surrounding
/// whitespace is ignored on both.
pub fn is_complete(target: &str, buffer: &str) -> bool {
    !target.trim().is_empty() && buffer.trim() == target.trim()
}

/// A position where the typed text differs from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub position: usize,
    pub expected: char,
    pub got: char,
}

/// Every differing position over the overlapping range of `target` and `input`.
pub fn mismatches(target: &str, input: &str) -> Vec<Mismatch> {
    target
        .chars()
        .zip(input.chars())
        .enumerate()
        .filter(|(_, (expected, got))| expected != got)
        .map(|(position, (expected, got))| Mismatch {
            position,
            expected,
            got,
        })
        .collect()
}
