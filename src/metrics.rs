/// Characters that make up one standard word.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Words per minute, counting five characters as a word.
pub fn wpm(chars_typed: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (chars_typed as f64 / CHARS_PER_WORD) / (elapsed_secs / 60.0)
}

/// Characters per second.
pub fn cps(chars_typed: usize, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    chars_typed as f64 / elapsed_secs
}

/// Percentage of the target typed correctly, clamped to `0..=100`.
pub fn accuracy(correct_chars: usize, target_len: usize) -> f64 {
    if target_len == 0 {
        return 0.0;
    }
    (correct_chars as f64 / target_len as f64 * 100.0).clamp(0.0, 100.0)
}

/// Standard word count for a number of characters.
pub fn words(chars: usize) -> f64 {
    chars as f64 / CHARS_PER_WORD
}

/// Performance rating for a finished round.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum Tier {
    Practicing,
    Good,
    Excellent,
}

impl Tier {
    /// Rates a result. When `accuracy` is `None` (live-correction rounds) the
    /// rating is speed-only at the same cutoffs.
    pub fn classify(wpm: f64, accuracy: Option<f64>) -> Self {
        let meets = |min_wpm: f64, min_acc: f64| {
            wpm >= min_wpm && accuracy.map_or(true, |acc| acc >= min_acc)
        };

        if meets(60.0, 95.0) {
            Tier::Excellent
        } else if meets(40.0, 85.0) {
            Tier::Good
        } else {
            Tier::Practicing
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tier::Excellent => "EXCELLENT!",
            Tier::Good => "GOOD JOB!",
            Tier::Practicing => "KEEP PRACTICING!",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Tier::Excellent => "You're a typing master!",
            Tier::Good => "Great work, keep it up!",
            Tier::Practicing => "You're improving!",
        }
    }
}

/// Band for a single speed figure, used to colour live readouts.
pub fn wpm_band(wpm: f64) -> Tier {
    Tier::classify(wpm, None)
}

/// Band for a single accuracy figure.
pub fn accuracy_band(accuracy: f64) -> Tier {
    if accuracy >= 95.0 {
        Tier::Excellent
    } else if accuracy >= 85.0 {
        Tier::Good
    } else {
        Tier::Practicing
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}
