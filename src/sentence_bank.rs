use cgisf_lib::cgisf;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use crate::error::ConfigError;

static BANK_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/sentences");

/// Names of the banks compiled into the binary.
pub const BUILTIN_BANKS: &[&str] = &["classic", "pangrams"];

#[derive(Deserialize, Debug)]
struct BankFile {
    name: String,
    sentences: Vec<String>,
}

/// Immutable, non-empty list of target sentences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceBank {
    name: String,
    sentences: Vec<String>,
}

impl SentenceBank {
    /// Builds a bank from raw sentences. Surrounding whitespace is stripped and
    /// blank entries are dropped; a bank left with nothing is rejected.
    pub fn new<I, S>(name: impl Into<String>, sentences: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        let sentences: Vec<String> = sentences
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.is_empty() {
            return Err(ConfigError::EmptySentenceBank(name));
        }

        Ok(Self { name, sentences })
    }

    /// Loads one of the embedded banks (see [`BUILTIN_BANKS`]).
    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        let file = BANK_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| ConfigError::UnknownSentenceBank(name.to_string()))?;

        let malformed = |reason: String| ConfigError::MalformedSentenceBank {
            name: name.to_string(),
            reason,
        };

        let text = file
            .contents_utf8()
            .ok_or_else(|| malformed("not valid utf-8".to_string()))?;
        let bank: BankFile = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;

        Self::new(bank.name, bank.sentences)
    }

    /// Builds a fixed bank of `count` randomly generated sentences.
    pub fn generated(count: usize) -> Result<Self, ConfigError> {
        let rng = &mut rand::thread_rng();
        let sentences = (0..count).map(|_| {
            cgisf(
                rng.gen_range(1..3),
                rng.gen_range(1..3),
                rng.gen_range(1..5),
                rng.gen_bool(0.5),
                rng.gen_range(1..3),
                rng.gen_bool(0.5),
            )
        });
        Self::new("generated", sentences.collect::<Vec<_>>())
    }

    /// Resolves a bank by name: an embedded bank, or `generated`.
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "generated" => Self::generated(20),
            other => Self::builtin(other),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    /// Uniform random pick; repeats across rounds are allowed.
    pub fn pick(&self) -> &str {
        self.pick_with(&mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // `new` guarantees at least one sentence
        self.sentences
            .choose(rng)
            .map(String::as_str)
            .unwrap_or_default()
    }
}
