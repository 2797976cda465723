use thiserror::Error;

/// Invalid configuration detected while building a session.
///
/// These are fatal at construction time: without at least one target sentence
/// and a supported time limit there is nothing to run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("sentence bank `{0}` has no usable sentences")]
    EmptySentenceBank(String),

    #[error("unknown sentence bank `{0}`")]
    UnknownSentenceBank(String),

    #[error("sentence bank `{name}` could not be read: {reason}")]
    MalformedSentenceBank { name: String, reason: String },

    #[error("unsupported time limit {0}s (expected one of 15, 30, 60, 120)")]
    UnsupportedTimeLimit(u64),
}
