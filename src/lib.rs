// Library surface: the typing-session engine and its collaborators, usable
// headlessly. The terminal front end lives in main.rs.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod match_tracker;
pub mod metrics;
pub mod runtime;
pub mod sentence_bank;
pub mod session;
pub mod stats;

pub use engine::SessionEngine;
pub use error::ConfigError;
pub use match_tracker::CorrectionPolicy;
pub use sentence_bank::SentenceBank;
pub use session::{Mode, SessionConfig, SessionState, Snapshot, TimeLimit};
pub use stats::{RoundRecord, StatsLog};
