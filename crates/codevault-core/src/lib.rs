//! Code Vault Core - level data, submission verification, and team progression

pub mod catalog;
pub mod config;
pub mod error;
pub mod game;
pub mod normalize;
pub mod policy;
pub mod progress;
pub mod types;
pub mod verify;

pub use catalog::LevelCatalog;
pub use config::{AdminConfig, BindMode, DataConfig, ServerConfig};
pub use error::{Error, Result};
pub use game::GameFlags;
pub use normalize::normalize;
pub use policy::ScoringPolicy;
pub use progress::{
    CodeOutcome, SkipOutcome, TeamProgress, TeamRecord, TeamState, TerminalOutcome,
    ViolationOutcome,
};
pub use types::*;
pub use verify::{check, verify, verify_submission, Mismatch, Verdict};
