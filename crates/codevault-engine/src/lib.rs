//! Code Vault Engine - per-team game runtime with pluggable persistence

pub mod leaderboard;
pub mod runtime;
pub mod store;

pub use leaderboard::LeaderboardEntry;
pub use runtime::{CodeResult, GameRuntime, GameView, SkipResult, TerminalResult};
pub use store::{JsonFileStore, MemoryStore, TeamStore};
