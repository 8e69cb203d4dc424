//! Scoring and progression constants

use serde::{Deserialize, Serialize};

/// Every number the state machine uses. Deductions always floor at zero.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Awarded for a verified code arrangement.
    pub code_success: u32,
    /// Deducted for each failed arrangement beyond `free_failures`.
    pub code_failure_penalty: u32,
    /// Failed arrangements on a level that cost nothing.
    pub free_failures: u32,
    pub terminal_success: u32,
    pub terminal_failure_penalty: u32,
    /// Violation count at which `violation_penalty` is charged.
    pub violation_penalty_at: u32,
    pub violation_penalty: u32,
    /// Violation count at which the team is locked out.
    pub lock_at: u32,
    /// The boss level: hard attempt cap, no monetary code penalty, no terminal penalty.
    pub final_level: u32,
    pub final_level_attempts: u32,
    /// Score every team starts from after a game reset.
    pub start_score: u32,
    /// Added back by an admin team reset with `restore_score`.
    pub restore_bonus: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            code_success: 500,
            code_failure_penalty: 100,
            free_failures: 2,
            terminal_success: 200,
            terminal_failure_penalty: 200,
            violation_penalty_at: 2,
            violation_penalty: 200,
            lock_at: 3,
            final_level: 10,
            final_level_attempts: 2,
            start_score: 1000,
            restore_bonus: 200,
        }
    }
}

impl ScoringPolicy {
    pub fn is_final(&self, level: u32) -> bool {
        level == self.final_level
    }

    /// Penalty for a failed arrangement that brought the counter to `attempts`.
    pub fn code_failure_cost(&self, level: u32, attempts: u32) -> u32 {
        if self.is_final(level) || attempts <= self.free_failures {
            0
        } else {
            self.code_failure_penalty
        }
    }

    /// Penalty for a wrong terminal answer on `level`.
    pub fn terminal_failure_cost(&self, level: u32) -> u32 {
        if self.is_final(level) {
            0
        } else {
            self.terminal_failure_penalty
        }
    }
}
