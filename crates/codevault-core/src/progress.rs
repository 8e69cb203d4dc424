//! Per-team progression state machine
//!
//! Every transition is a method on [`TeamProgress`] that either rejects with an
//! [`Error`] before touching anything, or applies the whole update. Callers that
//! need all-or-nothing persistence mutate a clone and swap it in after commit.

use crate::catalog::LevelCatalog;
use crate::error::{Error, Result};
use crate::game::GameFlags;
use crate::policy::ScoringPolicy;
use crate::types::{Level, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamProgress {
    pub team_id: TeamId,
    #[serde(default)]
    pub variant: u32,
    pub score: u32,
    pub current_level: u32,
    /// Failed arrangements since the last verified one or level change.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub violations: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Where a team stands, derived from its progress and the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TeamState {
    Active {
        level: u32,
        attempts: u32,
        violations: u32,
    },
    Locked {
        level: u32,
        violations: u32,
    },
    Complete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeOutcome {
    pub success: bool,
    pub score: u32,
    pub attempts: u32,
    pub locked: bool,
    pub penalty: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalOutcome {
    pub correct: bool,
    pub score: u32,
    pub next_level: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationOutcome {
    pub violations: u32,
    pub locked: bool,
    pub score: u32,
    pub penalty: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipOutcome {
    pub score: u32,
    pub next_level: u32,
}

impl TeamProgress {
    pub fn new(team_id: impl Into<TeamId>, variant: u32, score: u32) -> Self {
        Self {
            team_id: team_id.into(),
            variant,
            score,
            current_level: 1,
            attempts: 0,
            violations: 0,
            locked: false,
            updated_at: Utc::now(),
        }
    }

    pub fn state(&self, catalog: &LevelCatalog) -> TeamState {
        if self.locked {
            TeamState::Locked {
                level: self.current_level,
                violations: self.violations,
            }
        } else if catalog.lookup(self.current_level, self.variant).is_none() {
            TeamState::Complete
        } else {
            TeamState::Active {
                level: self.current_level,
                attempts: self.attempts,
                violations: self.violations,
            }
        }
    }

    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(Error::TeamLocked(self.team_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Common gate for code, terminal and skip requests.
    pub fn ensure_can_submit(&self, flags: &GameFlags) -> Result<()> {
        flags.ensure_accepting()?;
        self.ensure_unlocked()
    }

    /// Reject a request that was made against a level the team already left.
    pub fn ensure_on_level(&self, answered: Option<u32>) -> Result<()> {
        match answered {
            Some(expected) if expected != self.current_level => Err(Error::StaleLevel {
                expected,
                current: self.current_level,
            }),
            _ => Ok(()),
        }
    }

    /// Sudden death: on the final level, once the cap of failed attempts is
    /// spent, further arrangements are refused without being verified.
    pub fn admit_code(&self, policy: &ScoringPolicy) -> Result<()> {
        if policy.is_final(self.current_level) && self.attempts >= policy.final_level_attempts {
            return Err(Error::AttemptsExhausted {
                level: self.current_level,
                attempts: self.attempts,
            });
        }
        Ok(())
    }

    pub fn apply_code_result(&mut self, success: bool, policy: &ScoringPolicy) -> CodeOutcome {
        let mut penalty = 0;
        if success {
            self.score = self.score.saturating_add(policy.code_success);
            self.attempts = 0;
            info!(team = %self.team_id, level = self.current_level, score = self.score, "arrangement verified");
        } else {
            self.attempts += 1;
            penalty = policy.code_failure_cost(self.current_level, self.attempts);
            self.score = self.score.saturating_sub(penalty);
            debug!(
                team = %self.team_id,
                level = self.current_level,
                attempts = self.attempts,
                penalty,
                "arrangement rejected"
            );
        }
        self.touch();
        CodeOutcome {
            success,
            score: self.score,
            attempts: self.attempts,
            locked: self.locked,
            penalty,
        }
    }

    /// Score the terminal answer for `level` and advance, right or wrong.
    pub fn apply_terminal_result(
        &mut self,
        level: &Level,
        user_output: &str,
        policy: &ScoringPolicy,
    ) -> TerminalOutcome {
        let correct = user_output.trim() == level.expected_terminal_output.trim();
        if correct {
            self.score = self.score.saturating_add(policy.terminal_success);
        } else {
            let cost = policy.terminal_failure_cost(level.level_number);
            self.score = self.score.saturating_sub(cost);
        }
        self.advance();
        info!(
            team = %self.team_id,
            correct,
            score = self.score,
            next_level = self.current_level,
            "terminal answered"
        );
        TerminalOutcome {
            correct,
            score: self.score,
            next_level: self.current_level,
        }
    }

    pub fn apply_skip(&mut self) -> SkipOutcome {
        self.advance();
        info!(team = %self.team_id, next_level = self.current_level, "terminal skipped");
        SkipOutcome {
            score: self.score,
            next_level: self.current_level,
        }
    }

    /// Record a loss of exclusive focus.
    pub fn apply_violation(&mut self, policy: &ScoringPolicy) -> ViolationOutcome {
        self.violations += 1;
        let mut penalty = 0;
        if self.violations == policy.violation_penalty_at {
            penalty = policy.violation_penalty;
            self.score = self.score.saturating_sub(penalty);
        }
        if self.violations >= policy.lock_at && !self.locked {
            self.locked = true;
            warn!(team = %self.team_id, violations = self.violations, "team locked");
        }
        self.touch();
        ViolationOutcome {
            violations: self.violations,
            locked: self.locked,
            score: self.score,
            penalty,
        }
    }

    /// Administrative unlock. The only way out of the locked state.
    pub fn admin_reset(&mut self, restore_score: bool, policy: &ScoringPolicy) {
        self.violations = 0;
        self.locked = false;
        if restore_score {
            self.score = self.score.saturating_add(policy.restore_bonus);
        }
        self.touch();
    }

    /// Start-over state for a whole-game reset.
    pub fn reset_for_new_game(&mut self, policy: &ScoringPolicy) {
        self.score = policy.start_score;
        self.current_level = 1;
        self.attempts = 0;
        self.violations = 0;
        self.locked = false;
        self.touch();
    }

    fn advance(&mut self) {
        self.current_level += 1;
        self.attempts = 0;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// What gets persisted for a team.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    #[serde(flatten)]
    pub progress: TeamProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl TeamRecord {
    pub fn new(team_id: impl Into<TeamId>, variant: u32, score: u32) -> Self {
        Self {
            progress: TeamProgress::new(team_id, variant, score),
            pin: None,
        }
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn id(&self) -> &TeamId {
        &self.progress.team_id
    }
}
