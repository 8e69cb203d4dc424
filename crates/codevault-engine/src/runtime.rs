//! Game runtime: team registry, global flags, and every state transition
//!
//! Each team sits behind its own async mutex. A transition locks the team,
//! computes the next record on a clone, commits it to the store, and only then
//! replaces the in-memory record. Duplicate requests from one team therefore
//! run one after the other, and a failed commit leaves nothing half-applied.

use crate::leaderboard::{rank, LeaderboardEntry};
use crate::store::TeamStore;
use codevault_core::{
    check, CodeOutcome, Error, Fragment, GameFlags, Level, LevelCatalog, Result, ScoringPolicy,
    SkipOutcome, Submission, TeamId, TeamRecord, TeamState, TerminalOutcome, Verdict,
    ViolationOutcome,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// What a team sees when it asks for its current level.
#[derive(Clone, Debug)]
pub enum GameView {
    Locked,
    Complete {
        score: u32,
    },
    Playing {
        level: u32,
        description: String,
        score: u32,
        violations: u32,
        attempts: u32,
        /// Shuffled, bluffs included. The canonical order is never exposed.
        fragments: Vec<Fragment>,
    },
}

#[derive(Clone, Debug)]
pub enum CodeResult {
    /// No level left for the team.
    Complete,
    Judged {
        outcome: CodeOutcome,
        verdict: Verdict,
    },
}

#[derive(Clone, Debug)]
pub enum TerminalResult {
    Complete,
    Answered(TerminalOutcome),
}

#[derive(Clone, Debug)]
pub enum SkipResult {
    Complete,
    Skipped(SkipOutcome),
}

pub struct GameRuntime {
    catalog: Arc<LevelCatalog>,
    policy: ScoringPolicy,
    store: Arc<dyn TeamStore>,
    teams: DashMap<TeamId, Arc<Mutex<TeamRecord>>>,
    flags: RwLock<GameFlags>,
    /// Serialises whole-game admin operations against each other.
    admin: Mutex<()>,
}

impl GameRuntime {
    /// Build a runtime over `store`, loading every team it holds.
    pub async fn load(
        catalog: LevelCatalog,
        policy: ScoringPolicy,
        store: Arc<dyn TeamStore>,
    ) -> Result<Self> {
        let records = store.load_all().await?;
        let teams = DashMap::new();
        for record in records {
            teams.insert(record.id().clone(), Arc::new(Mutex::new(record)));
        }
        info!(
            "Game runtime ready: {} teams, {} levels, final level {}",
            teams.len(),
            catalog.len(),
            policy.final_level
        );
        Ok(Self {
            catalog: Arc::new(catalog),
            policy,
            store,
            teams,
            flags: RwLock::new(GameFlags::default()),
            admin: Mutex::new(()),
        })
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn lookup_level(&self, level_number: u32, variant: u32) -> Option<&Level> {
        self.catalog.lookup(level_number, variant)
    }

    /// A consistent copy of the global flags.
    pub async fn flags(&self) -> GameFlags {
        *self.flags.read().await
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Snapshot of one team's record.
    pub async fn team(&self, team: &TeamId) -> Result<TeamRecord> {
        let slot = self.slot(team)?;
        let record = slot.lock().await.clone();
        Ok(record)
    }

    /// Add a new team and persist it.
    ///
    /// Registrations are serialised with the other whole-game admin operations,
    /// so the existence check and the insert cannot interleave with another one.
    pub async fn register_team(&self, record: TeamRecord) -> Result<()> {
        let _admin = self.admin.lock().await;
        let id = record.id().clone();
        if self.teams.contains_key(&id) {
            return Err(Error::TeamExists(id.to_string()));
        }
        self.store.commit(&record).await?;
        match self.teams.entry(id.clone()) {
            Entry::Occupied(_) => return Err(Error::TeamExists(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(record)));
            }
        }
        info!(team = %id, "team registered");
        Ok(())
    }

    /// Resolve a login attempt to the stored record. Credential checks are the caller's.
    pub async fn login(&self, raw_team_id: &str) -> Result<TeamRecord> {
        self.flags().await.ensure_event_open()?;
        let id = TeamId::sanitize(raw_team_id);
        self.team(&id).await
    }

    pub async fn game_data(&self, team: &TeamId) -> Result<GameView> {
        let record = self.team(team).await?;
        let progress = &record.progress;
        match progress.state(&self.catalog) {
            TeamState::Locked { .. } => Ok(GameView::Locked),
            TeamState::Complete => Ok(GameView::Complete {
                score: progress.score,
            }),
            TeamState::Active {
                level,
                attempts,
                violations,
            } => {
                let data = self.catalog.require(level, progress.variant)?;
                let mut fragments = data.fragments.clone();
                fragments.shuffle(&mut rand::rng());
                Ok(GameView::Playing {
                    level,
                    description: data.description.clone(),
                    score: progress.score,
                    violations,
                    attempts,
                    fragments,
                })
            }
        }
    }

    /// Verify an arrangement and apply the result.
    ///
    /// `answered_level`, when given, must be the team's current level.
    pub async fn submit_code(
        &self,
        team: &TeamId,
        submission: &Submission,
        answered_level: Option<u32>,
    ) -> Result<CodeResult> {
        let catalog = &self.catalog;
        let policy = &self.policy;
        self.mutate(team, |record, flags| {
            let progress = &mut record.progress;
            progress.ensure_can_submit(flags)?;
            let Some(level) = catalog.lookup(progress.current_level, progress.variant) else {
                return Ok(CodeResult::Complete);
            };
            progress.ensure_on_level(answered_level)?;
            progress.admit_code(policy)?;
            let verdict = check(&submission.flatten(), level);
            let outcome = progress.apply_code_result(verdict.is_accepted(), policy);
            Ok(CodeResult::Judged { outcome, verdict })
        })
        .await
    }

    pub async fn submit_terminal(
        &self,
        team: &TeamId,
        answered_level: Option<u32>,
        user_output: &str,
    ) -> Result<TerminalResult> {
        let catalog = &self.catalog;
        let policy = &self.policy;
        self.mutate(team, |record, flags| {
            let progress = &mut record.progress;
            progress.ensure_can_submit(flags)?;
            let Some(level) = catalog.lookup(progress.current_level, progress.variant) else {
                return Ok(TerminalResult::Complete);
            };
            progress.ensure_on_level(answered_level)?;
            Ok(TerminalResult::Answered(
                progress.apply_terminal_result(level, user_output, policy),
            ))
        })
        .await
    }

    pub async fn skip_terminal(
        &self,
        team: &TeamId,
        answered_level: Option<u32>,
    ) -> Result<SkipResult> {
        let catalog = &self.catalog;
        self.mutate(team, |record, flags| {
            let progress = &mut record.progress;
            progress.ensure_can_submit(flags)?;
            if catalog
                .lookup(progress.current_level, progress.variant)
                .is_none()
            {
                return Ok(SkipResult::Complete);
            }
            progress.ensure_on_level(answered_level)?;
            Ok(SkipResult::Skipped(progress.apply_skip()))
        })
        .await
    }

    /// Record a focus loss. Counted even while the game is paused or the team is locked.
    pub async fn report_violation(&self, team: &TeamId) -> Result<ViolationOutcome> {
        let policy = &self.policy;
        self.mutate(team, |record, _| Ok(record.progress.apply_violation(policy)))
            .await
    }

    pub async fn start_game(&self) -> GameFlags {
        let mut flags = self.flags.write().await;
        flags.start();
        info!("game started");
        *flags
    }

    pub async fn end_game(&self) -> GameFlags {
        let mut flags = self.flags.write().await;
        flags.end();
        info!("event closed");
        *flags
    }

    /// Reopen a closed event without touching any team.
    pub async fn open_event(&self) -> GameFlags {
        let mut flags = self.flags.write().await;
        flags.open_event();
        info!("event reopened");
        *flags
    }

    /// Unlock a team and clear its violations.
    pub async fn reset_team(&self, team: &TeamId, restore_score: bool) -> Result<TeamRecord> {
        let policy = &self.policy;
        let record = self
            .mutate(team, |record, _| {
                record.progress.admin_reset(restore_score, policy);
                Ok(record.clone())
            })
            .await?;
        info!(team = %team, restore_score, score = record.progress.score, "team reset");
        Ok(record)
    }

    /// Put every team back to the start and return to the lobby.
    ///
    /// Flags only change after the store has accepted every reset record.
    pub async fn reset_game(&self) -> Result<GameFlags> {
        let _admin = self.admin.lock().await;

        let mut slots: Vec<(TeamId, Arc<Mutex<TeamRecord>>)> = self
            .teams
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));

        let mut guards = Vec::with_capacity(slots.len());
        for (_, slot) in &slots {
            guards.push(slot.lock().await);
        }
        let next: Vec<TeamRecord> = guards
            .iter()
            .map(|guard| {
                let mut record = (**guard).clone();
                record.progress.reset_for_new_game(&self.policy);
                record
            })
            .collect();

        if let Err(e) = self.store.commit_all(&next).await {
            warn!("game reset aborted: {}", e);
            return Err(e);
        }
        for (guard, record) in guards.iter_mut().zip(next) {
            **guard = record;
        }

        let mut flags = self.flags.write().await;
        flags.reset();
        info!("game reset: {} teams back to level 1", slots.len());
        Ok(*flags)
    }

    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let slots: Vec<Arc<Mutex<TeamRecord>>> =
            self.teams.iter().map(|e| e.value().clone()).collect();
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            entries.push(LeaderboardEntry::from(&slot.lock().await.progress));
        }
        rank(entries)
    }

    fn slot(&self, team: &TeamId) -> Result<Arc<Mutex<TeamRecord>>> {
        self.teams
            .get(team)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::team_not_found(team.as_str()))
    }

    /// Run `f` on a copy of the team's record and persist the copy if it changed.
    ///
    /// The flags snapshot handed to `f` is taken after the team lock is held, so
    /// a game reset that held this team cannot be followed by a stale gate check.
    async fn mutate<T, F>(&self, team: &TeamId, f: F) -> Result<T>
    where
        F: FnOnce(&mut TeamRecord, &GameFlags) -> Result<T>,
    {
        let slot = self.slot(team)?;
        let mut current = slot.lock().await;
        let flags = self.flags().await;
        let mut next = current.clone();
        let result = f(&mut next, &flags)?;
        if next != *current {
            self.store.commit(&next).await?;
            *current = next;
        }
        Ok(result)
    }
}
