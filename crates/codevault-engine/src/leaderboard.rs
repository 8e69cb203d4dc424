//! Leaderboard ranking

use codevault_core::{TeamId, TeamProgress};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub team_id: TeamId,
    pub score: u32,
    pub current_level: u32,
    pub violations: u32,
    pub locked: bool,
    pub attempts: u32,
}

impl From<&TeamProgress> for LeaderboardEntry {
    fn from(p: &TeamProgress) -> Self {
        Self {
            team_id: p.team_id.clone(),
            score: p.score,
            current_level: p.current_level,
            violations: p.violations,
            locked: p.locked,
            attempts: p.attempts,
        }
    }
}

/// Higher score first, then further along, then fewer violations.
/// Team id breaks remaining ties so the order is stable between polls.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(compare);
    entries
}

fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.current_level.cmp(&a.current_level))
        .then(a.violations.cmp(&b.violations))
        .then_with(|| a.team_id.cmp(&b.team_id))
}
