//! Tests for codevault-engine: GameRuntime transitions, persistence, concurrency

use async_trait::async_trait;
use codevault_core::*;
use codevault_engine::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Memory store that can be told to refuse or slow down commits.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl FlakyStore {
    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    async fn pause(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    async fn stored(&self, team: &TeamId) -> Option<TeamRecord> {
        let records = self.inner.load_all().await.unwrap();
        records.into_iter().find(|r| r.id() == team)
    }
}

#[async_trait]
impl TeamStore for FlakyStore {
    async fn load_all(&self) -> Result<Vec<TeamRecord>> {
        self.inner.load_all().await
    }

    async fn commit(&self, record: &TeamRecord) -> Result<()> {
        self.pause().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::storage("disk unplugged"));
        }
        self.inner.commit(record).await
    }

    async fn commit_all(&self, records: &[TeamRecord]) -> Result<()> {
        self.pause().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::storage("disk unplugged"));
        }
        self.inner.commit_all(records).await
    }
}

fn alpha() -> TeamId {
    TeamId::from("alpha")
}

async fn runtime_with(store: Arc<dyn TeamStore>) -> GameRuntime {
    GameRuntime::load(LevelCatalog::builtin().unwrap(), ScoringPolicy::default(), store)
        .await
        .unwrap()
}

async fn started_runtime() -> GameRuntime {
    let store = MemoryStore::with_records([
        TeamRecord::new("alpha", 0, 1000).with_pin("1234"),
        TeamRecord::new("bravo", 1, 1000),
    ]);
    let rt = runtime_with(Arc::new(store)).await;
    rt.start_game().await;
    rt
}

fn canonical(rt: &GameRuntime, level: u32, variant: u32) -> Submission {
    Submission::new(vec![rt
        .lookup_level(level, variant)
        .unwrap()
        .canonical_sequence
        .clone()])
}

fn scrambled(rt: &GameRuntime, level: u32, variant: u32) -> Submission {
    let mut ids = rt
        .lookup_level(level, variant)
        .unwrap()
        .canonical_sequence
        .clone();
    ids.reverse();
    Submission::new(vec![ids])
}

async fn set_level(rt: &GameRuntime, team: &TeamId, level: u32) {
    while rt.team(team).await.unwrap().progress.current_level < level {
        rt.skip_terminal(team, None).await.unwrap();
    }
}

// ===========================================================================
// Loading, login, game data
// ===========================================================================

#[tokio::test]
async fn load_registers_store_teams() {
    let rt = started_runtime().await;
    assert_eq!(rt.team_count(), 2);
    assert_eq!(rt.team(&alpha()).await.unwrap().progress.score, 1000);
}

#[tokio::test]
async fn login_sanitizes_id() {
    let rt = started_runtime().await;
    let record = rt.login("  ALPHA ").await.unwrap();
    assert_eq!(record.id().as_str(), "alpha");
    assert_eq!(record.pin.as_deref(), Some("1234"));
    assert!(matches!(rt.login("nobody").await, Err(Error::TeamNotFound(_))));
}

#[tokio::test]
async fn login_refused_when_event_closed() {
    let rt = started_runtime().await;
    rt.end_game().await;
    assert!(matches!(rt.login("alpha").await, Err(Error::EventClosed)));
}

#[tokio::test]
async fn game_data_hides_canonical_order() {
    let rt = started_runtime().await;
    match rt.game_data(&alpha()).await.unwrap() {
        GameView::Playing {
            level,
            score,
            fragments,
            ..
        } => {
            assert_eq!(level, 1);
            assert_eq!(score, 1000);
            let level = rt.lookup_level(1, 0).unwrap();
            assert_eq!(fragments.len(), level.fragments.len());
            for f in &level.fragments {
                assert!(fragments.contains(f));
            }
        }
        other => panic!("expected Playing, got {:?}", other),
    }
}

#[tokio::test]
async fn game_data_uses_team_variant() {
    let rt = started_runtime().await;
    match rt.game_data(&TeamId::from("bravo")).await.unwrap() {
        GameView::Playing { fragments, .. } => {
            assert!(fragments.iter().any(|f| f.text.contains("{2, 4, 6, 8, 10}")));
        }
        other => panic!("expected Playing, got {:?}", other),
    }
}

#[tokio::test]
async fn game_data_reports_complete_after_last_level() {
    let rt = started_runtime().await;
    set_level(&rt, &alpha(), 11).await;
    assert!(matches!(
        rt.game_data(&alpha()).await.unwrap(),
        GameView::Complete { score: 1000 }
    ));
}

// ===========================================================================
// Code submissions
// ===========================================================================

#[tokio::test]
async fn submit_code_success() {
    let rt = started_runtime().await;
    let sub = canonical(&rt, 1, 0);
    match rt.submit_code(&alpha(), &sub, Some(1)).await.unwrap() {
        CodeResult::Judged { outcome, verdict } => {
            assert!(outcome.success);
            assert_eq!(verdict, Verdict::Accepted);
            assert_eq!(outcome.score, 1500);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn submit_code_accepts_group_swap_across_rows() {
    let rt = started_runtime().await;
    // Level 1 allows the array and sum declarations in either order.
    let sub = Submission::new(vec![
        vec!["1".into(), "2".into()],
        vec!["4".into(), "3".into()],
        ["5", "6", "7", "8", "9", "10"].iter().map(|s| FragmentId::from(*s)).collect(),
    ]);
    let result = rt.submit_code(&alpha(), &sub, None).await.unwrap();
    assert!(matches!(result, CodeResult::Judged { outcome, .. } if outcome.success));
}

#[tokio::test]
async fn submit_code_penalty_from_third_failure() {
    let rt = started_runtime().await;
    let bad = scrambled(&rt, 1, 0);
    let mut scores = Vec::new();
    for _ in 0..4 {
        match rt.submit_code(&alpha(), &bad, None).await.unwrap() {
            CodeResult::Judged { outcome, .. } => scores.push(outcome.score),
            other => panic!("unexpected {:?}", other),
        }
    }
    assert_eq!(scores, vec![1000, 1000, 900, 800]);
    assert_eq!(rt.team(&alpha()).await.unwrap().progress.attempts, 4);
}

#[tokio::test]
async fn submit_code_sudden_death_on_final_level() {
    let rt = started_runtime().await;
    set_level(&rt, &alpha(), 10).await;
    let bad = scrambled(&rt, 10, 0);
    rt.submit_code(&alpha(), &bad, None).await.unwrap();
    rt.submit_code(&alpha(), &bad, None).await.unwrap();
    assert_eq!(rt.team(&alpha()).await.unwrap().progress.score, 1000);

    // Third call is refused even with the right answer.
    let good = canonical(&rt, 10, 0);
    let err = rt.submit_code(&alpha(), &good, None).await.unwrap_err();
    assert!(matches!(err, Error::AttemptsExhausted { level: 10, .. }));
    let record = rt.team(&alpha()).await.unwrap();
    assert_eq!(record.progress.score, 1000);
    assert_eq!(record.progress.attempts, 2);
}

#[tokio::test]
async fn submit_code_requires_started_game() {
    let store = MemoryStore::with_records([TeamRecord::new("alpha", 0, 0)]);
    let rt = runtime_with(Arc::new(store)).await;
    let sub = canonical(&rt, 1, 0);
    let err = rt.submit_code(&alpha(), &sub, None).await.unwrap_err();
    assert!(matches!(err, Error::GameNotActive));
    assert_eq!(rt.team(&alpha()).await.unwrap().progress.score, 0);
}

#[tokio::test]
async fn submit_code_rejected_for_locked_team() {
    let rt = started_runtime().await;
    for _ in 0..3 {
        rt.report_violation(&alpha()).await.unwrap();
    }
    let sub = canonical(&rt, 1, 0);
    let err = rt.submit_code(&alpha(), &sub, None).await.unwrap_err();
    assert!(matches!(err, Error::TeamLocked(_)));
    assert!(matches!(rt.game_data(&alpha()).await.unwrap(), GameView::Locked));
}

#[tokio::test]
async fn submit_code_after_last_level_is_complete() {
    let rt = started_runtime().await;
    set_level(&rt, &alpha(), 11).await;
    let before = rt.team(&alpha()).await.unwrap();
    let result = rt
        .submit_code(&alpha(), &Submission::default(), None)
        .await
        .unwrap();
    assert!(matches!(result, CodeResult::Complete));
    assert_eq!(rt.team(&alpha()).await.unwrap(), before);
}

#[tokio::test]
async fn submit_code_unknown_team() {
    let rt = started_runtime().await;
    let err = rt
        .submit_code(&TeamId::from("ghost"), &Submission::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TeamNotFound(_)));
}

// ===========================================================================
// Terminal and skip
// ===========================================================================

#[tokio::test]
async fn terminal_success_and_failure_both_advance() {
    let rt = started_runtime().await;
    match rt.submit_terminal(&alpha(), Some(1), "15").await.unwrap() {
        TerminalResult::Answered(out) => {
            assert!(out.correct);
            assert_eq!((out.score, out.next_level), (1200, 2));
        }
        other => panic!("unexpected {:?}", other),
    }
    match rt.submit_terminal(&alpha(), Some(2), "no idea").await.unwrap() {
        TerminalResult::Answered(out) => {
            assert!(!out.correct);
            assert_eq!((out.score, out.next_level), (1000, 3));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn terminal_stale_level_is_rejected_without_mutation() {
    let rt = started_runtime().await;
    rt.submit_terminal(&alpha(), Some(1), "15").await.unwrap();
    let before = rt.team(&alpha()).await.unwrap();
    let err = rt
        .submit_terminal(&alpha(), Some(1), "15")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleLevel { expected: 1, current: 2 }));
    assert_eq!(rt.team(&alpha()).await.unwrap(), before);
}

#[tokio::test]
async fn skip_terminal_advances_without_score() {
    let rt = started_runtime().await;
    match rt.skip_terminal(&alpha(), Some(1)).await.unwrap() {
        SkipResult::Skipped(out) => assert_eq!((out.score, out.next_level), (1000, 2)),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn skip_after_last_level_is_complete() {
    let rt = started_runtime().await;
    set_level(&rt, &alpha(), 11).await;
    assert!(matches!(
        rt.skip_terminal(&alpha(), None).await.unwrap(),
        SkipResult::Complete
    ));
    assert_eq!(rt.team(&alpha()).await.unwrap().progress.current_level, 11);
}

// ===========================================================================
// Concurrency
// ===========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_terminal_requests_advance_once() {
    let rt = Arc::new(started_runtime().await);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let rt = rt.clone();
        handles.push(tokio::spawn(async move {
            rt.submit_terminal(&alpha(), Some(1), "15").await
        }));
    }
    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
    let record = rt.team(&alpha()).await.unwrap();
    assert_eq!(record.progress.current_level, 2);
    assert_eq!(record.progress.score, 1200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_violations_apply_penalty_once() {
    let rt = Arc::new(started_runtime().await);
    let mut handles = Vec::new();
    for _ in 0..5 {
        let rt = rt.clone();
        handles.push(tokio::spawn(async move { rt.report_violation(&alpha()).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let record = rt.team(&alpha()).await.unwrap();
    assert_eq!(record.progress.violations, 5);
    assert_eq!(record.progress.score, 800);
    assert!(record.progress.locked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submission_queued_behind_game_reset_is_refused() {
    let store = Arc::new(FlakyStore::default());
    store
        .inner
        .commit(&TeamRecord::new("alpha", 0, 1000))
        .await
        .unwrap();
    let rt = Arc::new(runtime_with(store.clone()).await);
    rt.start_game().await;
    store.set_delay(Duration::from_millis(200));

    let reset = {
        let rt = rt.clone();
        tokio::spawn(async move { rt.reset_game().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let submitted = rt
        .submit_code(&alpha(), &canonical(&rt, 1, 0), None)
        .await;
    let flags = reset.await.unwrap().unwrap();

    assert!(!flags.started);
    assert!(matches!(submitted, Err(Error::GameNotActive)));
    let record = rt.team(&alpha()).await.unwrap();
    assert_eq!(record.progress.score, 1000);
    assert_eq!(record.progress.attempts, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_of_one_team_keep_the_first() {
    let store = Arc::new(FlakyStore::default());
    let rt = Arc::new(runtime_with(store.clone()).await);
    store.set_delay(Duration::from_millis(50));

    let mut handles = Vec::new();
    for variant in 0..2 {
        let rt = rt.clone();
        handles.push(tokio::spawn(async move {
            rt.register_team(TeamRecord::new("charlie", variant, 1000))
                .await
        }));
    }
    let mut registered = Vec::new();
    for (variant, handle) in handles.into_iter().enumerate() {
        match handle.await.unwrap() {
            Ok(()) => registered.push(variant as u32),
            Err(e) => assert!(matches!(e, Error::TeamExists(_))),
        }
    }
    assert_eq!(registered.len(), 1);
    let id = TeamId::from("charlie");
    assert_eq!(rt.team(&id).await.unwrap().progress.variant, registered[0]);
    assert_eq!(store.stored(&id).await.unwrap().progress.variant, registered[0]);
}

// ===========================================================================
// Persistence failures
// ===========================================================================

#[tokio::test]
async fn failed_commit_leaves_team_untouched() {
    let store = Arc::new(FlakyStore::default());
    store
        .inner
        .commit(&TeamRecord::new("alpha", 0, 1000))
        .await
        .unwrap();
    let rt = runtime_with(store.clone()).await;
    rt.start_game().await;

    store.set_failing(true);
    let err = rt.submit_terminal(&alpha(), None, "15").await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    let record = rt.team(&alpha()).await.unwrap();
    assert_eq!(record.progress.current_level, 1);
    assert_eq!(record.progress.score, 1000);

    store.set_failing(false);
    rt.submit_terminal(&alpha(), None, "15").await.unwrap();
    assert_eq!(store.stored(&alpha()).await.unwrap().progress.current_level, 2);
}

#[tokio::test]
async fn failed_game_reset_keeps_flags_and_teams() {
    let store = Arc::new(FlakyStore::default());
    store
        .inner
        .commit(&TeamRecord::new("alpha", 0, 40))
        .await
        .unwrap();
    let rt = runtime_with(store.clone()).await;
    rt.start_game().await;
    rt.skip_terminal(&alpha(), None).await.unwrap();

    store.set_failing(true);
    assert!(rt.reset_game().await.is_err());
    assert!(rt.flags().await.started);
    assert_eq!(rt.team(&alpha()).await.unwrap().progress.current_level, 2);

    store.set_failing(false);
    let flags = rt.reset_game().await.unwrap();
    assert!(!flags.started);
    assert!(flags.event_active);
    let record = rt.team(&alpha()).await.unwrap();
    assert_eq!(record.progress.current_level, 1);
    assert_eq!(record.progress.score, 1000);
}

// ===========================================================================
// Admin
// ===========================================================================

#[tokio::test]
async fn reset_team_unlocks_and_restores() {
    let rt = started_runtime().await;
    for _ in 0..3 {
        rt.report_violation(&alpha()).await.unwrap();
    }
    let record = rt.reset_team(&alpha(), true).await.unwrap();
    assert!(!record.progress.locked);
    assert_eq!(record.progress.violations, 0);
    assert_eq!(record.progress.score, 1000);
}

#[tokio::test]
async fn end_game_blocks_submissions() {
    let rt = started_runtime().await;
    rt.end_game().await;
    let err = rt.skip_terminal(&alpha(), None).await.unwrap_err();
    assert!(matches!(err, Error::EventClosed));
}

#[tokio::test]
async fn open_event_resumes_without_reset() {
    let rt = started_runtime().await;
    rt.skip_terminal(&alpha(), None).await.unwrap();
    rt.end_game().await;

    let flags = rt.open_event().await;
    assert!(flags.event_active);
    assert!(flags.started);
    assert!(rt.login("alpha").await.is_ok());
    match rt.skip_terminal(&alpha(), Some(2)).await.unwrap() {
        SkipResult::Skipped(out) => assert_eq!(out.next_level, 3),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn register_team_rejects_duplicates() {
    let rt = started_runtime().await;
    rt.register_team(TeamRecord::new("charlie", 0, 1000))
        .await
        .unwrap();
    assert_eq!(rt.team_count(), 3);
    let err = rt
        .register_team(TeamRecord::new("charlie", 0, 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TeamExists(_)));
}

#[tokio::test]
async fn leaderboard_ranks_teams() {
    let rt = started_runtime().await;
    rt.submit_code(&TeamId::from("bravo"), &canonical(&rt, 1, 1), None)
        .await
        .unwrap();
    let board = rt.leaderboard().await;
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].team_id.as_str(), "bravo");
    assert_eq!(board[0].score, 1500);
    assert_eq!(board[1].team_id.as_str(), "alpha");
}

// ===========================================================================
// JsonFileStore
// ===========================================================================

#[tokio::test]
async fn json_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teams.json");
    {
        let store = Arc::new(JsonFileStore::open(&path).await.unwrap());
        let rt = runtime_with(store).await;
        rt.register_team(TeamRecord::new("alpha", 0, 1000))
            .await
            .unwrap();
        rt.start_game().await;
        rt.submit_terminal(&alpha(), Some(1), "15").await.unwrap();
    }
    let reopened = JsonFileStore::open(&path).await.unwrap();
    let records = reopened.load_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].progress.current_level, 2);
    assert_eq!(records[0].progress.score, 1200);
    assert!(!dir.path().join("teams.json.tmp").exists());
}

#[tokio::test]
async fn json_store_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("none.json")).await.unwrap();
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn json_store_rejects_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teams.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(JsonFileStore::open(&path).await, Err(Error::Json(_))));
}
