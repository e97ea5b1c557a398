// SPDX-FileCopyrightText: 2026 Regroup Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end engine tests: real SQLite storage and vault, scripted
//! provider doubles for the join and refresh APIs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regroup_core::types::{JoinOutcome, OutcomeCounts, Principal, RunStatus, TokenGrant};
use regroup_core::{JoinApi, ProgressSink, RefreshApi, RefreshApiError, RegroupError};
use regroup_core::types::ItemOutcome;
use regroup_core::CandidateProvider;
use regroup_engine::{EngineConfig, MigrationEngine, RetryPolicy, RunCoordinator, TokenManager};
use regroup_storage::{Database, SqliteCandidates, SqlitePrincipalStore, queries};
use regroup_vault::CredentialCipher;
use secrecy::{ExposeSecret, SecretString};
use tempfile::tempdir;

/// Join API double: a per-principal script of outcomes, consumed in order
/// (the last entry repeats). Records every call with the token it saw.
struct ScriptedJoin {
    target_exists: bool,
    script: Mutex<HashMap<String, Vec<JoinOutcome>>>,
    joins: Mutex<Vec<(String, String)>>,
}

impl ScriptedJoin {
    fn new(target_exists: bool) -> Self {
        Self {
            target_exists,
            script: Mutex::new(HashMap::new()),
            joins: Mutex::new(Vec::new()),
        }
    }

    fn expect(&self, principal_id: &str, outcomes: Vec<JoinOutcome>) {
        self.script
            .lock()
            .unwrap()
            .insert(principal_id.to_string(), outcomes);
    }

    fn joined_ids(&self) -> Vec<String> {
        self.joins
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl JoinApi for ScriptedJoin {
    async fn probe_target(&self, _target_id: &str) -> Result<bool, RegroupError> {
        Ok(self.target_exists)
    }

    async fn join(
        &self,
        _target_id: &str,
        principal_id: &str,
        access_token: &SecretString,
    ) -> Result<JoinOutcome, RegroupError> {
        self.joins.lock().unwrap().push((
            principal_id.to_string(),
            access_token.expose_secret().to_string(),
        ));
        let mut script = self.script.lock().unwrap();
        let queue = script
            .get_mut(principal_id)
            .unwrap_or_else(|| panic!("unscripted join for {principal_id}"));
        Ok(if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        })
    }
}

/// Refresh API double: one scripted response, consumed on first use.
struct ScriptedRefresh {
    response: Mutex<Option<Result<TokenGrant, RefreshApiError>>>,
}

impl ScriptedRefresh {
    fn none() -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(None),
        })
    }

    fn with(response: Result<TokenGrant, RefreshApiError>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(response)),
        })
    }
}

#[async_trait]
impl RefreshApi for ScriptedRefresh {
    async fn refresh(
        &self,
        _refresh_token: &SecretString,
    ) -> Result<TokenGrant, RefreshApiError> {
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(RefreshApiError::Transient(
                "unexpected refresh call".to_string(),
            )))
    }
}

/// Candidate source double returning a fixed list as-is, duplicates and all.
struct FixedCandidates {
    principals: Vec<Principal>,
}

#[async_trait]
impl CandidateProvider for FixedCandidates {
    async fn fetch_all(&self) -> Result<Vec<Principal>, RegroupError> {
        Ok(self.principals.clone())
    }
}

struct CountingSink {
    calls: Mutex<Vec<(u64, u64)>>,
}

#[async_trait]
impl ProgressSink for CountingSink {
    async fn on_progress(
        &self,
        processed: u64,
        total: u64,
        _counts: &OutcomeCounts,
    ) -> Result<(), RegroupError> {
        self.calls.lock().unwrap().push((processed, total));
        Ok(())
    }
}

struct Harness {
    db: Database,
    cipher: Arc<CredentialCipher>,
    _dir: tempfile::TempDir,
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        requests_per_second: 1000,
        progress_interval: 2,
        inter_item_delay: Duration::ZERO,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        },
    }
}

impl Harness {
    async fn new() -> Self {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("regroup.db").to_str().unwrap())
            .await
            .unwrap();
        let cipher = Arc::new(CredentialCipher::generate().unwrap());
        Self {
            db,
            cipher,
            _dir: dir,
        }
    }

    /// Insert a principal with encrypted tokens `access-{id}` / `refresh-{id}`
    /// expiring the given number of minutes from now.
    async fn add_principal(&self, id: &str, expires_in_mins: i64) {
        let p = Principal {
            id: id.to_string(),
            enc_access_token: Some(
                self.cipher
                    .encrypt_token(&SecretString::from(format!("access-{id}")))
                    .unwrap(),
            ),
            enc_refresh_token: Some(
                self.cipher
                    .encrypt_token(&SecretString::from(format!("refresh-{id}")))
                    .unwrap(),
            ),
            token_expires_at: Some(Utc::now() + chrono::Duration::minutes(expires_in_mins)),
            manually_authorized: false,
            revoked: false,
        };
        queries::principals::insert_principal(&self.db, &p)
            .await
            .unwrap();
    }

    async fn add_manual(&self, id: &str) {
        let p = Principal {
            id: id.to_string(),
            enc_access_token: None,
            enc_refresh_token: None,
            token_expires_at: None,
            manually_authorized: true,
            revoked: false,
        };
        queries::principals::insert_principal(&self.db, &p)
            .await
            .unwrap();
    }

    async fn add_revoked(&self, id: &str) {
        let p = Principal {
            id: id.to_string(),
            enc_access_token: None,
            enc_refresh_token: None,
            token_expires_at: None,
            manually_authorized: false,
            revoked: true,
        };
        queries::principals::insert_principal(&self.db, &p)
            .await
            .unwrap();
    }

    fn coordinator(&self) -> RunCoordinator {
        RunCoordinator::new(self.db.clone())
    }

    fn engine(&self, join: Arc<ScriptedJoin>, refresh: Arc<ScriptedRefresh>) -> MigrationEngine {
        let candidates = Arc::new(SqliteCandidates::new(self.db.clone()));
        self.engine_with_candidates(join, refresh, candidates)
    }

    fn engine_with_candidates(
        &self,
        join: Arc<ScriptedJoin>,
        refresh: Arc<ScriptedRefresh>,
        candidates: Arc<dyn CandidateProvider>,
    ) -> MigrationEngine {
        let tokens = TokenManager::new(
            self.cipher.clone(),
            refresh,
            Arc::new(SqlitePrincipalStore::new(self.db.clone())),
            Duration::from_secs(3600),
        );
        MigrationEngine::new(self.coordinator(), tokens, join, candidates, fast_config())
    }
}

#[tokio::test]
async fn mixed_outcomes_are_counted_and_run_finalized() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await; // 10h out, no refresh
    h.add_principal("u2", 600).await;
    h.add_manual("m1").await;
    h.add_revoked("r1").await;

    let join = Arc::new(ScriptedJoin::new(true));
    join.expect("u1", vec![JoinOutcome::Added]);
    join.expect("u2", vec![JoinOutcome::AlreadyIn]);

    let report = h
        .engine(join.clone(), ScriptedRefresh::none())
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    assert_eq!(report.counts.added, 1);
    assert_eq!(report.counts.already_in, 1);
    assert_eq!(report.counts.skipped_manual, 1);
    assert_eq!(report.counts.token_revoked, 1);
    assert_eq!(report.counts.total, 4);
    assert_eq!(report.counts.processed(), 4);
    assert!(report.failed.is_empty());

    // Only principals with credentials ever hit the API, each with their
    // own decrypted token.
    let joins = join.joins.lock().unwrap().clone();
    assert_eq!(
        joins,
        vec![
            ("u1".to_string(), "access-u1".to_string()),
            ("u2".to_string(), "access-u2".to_string()),
        ]
    );

    let run = h
        .coordinator()
        .get_run(&report.run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.counts, report.counts);
}

#[tokio::test]
async fn manual_member_is_skipped_even_when_also_revoked() {
    let h = Harness::new().await;
    let p = Principal {
        id: "m1".to_string(),
        enc_access_token: None,
        enc_refresh_token: None,
        token_expires_at: None,
        manually_authorized: true,
        revoked: true,
    };
    queries::principals::insert_principal(&h.db, &p)
        .await
        .unwrap();

    let join = Arc::new(ScriptedJoin::new(true));
    let report = h
        .engine(join.clone(), ScriptedRefresh::none())
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    assert_eq!(report.counts.skipped_manual, 1);
    assert_eq!(report.counts.token_revoked, 0);
    assert!(join.joined_ids().is_empty());
}

#[tokio::test]
async fn missing_target_aborts_before_any_run_state() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await;

    let join = Arc::new(ScriptedJoin::new(false));
    let err = h
        .engine(join, ScriptedRefresh::none())
        .run("no-such-guild", "alice", None)
        .await
        .unwrap_err();

    assert!(matches!(err, RegroupError::Precondition(_)));
    assert!(h.coordinator().list_runs(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn interrupted_run_resumes_and_skips_logged_principals() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await;
    h.add_principal("u2", 600).await;
    h.add_principal("u3", 600).await;

    // Simulate a crash: a running run with u1 already logged.
    let coord = h.coordinator();
    let (orig, _) = coord.resolve_run("guild-1", "alice", 3).await.unwrap();
    coord
        .append_item(&orig.id, "u1", ItemOutcome::Added, None)
        .await
        .unwrap();

    let join = Arc::new(ScriptedJoin::new(true));
    join.expect("u2", vec![JoinOutcome::Added]);
    join.expect("u3", vec![JoinOutcome::Added]);

    let report = h
        .engine(join.clone(), ScriptedRefresh::none())
        .run("guild-1", "bob", None)
        .await
        .unwrap();

    // Same run, prior outcome re-tallied, u1 never re-sent.
    assert_eq!(report.run_id, orig.id);
    assert_eq!(report.counts.added, 3);
    assert_eq!(report.counts.total, 3);
    assert_eq!(join.joined_ids(), vec!["u2", "u3"]);
}

#[tokio::test]
async fn error_outside_the_item_boundary_marks_the_run_failed_and_keeps_the_log() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await;

    // A candidate source yielding the same principal twice: the second
    // item-log append violates the at-most-once constraint, which is an
    // engine-level storage error rather than a per-item failure.
    let all = queries::principals::fetch_all(&h.db).await.unwrap();
    let candidates = Arc::new(FixedCandidates {
        principals: vec![all[0].clone(), all[0].clone()],
    });

    let join = Arc::new(ScriptedJoin::new(true));
    join.expect("u1", vec![JoinOutcome::Added]);

    let err = h
        .engine_with_candidates(join, ScriptedRefresh::none(), candidates)
        .run("guild-1", "alice", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RegroupError::Storage { .. }));

    // The run is marked failed with the error recorded.
    let runs = h.coordinator().list_runs(None).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error.is_some());

    // The item logged before the abort survives.
    let done = queries::runs::outcome_map(&h.db, &runs[0].id).await.unwrap();
    assert_eq!(done.get("u1"), Some(&ItemOutcome::Added));
}

#[tokio::test]
async fn rate_limit_response_is_retried_after_the_provider_wait() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await;

    let join = Arc::new(ScriptedJoin::new(true));
    join.expect(
        "u1",
        vec![
            JoinOutcome::RateLimited {
                retry_after: Duration::from_millis(5),
            },
            JoinOutcome::Added,
        ],
    );

    let report = h
        .engine(join.clone(), ScriptedRefresh::none())
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    assert_eq!(report.counts.added, 1);
    assert_eq!(report.counts.failed, 0);
    assert_eq!(join.joined_ids(), vec!["u1", "u1"]);
}

#[tokio::test]
async fn persistent_rate_limiting_exhausts_the_retry_budget() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await;

    let join = Arc::new(ScriptedJoin::new(true));
    join.expect(
        "u1",
        vec![JoinOutcome::RateLimited {
            retry_after: Duration::from_millis(1),
        }],
    );

    let report = h
        .engine(join.clone(), ScriptedRefresh::none())
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    // max_attempts is 3.
    assert_eq!(join.joined_ids().len(), 3);
    assert_eq!(report.counts.failed, 1);
    assert_eq!(
        report.failed,
        vec![(
            "u1".to_string(),
            Some("rate limited; retry budget exhausted".to_string())
        )]
    );
}

#[tokio::test]
async fn provider_rejection_is_terminal_and_reported_with_detail() {
    let h = Harness::new().await;
    h.add_principal("u1", 600).await;

    let join = Arc::new(ScriptedJoin::new(true));
    join.expect(
        "u1",
        vec![JoinOutcome::Failed {
            code: Some(30001),
            message: "maximum number of guilds".to_string(),
        }],
    );

    let report = h
        .engine(join.clone(), ScriptedRefresh::none())
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    // No retry for a provider rejection, and the run itself still completes.
    assert_eq!(join.joined_ids(), vec!["u1"]);
    assert_eq!(report.counts.failed, 1);
    assert_eq!(
        report.failed,
        vec![(
            "u1".to_string(),
            Some("provider error 30001: maximum number of guilds".to_string())
        )]
    );
    let run = h
        .coordinator()
        .get_run(&report.run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn expiring_token_is_refreshed_and_the_rotated_pair_persisted() {
    let h = Harness::new().await;
    h.add_principal("u1", 5).await; // inside the 1h refresh buffer

    let refresh = ScriptedRefresh::with(Ok(TokenGrant {
        access_token: "rotated-access".to_string(),
        refresh_token: "rotated-refresh".to_string(),
        expires_in: Duration::from_secs(604800),
    }));
    let join = Arc::new(ScriptedJoin::new(true));
    join.expect("u1", vec![JoinOutcome::Added]);

    let report = h
        .engine(join.clone(), refresh)
        .run("guild-1", "alice", None)
        .await
        .unwrap();
    assert_eq!(report.counts.added, 1);

    // The join used the rotated token, not the stale stored one.
    let joins = join.joins.lock().unwrap().clone();
    assert_eq!(joins[0].1, "rotated-access");

    // And the rotated pair is what's now on disk.
    let all = queries::principals::fetch_all(&h.db).await.unwrap();
    let stored_access = h
        .cipher
        .decrypt_token(all[0].enc_access_token.as_deref().unwrap())
        .unwrap();
    assert_eq!(stored_access.expose_secret(), "rotated-access");
}

#[tokio::test]
async fn revoked_grant_discovered_mid_run_is_persisted() {
    let h = Harness::new().await;
    h.add_principal("u1", 5).await;

    let refresh = ScriptedRefresh::with(Err(RefreshApiError::InvalidGrant));
    let join = Arc::new(ScriptedJoin::new(true));

    let report = h
        .engine(join.clone(), refresh)
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    assert_eq!(report.counts.token_revoked, 1);
    assert!(join.joined_ids().is_empty());

    let all = queries::principals::fetch_all(&h.db).await.unwrap();
    assert!(all[0].revoked);
    assert!(all[0].enc_access_token.is_none());
}

#[tokio::test]
async fn transient_refresh_failure_is_recorded_as_refresh_failed() {
    let h = Harness::new().await;
    h.add_principal("u1", 5).await;

    let refresh = ScriptedRefresh::with(Err(RefreshApiError::Transient("HTTP 503".to_string())));
    let join = Arc::new(ScriptedJoin::new(true));

    let report = h
        .engine(join.clone(), refresh)
        .run("guild-1", "alice", None)
        .await
        .unwrap();

    assert_eq!(report.counts.refresh_failed, 1);
    assert!(join.joined_ids().is_empty());

    // Credentials untouched; a future run can try again.
    let all = queries::principals::fetch_all(&h.db).await.unwrap();
    assert!(all[0].enc_access_token.is_some());
    assert!(!all[0].revoked);
}

#[tokio::test]
async fn progress_is_emitted_at_the_interval_and_on_the_last_item() {
    let h = Harness::new().await;
    for id in ["u1", "u2", "u3"] {
        h.add_principal(id, 600).await;
    }

    let join = Arc::new(ScriptedJoin::new(true));
    for id in ["u1", "u2", "u3"] {
        join.expect(id, vec![JoinOutcome::Added]);
    }
    let sink = CountingSink {
        calls: Mutex::new(Vec::new()),
    };

    h.engine(join, ScriptedRefresh::none())
        .run("guild-1", "alice", Some(&sink))
        .await
        .unwrap();

    // progress_interval is 2 and there are 3 candidates.
    assert_eq!(*sink.calls.lock().unwrap(), vec![(2, 3), (3, 3)]);
}
