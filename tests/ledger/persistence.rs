use std::{
    fs,
    path::{Path, PathBuf},
};

use social_credit::{
    credits::CreditOrchestrator,
    ledger::{
        CreditBook, CreditStore, JsonDocument, LedgerError, LedgerErrorKind, ViolationBook,
        error::persistence_error,
    },
    reconcile::ReconciliationEngine,
    types::{CommunityId, Credits, DEFAULT_CREDITS, Identity, MemberId, ViolationStats},
};
use uuid::Uuid;

fn work_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("social-credit-ledger-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp work dir should be created");
    dir
}

fn file_backed(dir: &Path) -> CreditOrchestrator {
    CreditOrchestrator::new(
        Box::new(
            CreditBook::open(JsonDocument::new(dir.join("social_credits.json")))
                .expect("credits store should open"),
        ),
        Box::new(
            ViolationBook::open(JsonDocument::new(dir.join("forbidden_word_stats.json")))
                .expect("violations store should open"),
        ),
        ReconciliationEngine::default(),
        DEFAULT_CREDITS,
    )
}

#[tokio::test]
async fn given_written_ledger_when_reopened_then_state_survives_restart() {
    let dir = work_dir();
    let member = Identity::new(10, 20);

    {
        let orchestrator = file_backed(&dir);
        orchestrator
            .apply_delta(member, -1_000)
            .await
            .expect("delta should persist");
        orchestrator
            .record_violation(member, 1_000)
            .await
            .expect("violation should persist");
    }

    let reopened = file_backed(&dir);
    assert_eq!(reopened.credits(member).await, 0);
    assert_eq!(
        reopened.violation_stats(member).await,
        ViolationStats {
            count: 1,
            total_penalty: 1_000
        }
    );

    let on_disk: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.join("social_credits.json")).expect("credits file exists"),
    )
    .expect("credits file is JSON");
    assert_eq!(on_disk, serde_json::json!({ "10": { "20": 0 } }));

    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn given_legacy_files_when_opened_then_scores_and_stats_are_read() {
    let dir = work_dir();
    fs::write(
        dir.join("social_credits.json"),
        r#"{"123": {"456": 750, "789": -2100}}"#,
    )
    .expect("credits file should be written");
    fs::write(
        dir.join("forbidden_word_stats.json"),
        r#"{"123": {"456": {"count": 2, "deducted_credits": 2000}}}"#,
    )
    .expect("stats file should be written");

    let orchestrator = file_backed(&dir);
    assert_eq!(orchestrator.credits(Identity::new(123, 456)).await, 750);
    assert_eq!(orchestrator.credits(Identity::new(123, 789)).await, -2_100);
    assert_eq!(
        orchestrator.violation_stats(Identity::new(123, 456)).await,
        ViolationStats {
            count: 2,
            total_penalty: 2_000
        }
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_corrupt_file_when_opened_then_starts_empty_and_keeps_backup() {
    let dir = work_dir();
    let path = dir.join("social_credits.json");
    fs::write(&path, "{ this is not json").expect("corrupt file should be written");

    let book = CreditBook::open(JsonDocument::new(&path)).expect("corrupt file is recovered");
    assert_eq!(book.credits(&Identity::new(1, 1)), None);
    assert!(!path.exists(), "corrupt file should be moved aside");
    assert_eq!(
        fs::read_to_string(dir.join("social_credits.json.corrupt")).expect("backup exists"),
        "{ this is not json"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_unreadable_document_when_opened_then_error_surfaces_and_file_is_kept() {
    let dir = work_dir();
    let path = dir.join("social_credits.json");
    fs::create_dir_all(&path).expect("directory in place of the document");

    let err = CreditBook::open(JsonDocument::new(&path))
        .expect_err("an unreadable document must not be discarded");
    assert_eq!(err.kind, LedgerErrorKind::Persistence);
    assert!(path.is_dir(), "unreadable document should stay in place");
    assert!(!dir.join("social_credits.json.corrupt").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_empty_file_when_loaded_then_treated_as_missing() {
    let dir = work_dir();
    let path = dir.join("social_credits.json");
    fs::write(&path, "  \n").expect("empty file should be written");

    let document = JsonDocument::new(&path);
    let loaded: Option<serde_json::Value> = document.load().expect("empty file is not an error");
    assert!(loaded.is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_unwritable_location_when_saving_then_error_and_previous_value_kept() {
    let dir = work_dir();
    let blocker = dir.join("blocker");
    let member = Identity::new(1, 1);

    let mut book = CreditBook::open(JsonDocument::new(blocker.join("social_credits.json")))
        .expect("missing file opens empty");
    fs::write(&blocker, "not a directory").expect("blocker file should be written");
    let err = book
        .set_credits(&member, 500)
        .expect_err("save under a regular file must fail");
    assert_eq!(err.kind, LedgerErrorKind::Persistence);
    assert_eq!(book.credits(&member), None);

    let _ = fs::remove_dir_all(&dir);
}

struct UnwritableCredits;

impl CreditStore for UnwritableCredits {
    fn credits(&self, _identity: &Identity) -> Option<Credits> {
        None
    }

    fn set_credits(&mut self, _identity: &Identity, _credits: Credits) -> Result<(), LedgerError> {
        Err(persistence_error("disk full"))
    }

    fn community_credits(&self, _community_id: CommunityId) -> Vec<(MemberId, Credits)> {
        Vec::new()
    }
}

#[tokio::test]
async fn given_failing_credit_store_when_violation_recorded_then_stats_still_persist() {
    let orchestrator = CreditOrchestrator::new(
        Box::new(UnwritableCredits),
        Box::new(ViolationBook::in_memory()),
        ReconciliationEngine::default(),
        DEFAULT_CREDITS,
    );
    let member = Identity::new(1, 1);

    let stats = orchestrator
        .record_violation(member, 1_000)
        .await
        .expect("violation store is healthy");
    let err = orchestrator
        .apply_delta(member, -1_000)
        .await
        .expect_err("credit store is failing");

    assert_eq!(err.kind, LedgerErrorKind::Persistence);
    assert_eq!(stats.count, 1);
    assert_eq!(orchestrator.violation_stats(member).await, stats);
    assert_eq!(orchestrator.credits(member).await, DEFAULT_CREDITS);
}
