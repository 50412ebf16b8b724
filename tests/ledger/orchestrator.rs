use social_credit::{
    credits::{CreditAdjustment, CreditOrchestrator},
    ledger::LedgerErrorKind,
    reconcile::MemberObservation,
    restriction::RestrictionDirective,
    types::{Identity, ViolationStats},
};
use time::{Duration, OffsetDateTime};

fn now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_760_000_000).expect("valid timestamp")
}

async fn record(orchestrator: &CreditOrchestrator, member_id: u64, penalty: u64) -> ViolationStats {
    orchestrator
        .record_violation(Identity::new(1, member_id), penalty)
        .await
        .expect("record should apply")
}

#[tokio::test]
async fn given_unseen_member_when_penalized_twice_then_scores_step_down_from_default() {
    let orchestrator = CreditOrchestrator::with_defaults();
    let member = Identity::new(1, 42);
    let observation = MemberObservation::default();

    let first = orchestrator
        .penalize(member, 1_000, &observation, now())
        .await
        .expect("first penalty should apply");
    assert_eq!(first.change.as_pair(), (1_000, 0));
    assert_eq!(first.rank.label, "Suspicious Citizen");
    assert_eq!(first.plan.restriction, RestrictionDirective::None);

    let second = orchestrator
        .penalize(member, 1_000, &observation, now())
        .await
        .expect("second penalty should apply");
    assert_eq!(second.change.as_pair(), (0, -1_000));
    assert_eq!(second.rank.label, "Social Outcast");
    assert_eq!(
        second.plan.restriction,
        RestrictionDirective::Apply {
            until: now() + Duration::minutes(10),
            duration: Duration::minutes(10),
        }
    );
}

#[tokio::test]
async fn given_same_member_in_two_communities_when_adjusted_then_scores_are_independent() {
    let orchestrator = CreditOrchestrator::with_defaults();
    let observation = MemberObservation::default();

    orchestrator
        .adjust(
            Identity::new(1, 7),
            CreditAdjustment::Give(500),
            &observation,
            now(),
        )
        .await
        .expect("give should apply");

    assert_eq!(orchestrator.credits(Identity::new(1, 7)).await, 1_500);
    assert_eq!(orchestrator.credits(Identity::new(2, 7)).await, 1_000);
}

#[tokio::test]
async fn given_out_of_range_amounts_when_adjusting_then_request_is_rejected_without_change() {
    let orchestrator = CreditOrchestrator::with_defaults();
    let member = Identity::new(1, 7);
    let observation = MemberObservation::default();

    for adjustment in [
        CreditAdjustment::Give(0),
        CreditAdjustment::Take(-5),
        CreditAdjustment::Take(1_000_001),
    ] {
        let err = orchestrator
            .adjust(member, adjustment, &observation, now())
            .await
            .expect_err("adjustment should be rejected");
        assert_eq!(err.kind, LedgerErrorKind::InvalidRequest);
    }
    assert_eq!(orchestrator.credits(member).await, 1_000);

    let outcome = orchestrator
        .adjust(member, CreditAdjustment::Set(-2_500), &observation, now())
        .await
        .expect("set accepts any value");
    assert_eq!(outcome.change.as_pair(), (1_000, -2_500));
    assert!(matches!(
        outcome.plan.restriction,
        RestrictionDirective::Apply { duration, .. } if duration == Duration::minutes(20)
    ));

    let outcome = orchestrator
        .adjust(member, CreditAdjustment::Take(1_000_000), &observation, now())
        .await
        .expect("upper bound is inclusive");
    assert_eq!(outcome.change.new_credits, -1_002_500);
}

#[tokio::test]
async fn given_score_at_limit_when_delta_overflows_then_arithmetic_error_and_value_kept() {
    let orchestrator = CreditOrchestrator::with_defaults();
    let member = Identity::new(1, 7);
    orchestrator
        .apply_absolute(member, i64::MAX)
        .await
        .expect("set should apply");

    let err = orchestrator
        .apply_delta(member, 1)
        .await
        .expect_err("overflow should be rejected");
    assert_eq!(err.kind, LedgerErrorKind::Arithmetic);
    assert_eq!(orchestrator.credits(member).await, i64::MAX);
}

#[tokio::test]
async fn given_scores_when_listing_leaderboard_then_sorted_descending_with_ties_by_member() {
    let orchestrator = CreditOrchestrator::with_defaults();
    for member_id in 1..=25u64 {
        let credits = (member_id as i64 % 5) * 1_000;
        orchestrator
            .apply_absolute(Identity::new(1, member_id), credits)
            .await
            .expect("set should apply");
    }
    orchestrator
        .apply_absolute(Identity::new(2, 99), 1_000_000)
        .await
        .expect("other community");

    let board = orchestrator.leaderboard(1, None).await;
    assert_eq!(board.len(), 10);
    assert_eq!(board[0].position, 1);
    assert_eq!(
        board
            .iter()
            .take(5)
            .map(|entry| (entry.member_id, entry.credits))
            .collect::<Vec<_>>(),
        vec![(4, 4_000), (9, 4_000), (14, 4_000), (19, 4_000), (24, 4_000)]
    );
    assert_eq!(board[0].rank.label, "Pride of the Party");
    assert!(board.iter().all(|entry| entry.member_id != 99));

    assert_eq!(orchestrator.leaderboard(1, Some(1)).await.len(), 3);
    assert_eq!(orchestrator.leaderboard(1, Some(500)).await.len(), 20);
    assert!(orchestrator.leaderboard(3, None).await.is_empty());
}

#[tokio::test]
async fn given_violations_when_listing_violators_then_ordered_by_count_then_total() {
    let orchestrator = CreditOrchestrator::with_defaults();
    record(&orchestrator, 1, 1_000).await;
    record(&orchestrator, 2, 1_000).await;
    record(&orchestrator, 2, 1_000).await;
    record(&orchestrator, 3, 500).await;
    record(&orchestrator, 3, 500).await;
    let stats = record(&orchestrator, 4, 2_000).await;
    assert_eq!(
        stats,
        ViolationStats {
            count: 1,
            total_penalty: 2_000
        }
    );

    let violators = orchestrator.violators(1, None).await;
    assert_eq!(
        violators
            .iter()
            .map(|entry| (entry.position, entry.member_id))
            .collect::<Vec<_>>(),
        vec![(1, 2), (2, 3), (3, 4), (4, 1)]
    );
}

#[tokio::test]
async fn given_member_history_when_reading_standing_then_credits_rank_and_stats_agree() {
    let orchestrator = CreditOrchestrator::with_defaults();
    let member = Identity::new(5, 6);

    let fresh = orchestrator.standing(member).await;
    assert_eq!(fresh.credits, 1_000);
    assert_eq!(fresh.rank.label, "Ordinary Citizen");
    assert_eq!(fresh.violations, ViolationStats::default());

    orchestrator
        .record_violation(member, 1_000)
        .await
        .expect("record should apply");
    orchestrator
        .apply_delta(member, 4_500)
        .await
        .expect("delta should apply");

    let standing = orchestrator.standing(member).await;
    assert_eq!(standing.credits, 5_500);
    assert_eq!(standing.rank.display(), "👑 Great Helmsman");
    assert_eq!(standing.violations.count, 1);
}
