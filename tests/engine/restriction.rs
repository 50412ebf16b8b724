use social_credit::restriction::{PLATFORM_MAX_RESTRICTION, RestrictionDirective, RestrictionPolicy};
use time::{Duration, OffsetDateTime};

fn now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_760_000_000).expect("valid timestamp")
}

#[test]
fn given_negative_scores_when_sizing_then_one_unit_per_full_thousand() {
    let policy = RestrictionPolicy::default();

    assert_eq!(policy.duration_for(0), None);
    assert_eq!(policy.duration_for(500), None);
    assert_eq!(policy.duration_for(-999), None);
    assert_eq!(policy.duration_for(-1_000), Some(Duration::minutes(10)));
    assert_eq!(policy.duration_for(-1_999), Some(Duration::minutes(10)));
    assert_eq!(policy.duration_for(-2_500), Some(Duration::minutes(20)));
    assert_eq!(policy.duration_for(-10_000_000), Some(PLATFORM_MAX_RESTRICTION));
}

#[test]
fn given_no_active_restriction_when_score_is_negative_then_apply() {
    let policy = RestrictionPolicy::default();

    let directive = policy.decide(-1_000, None, now());
    assert_eq!(
        directive,
        RestrictionDirective::Apply {
            until: now() + Duration::minutes(10),
            duration: Duration::minutes(10),
        }
    );

    let expired = now() - Duration::minutes(1);
    assert!(matches!(
        policy.decide(-1_000, Some(expired), now()),
        RestrictionDirective::Apply { .. }
    ));
}

#[test]
fn given_less_than_one_unit_in_deficit_when_deciding_then_nothing_happens() {
    let policy = RestrictionPolicy::default();
    assert_eq!(policy.decide(-999, None, now()), RestrictionDirective::None);
}

#[test]
fn given_active_restriction_when_candidate_is_shorter_then_it_is_kept() {
    let policy = RestrictionPolicy::default();
    let current = now() + Duration::hours(1);

    assert_eq!(
        policy.decide(-2_000, Some(current), now()),
        RestrictionDirective::None
    );
}

#[test]
fn given_active_restriction_when_candidate_is_longer_then_extend() {
    let policy = RestrictionPolicy::default();
    let current = now() + Duration::minutes(5);

    assert_eq!(
        policy.decide(-3_000, Some(current), now()),
        RestrictionDirective::Extend {
            until: now() + Duration::minutes(30),
            duration: Duration::minutes(30),
        }
    );
}

#[test]
fn given_non_negative_score_when_restriction_active_then_lift_regardless_of_origin() {
    let policy = RestrictionPolicy::default();
    let imposed_elsewhere = now() + Duration::days(3);

    assert_eq!(
        policy.decide(0, Some(imposed_elsewhere), now()),
        RestrictionDirective::Lift
    );
    assert_eq!(policy.decide(0, None, now()), RestrictionDirective::None);
    assert_eq!(
        policy.decide(10, Some(now() - Duration::seconds(1)), now()),
        RestrictionDirective::None
    );
}

#[test]
fn given_custom_policy_when_sizing_then_settings_apply_and_ceiling_holds() {
    let policy = RestrictionPolicy::new(500, Duration::minutes(1), Duration::hours(1));

    assert_eq!(policy.duration_for(-1_000), Some(Duration::minutes(2)));
    assert_eq!(policy.duration_for(-1_000_000), Some(Duration::hours(1)));
    assert_eq!(policy.max_duration(), Duration::hours(1));
}
