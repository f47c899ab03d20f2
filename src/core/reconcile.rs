//! Override expiry and rotation.
//!
//! Runs whenever a subscription is loaded or observed. Active overrides whose
//! visit has passed are cleared, and the still-valid overrides above the
//! lowest cleared slot slide down into the free slots so the upcoming list
//! stays dense and in order. The pass is idempotent: a second run at the same
//! instant changes nothing.
//!
//! When anything changed the six slots are written back in one replace. If
//! that write fails the caller keeps its previous state and tries again on the
//! next trigger.

use crate::{
    core::{
        occurrence::next_six_occurrences,
        overrides::{Override, OverrideSlots, SLOT_COUNT},
        store::SubscriptionStore,
        subscription::Subscription,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, TimeZone};
use tracing::{debug, info, instrument, warn};

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Whether any slot differs from the input
    pub changed: bool,
    /// The six slots after the pass
    pub updated_overrides: OverrideSlots,
    /// Slots whose override expired and was cleared
    pub retired: Vec<usize>,
    /// `(from, to)` moves of still-valid overrides
    pub shifted: Vec<(usize, usize)>,
}

/// Instant (ms) after which the override in `slot` is stale.
///
/// The stored original date wins; otherwise the override's own date;
/// otherwise the slot's generated visit date.
fn expiry_millis<Tz: TimeZone>(
    value: &Override,
    slot: usize,
    generated: &[DateTime<Tz>],
) -> Option<i64> {
    value
        .original_date
        .or(value.date)
        .map(|seconds| seconds.saturating_mul(1000))
        .or_else(|| generated.get(slot).map(DateTime::timestamp_millis))
}

/// Computes the expiry/rotation pass for `subscription` at `now` without side effects.
#[must_use]
pub fn reconcile_overrides<Tz: TimeZone>(
    now: &DateTime<Tz>,
    subscription: &Subscription,
) -> ReconcileOutcome {
    let generated = next_six_occurrences(
        subscription.plan,
        subscription.plan_day,
        subscription.plan_start,
        now,
    );
    let now_ms = now.timestamp_millis();
    let mut slots = subscription.overrides;

    let mut retired = Vec::new();
    for index in (0..SLOT_COUNT).rev() {
        let slot = &slots[index];
        if !slot.is_active() {
            continue;
        }
        if expiry_millis(slot, index, &generated).is_some_and(|expiry| now_ms > expiry) {
            debug!(slot = index, "Retiring expired override");
            slots[index] = Override::cleared();
            retired.push(index);
        }
    }

    let mut shifted = Vec::new();
    if let Some(&lowest) = retired.iter().min() {
        for index in lowest + 1..SLOT_COUNT {
            if !slots[index].is_active() {
                continue;
            }
            if let Some(target) = (lowest..index).find(|&free| !slots[free].is_active()) {
                debug!(from = index, to = target, "Shifting override into earlier slot");
                slots[target] = slots[index];
                slots[index] = Override::cleared();
                shifted.push((index, target));
            }
        }
    }

    ReconcileOutcome {
        changed: slots != subscription.overrides,
        updated_overrides: slots,
        retired,
        shifted,
    }
}

/// A reconciliation that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The record as stored after the pass
    pub subscription: Subscription,
    /// What the pass did
    pub outcome: ReconcileOutcome,
}

/// Loads the latest record, reconciles it at `now` and writes the six slots
/// back in one replace when anything changed.
///
/// A failed write is logged and returned; nothing is written partially.
pub async fn reconcile_and_persist<S, Tz>(
    store: &S,
    user_id: &str,
    now: &DateTime<Tz>,
) -> Result<Reconciled>
where
    S: SubscriptionStore,
    Tz: TimeZone,
{
    let latest = store.load(user_id).await?;
    persist_reconciled(store, latest, now).await
}

/// Reconciles an already loaded record and writes the result when it changed.
#[instrument(skip_all, fields(user_id = %latest.user_id))]
pub async fn persist_reconciled<S, Tz>(
    store: &S,
    latest: Subscription,
    now: &DateTime<Tz>,
) -> Result<Reconciled>
where
    S: SubscriptionStore,
    Tz: TimeZone,
{
    let outcome = reconcile_overrides(now, &latest);
    if !outcome.changed {
        return Ok(Reconciled {
            subscription: latest,
            outcome,
        });
    }

    let user_id = latest.user_id.as_str();
    let subscription = store
        .replace_override_slots(user_id, &outcome.updated_overrides)
        .await
        .inspect_err(|e| warn!("Failed to persist reconciled overrides for {user_id}: {e}"))
        .map_err(|e| match e {
            Error::Database(db_err) => Error::Persistence {
                message: db_err.to_string(),
            },
            other => other,
        })?;

    info!(
        retired = outcome.retired.len(),
        shifted = outcome.shifted.len(),
        "Override slots reconciled"
    );
    Ok(Reconciled {
        subscription,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            overrides::IconSet,
            plan::{PlanDay, SubscriptionStatus},
            store::DbSubscriptionStore,
        },
        test_utils::{create_test_subscription, setup_test_db, subscription_fixture, utc_day},
    };
    use chrono::{Duration, Utc};

    fn fixture() -> Subscription {
        subscription_fixture("Once a week Premium", Some(PlanDay::Wed))
    }

    fn stale_reschedule(now: &DateTime<Utc>) -> Override {
        Override::reschedule(
            (*now - Duration::days(1)).timestamp(),
            (*now - Duration::days(2)).timestamp(),
        )
    }

    fn pending_reschedule(now: &DateTime<Utc>, days_ahead: i64) -> Override {
        Override::reschedule(
            (*now + Duration::days(days_ahead + 1)).timestamp(),
            (*now + Duration::days(days_ahead)).timestamp(),
        )
    }

    #[test]
    fn test_nothing_active_is_unchanged() {
        let now = utc_day(2024, 3, 4);
        let outcome = reconcile_overrides(&now, &fixture());
        assert!(!outcome.changed);
        assert!(outcome.retired.is_empty());
        assert_eq!(outcome.updated_overrides, OverrideSlots::empty());
    }

    #[test]
    fn test_expired_first_slot_is_cleared() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[0] = stale_reschedule(&now);

        let outcome = reconcile_overrides(&now, &subscription);
        assert!(outcome.changed);
        assert_eq!(outcome.retired, vec![0]);
        assert_eq!(outcome.updated_overrides, OverrideSlots::empty());
    }

    #[test]
    fn test_valid_overrides_shift_into_retired_slots() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        let second = pending_reschedule(&now, 9);
        let fourth = Override::cancellation((now + Duration::days(23)).timestamp());
        subscription.overrides[0] = stale_reschedule(&now);
        subscription.overrides[1] = second;
        subscription.overrides[3] = fourth;

        let outcome = reconcile_overrides(&now, &subscription);
        assert!(outcome.changed);
        assert_eq!(outcome.retired, vec![0]);
        assert_eq!(outcome.shifted, vec![(1, 0), (3, 1)]);

        let slots = outcome.updated_overrides;
        assert_eq!(slots[0], second);
        assert_eq!(slots[1], fourth);
        assert_eq!(slots[0].original_date, second.original_date);
        for index in 2..SLOT_COUNT {
            assert_eq!(slots[index], Override::cleared());
        }
    }

    #[test]
    fn test_overrides_below_lowest_retired_slot_stay_put() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        let first = pending_reschedule(&now, 2);
        let last = pending_reschedule(&now, 37);
        subscription.overrides[0] = first;
        subscription.overrides[4] = stale_reschedule(&now);
        subscription.overrides[5] = last;

        let outcome = reconcile_overrides(&now, &subscription);
        assert_eq!(outcome.retired, vec![4]);
        assert_eq!(outcome.shifted, vec![(5, 4)]);
        assert_eq!(outcome.updated_overrides[0], first);
        assert_eq!(outcome.updated_overrides[4], last);
        assert!(!outcome.updated_overrides[5].is_active());
    }

    #[test]
    fn test_multiple_expired_slots_are_all_retired() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[1] = stale_reschedule(&now);
        subscription.overrides[2] = stale_reschedule(&now);
        subscription.overrides[5] = stale_reschedule(&now);

        let outcome = reconcile_overrides(&now, &subscription);
        assert_eq!(outcome.retired, vec![5, 2, 1]);
        assert!(outcome.shifted.is_empty());
        assert_eq!(outcome.updated_overrides.active_count(), 0);
    }

    #[test]
    fn test_gaps_without_expiry_are_left_alone() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[3] = pending_reschedule(&now, 20);

        let outcome = reconcile_overrides(&now, &subscription);
        assert!(!outcome.changed);
        assert!(outcome.updated_overrides[3].is_active());
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[0] = stale_reschedule(&now);
        subscription.overrides[2] = pending_reschedule(&now, 16);
        subscription.overrides[3] = stale_reschedule(&now);
        subscription.overrides[5] = pending_reschedule(&now, 37);

        let first = reconcile_overrides(&now, &subscription);
        assert!(first.changed);

        subscription.overrides = first.updated_overrides;
        let second = reconcile_overrides(&now, &subscription);
        assert!(!second.changed);
        assert_eq!(second.updated_overrides, first.updated_overrides);
    }

    #[test]
    fn test_expiry_without_original_date_uses_override_date() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[0] = Override {
            active: true,
            date: Some((now - Duration::days(3)).timestamp()),
            ..Override::cleared()
        };
        subscription.overrides[1] = Override {
            active: true,
            date: Some((now + Duration::days(10)).timestamp()),
            ..Override::cleared()
        };

        let outcome = reconcile_overrides(&now, &subscription);
        assert_eq!(outcome.retired, vec![0]);
        assert_eq!(outcome.shifted, vec![(1, 0)]);

        // Still retired much later, and the pass stays settled
        let later = now + Duration::days(365);
        subscription.overrides = outcome.updated_overrides;
        subscription.overrides[1] = Override {
            active: true,
            date: Some((now - Duration::days(3)).timestamp()),
            ..Override::cleared()
        };
        let outcome = reconcile_overrides(&later, &subscription);
        assert_eq!(outcome.retired, vec![1, 0]);
        assert_eq!(outcome.updated_overrides.active_count(), 0);
    }

    #[test]
    fn test_icon_only_override_waits_for_its_visit() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[0] = Override {
            active: true,
            ..Override::cleared()
        }
        .with_icons(IconSet {
            doo: true,
            ..IconSet::EMPTY
        });

        // No dates at all: the slot's generated visit is still ahead
        assert!(!reconcile_overrides(&now, &subscription).changed);
    }

    #[test]
    fn test_far_future_timestamps_do_not_overflow() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = fixture();
        subscription.overrides[0] = Override::reschedule(1_710_000_000, i64::MAX / 100);
        subscription.overrides[1] = Override::cancellation(i64::MAX);
        subscription.overrides[2] = Override::reschedule(i64::MIN, i64::MIN);

        let outcome = reconcile_overrides(&now, &subscription);
        assert_eq!(outcome.retired, vec![2]);
        assert!(outcome.updated_overrides[0].is_active());
        assert!(outcome.updated_overrides[1].is_active());
    }

    #[tokio::test]
    async fn test_reconcile_and_persist_writes_once() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-1").await?;
        let store = DbSubscriptionStore::new(db);
        let now = utc_day(2024, 3, 4);

        store.set_override("user-1", 0, stale_reschedule(&now)).await?;
        store
            .set_override("user-1", 1, pending_reschedule(&now, 9))
            .await?;

        let mut changes = store.subscribe();
        let reconciled = reconcile_and_persist(&store, "user-1", &now).await?;
        assert!(reconciled.outcome.changed);
        assert_eq!(reconciled.subscription.overrides.active_count(), 1);
        assert!(reconciled.subscription.overrides[0].is_active());
        assert!(changes.try_recv().is_ok());

        let stored = store.load("user-1").await?;
        assert_eq!(stored.overrides, reconciled.outcome.updated_overrides);

        let again = reconcile_and_persist(&store, "user-1", &now).await?;
        assert!(!again.outcome.changed);
        assert!(changes.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_applies_to_planning_subscriptions_too() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-2").await?;
        let store = DbSubscriptionStore::new(db);
        let now = utc_day(2024, 3, 4);
        store.set_override("user-2", 2, stale_reschedule(&now)).await?;
        store
            .update_status("user-2", &SubscriptionStatus::Planning)
            .await?;

        let reconciled = reconcile_and_persist(&store, "user-2", &now).await?;
        assert_eq!(reconciled.outcome.retired, vec![2]);
        Ok(())
    }
}
