//! Subscription records - reading, creating and updating a customer's subscription.
//!
//! Rows are validated into [`Subscription`] on the way out of the database.
//! Unknown plan names are kept as text but schedule as "no plan"; malformed
//! override slots read as empty and are overwritten by the next slot write.

use crate::{
    core::{
        overrides::{Override, OverrideSlots, SLOT_COUNT},
        plan::{PlanDay, PlanType, SubscriptionStatus},
    },
    entities::{Subscription as SubscriptionEntity, subscription},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{debug, instrument};

/// A customer's subscription as the scheduling core sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Opaque user identifier
    pub user_id: String,
    /// Plan name exactly as stored
    pub plan_name: String,
    /// Catalogue plan, `None` when the name is not recognised
    pub plan: Option<PlanType>,
    /// Cadence anchor, Unix seconds
    pub plan_start: Option<i64>,
    /// Monday or Wednesday preference
    pub plan_day: Option<PlanDay>,
    /// Billing status
    pub status: SubscriptionStatus,
    /// The six override slots
    pub overrides: OverrideSlots,
}

impl Subscription {
    /// Whether upcoming visits can be computed at all.
    #[must_use]
    pub fn is_schedulable(&self) -> bool {
        self.plan.is_some() && !self.status.suppresses_schedule()
    }
}

impl From<subscription::Model> for Subscription {
    fn from(model: subscription::Model) -> Self {
        let overrides = OverrideSlots::from_json_columns(model.override_columns());
        Self {
            plan: PlanType::parse(&model.plan),
            plan_day: model.plan_day.as_deref().and_then(PlanDay::parse),
            status: SubscriptionStatus::parse(&model.status),
            plan_start: model.plan_start,
            plan_name: model.plan,
            user_id: model.user_id,
            overrides,
        }
    }
}

/// Creates a subscription with six empty override slots.
pub async fn create_subscription(
    db: &DatabaseConnection,
    user_id: &str,
    plan_name: &str,
    plan_start: Option<i64>,
    plan_day: Option<PlanDay>,
    status: &SubscriptionStatus,
) -> Result<Subscription> {
    if user_id.trim().is_empty() {
        return Err(Error::Config {
            message: "User id cannot be empty".to_string(),
        });
    }

    let [one, two, three, four, five, six] = OverrideSlots::empty().to_json_columns()?;
    let model = subscription::ActiveModel {
        user_id: Set(user_id.to_string()),
        plan: Set(plan_name.to_string()),
        plan_start: Set(plan_start),
        plan_day: Set(plan_day.map(|day| day.as_str().to_string())),
        status: Set(status.as_str().to_string()),
        date_override_one: Set(one),
        date_override_two: Set(two),
        date_override_three: Set(three),
        date_override_four: Set(four),
        date_override_five: Set(five),
        date_override_six: Set(six),
        updated_at: Set(Utc::now().naive_utc()),
    };

    let inserted = model.insert(db).await?;
    Ok(Subscription::from(inserted))
}

/// Fetches a subscription, returning `None` if the user has none.
pub async fn get_subscription<C>(db: &C, user_id: &str) -> Result<Option<Subscription>>
where
    C: ConnectionTrait,
{
    let model = SubscriptionEntity::find_by_id(user_id.to_string())
        .one(db)
        .await?;
    Ok(model.map(Subscription::from))
}

/// Fetches a subscription that must exist.
pub async fn load_subscription<C>(db: &C, user_id: &str) -> Result<Subscription>
where
    C: ConnectionTrait,
{
    get_subscription(db, user_id)
        .await?
        .ok_or_else(|| Error::SubscriptionNotFound {
            user_id: user_id.to_string(),
        })
}

/// Writes all six override slots in a single UPDATE.
///
/// Slots are never patched individually, so a reader sees either the old six
/// or the new six.
#[instrument(skip(db, slots))]
pub async fn replace_override_slots<C>(
    db: &C,
    user_id: &str,
    slots: &OverrideSlots,
) -> Result<Subscription>
where
    C: ConnectionTrait,
{
    let existing = SubscriptionEntity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::SubscriptionNotFound {
            user_id: user_id.to_string(),
        })?;

    let [one, two, three, four, five, six] = slots.to_json_columns()?;
    let mut active_model: subscription::ActiveModel = existing.into();
    active_model.date_override_one = Set(one);
    active_model.date_override_two = Set(two);
    active_model.date_override_three = Set(three);
    active_model.date_override_four = Set(four);
    active_model.date_override_five = Set(five);
    active_model.date_override_six = Set(six);
    active_model.updated_at = Set(Utc::now().naive_utc());

    let updated = active_model.update(db).await?;
    debug!(active = slots.active_count(), "Override slots replaced");
    Ok(Subscription::from(updated))
}

/// Puts `value` into one slot, rewriting all six slots together.
///
/// This is the write path used by the scheduling workflow when a customer asks
/// to move or cancel a single visit.
pub async fn set_override(
    db: &DatabaseConnection,
    user_id: &str,
    slot: usize,
    value: Override,
) -> Result<Subscription> {
    if slot >= SLOT_COUNT {
        return Err(Error::InvalidOverride {
            slot,
            message: format!("slot index must be below {SLOT_COUNT}"),
        });
    }
    value.validate(slot)?;

    let txn = db.begin().await?;
    let current = load_subscription(&txn, user_id).await?;
    let mut slots = current.overrides;
    slots[slot] = value;
    let updated = replace_override_slots(&txn, user_id, &slots).await?;
    txn.commit().await?;

    Ok(updated)
}

/// Records a new billing status, as delivered by the payment provider.
pub async fn update_status(
    db: &DatabaseConnection,
    user_id: &str,
    status: &SubscriptionStatus,
) -> Result<Subscription> {
    let existing = SubscriptionEntity::find_by_id(user_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::SubscriptionNotFound {
            user_id: user_id.to_string(),
        })?;

    let mut active_model: subscription::ActiveModel = existing.into();
    active_model.status = Set(status.as_str().to_string());
    active_model.updated_at = Set(Utc::now().naive_utc());
    let updated = active_model.update(db).await?;
    Ok(Subscription::from(updated))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_subscription_starts_with_empty_slots() -> Result<()> {
        let db = setup_test_db().await?;

        let created = create_test_subscription(&db, "user-1").await?;
        assert_eq!(created.plan, Some(PlanType::OnceAWeekPremium));
        assert_eq!(created.plan_day, Some(PlanDay::Wed));
        assert_eq!(created.overrides, OverrideSlots::empty());

        let fetched = get_subscription(&db, "user-1").await?.unwrap();
        assert_eq!(fetched, created);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_subscription_rejects_empty_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_subscription(
            &db,
            "  ",
            "Once a week",
            Some(1),
            None,
            &SubscriptionStatus::Active,
        )
        .await;
        assert!(matches!(result, Err(Error::Config { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_plan_is_kept_but_unschedulable() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_subscription(
            &db,
            "user-2",
            "Daily Deluxe",
            Some(1_700_000_000),
            None,
            &SubscriptionStatus::Active,
        )
        .await?;
        assert_eq!(created.plan_name, "Daily Deluxe");
        assert_eq!(created.plan, None);
        assert!(!created.is_schedulable());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_subscription() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_subscription(&db, "nobody").await?.is_none());
        let result = load_subscription(&db, "nobody").await;
        assert!(matches!(result, Err(Error::SubscriptionNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_override_writes_only_target_slot() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-3").await?;

        let updated = set_override(&db, "user-3", 2, Override::cancellation(1_710_000_000)).await?;
        assert!(updated.overrides[2].cancel);
        assert_eq!(updated.overrides.active_count(), 1);

        let fetched = load_subscription(&db, "user-3").await?;
        assert_eq!(fetched.overrides, updated.overrides);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_override_rejects_bad_slot() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-4").await?;

        let result = set_override(&db, "user-4", SLOT_COUNT, Override::cancellation(1)).await;
        assert!(matches!(result, Err(Error::InvalidOverride { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_override_slots_replaces_all_six() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-5").await?;
        set_override(&db, "user-5", 0, Override::cancellation(1_710_000_000)).await?;

        let mut slots = OverrideSlots::empty();
        slots[5] = Override::reschedule(1_710_500_000, 1_710_400_000);
        let updated = replace_override_slots(&db, "user-5", &slots).await?;

        assert_eq!(updated.overrides, slots);
        assert!(!updated.overrides[0].is_active());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_status() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-6").await?;

        let updated = update_status(&db, "user-6", &SubscriptionStatus::PastDue).await?;
        assert_eq!(updated.status, SubscriptionStatus::PastDue);

        let updated = update_status(&db, "user-6", &SubscriptionStatus::Planning).await?;
        assert!(!updated.is_schedulable());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_slot_reads_as_empty() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_subscription(&db, "user-7").await?;
        set_override(&db, "user-7", 0, Override::cancellation(1_709_700_000)).await?;

        let existing = SubscriptionEntity::find_by_id("user-7".to_string())
            .one(&db)
            .await?
            .unwrap();
        let mut active_model: subscription::ActiveModel = existing.into();
        active_model.date_override_four = Set(r#"[{"override":7}]"#.to_string());
        active_model.update(&db).await?;

        let loaded = load_subscription(&db, "user-7").await?;
        assert!(loaded.overrides[0].cancel);
        assert_eq!(loaded.overrides[3], Override::cleared());
        assert!(loaded.is_schedulable());

        // Strict validation still guards writes
        let result = set_override(
            &db,
            "user-7",
            3,
            Override {
                active: true,
                ..Override::cleared()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidOverride { slot: 3, .. })));
        Ok(())
    }
}
