//! Shared test utilities for `PickupBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test subscriptions with sensible defaults.

use crate::{
    core::{
        overrides::OverrideSlots,
        plan::{PlanDay, PlanType, SubscriptionStatus},
        subscription::{self, Subscription},
    },
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;

/// Plan start used by [`create_test_subscription`]: Wednesday 3 January 2024, 09:00 UTC.
pub const TEST_PLAN_START: i64 = 1_704_272_400;

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test subscription with sensible defaults.
///
/// # Defaults
/// * `plan`: "Once a week Premium"
/// * `plan_start`: [`TEST_PLAN_START`]
/// * `plan_day`: Wednesday
/// * `status`: active
pub async fn create_test_subscription(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Subscription> {
    subscription::create_subscription(
        db,
        user_id,
        "Once a week Premium",
        Some(TEST_PLAN_START),
        Some(PlanDay::Wed),
        &SubscriptionStatus::Active,
    )
    .await
}

/// Builds an unsaved subscription for pure scheduling tests.
#[must_use]
pub fn subscription_fixture(plan_name: &str, plan_day: Option<PlanDay>) -> Subscription {
    Subscription {
        user_id: "fixture".to_string(),
        plan_name: plan_name.to_string(),
        plan: PlanType::parse(plan_name),
        plan_start: Some(TEST_PLAN_START),
        plan_day,
        status: SubscriptionStatus::Active,
        overrides: OverrideSlots::empty(),
    }
}

/// A UTC instant at 08:00 on the given day.
#[allow(clippy::unwrap_used)]
#[must_use]
pub fn utc_day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 8, 0, 0).unwrap()
}
