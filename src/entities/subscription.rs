//! Subscription entity - one service subscription per customer.
//!
//! Override slots are stored as JSON documents, one column per slot, and are
//! validated into domain types by `core::overrides` when read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Opaque user identifier from the identity provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Plan name as reported by the billing provider
    pub plan: String,
    /// Cadence anchor, Unix seconds
    pub plan_start: Option<i64>,
    /// `"mon"` or `"wed"` for plans that can run on either day
    pub plan_day: Option<String>,
    /// Billing status (e.g. `"planning"`, `"trialing"`, `"past_due"`)
    pub status: String,
    /// Override for the 1st upcoming visit
    #[sea_orm(column_type = "Text")]
    pub date_override_one: String,
    /// Override for the 2nd upcoming visit
    #[sea_orm(column_type = "Text")]
    pub date_override_two: String,
    /// Override for the 3rd upcoming visit
    #[sea_orm(column_type = "Text")]
    pub date_override_three: String,
    /// Override for the 4th upcoming visit
    #[sea_orm(column_type = "Text")]
    pub date_override_four: String,
    /// Override for the 5th upcoming visit
    #[sea_orm(column_type = "Text")]
    pub date_override_five: String,
    /// Override for the 6th upcoming visit
    #[sea_orm(column_type = "Text")]
    pub date_override_six: String,
    /// When this record was last written
    pub updated_at: DateTime,
}

impl Model {
    /// The six override slot documents in slot order.
    #[must_use]
    pub fn override_columns(&self) -> [&str; 6] {
        [
            self.date_override_one.as_str(),
            self.date_override_two.as_str(),
            self.date_override_three.as_str(),
            self.date_override_four.as_str(),
            self.date_override_five.as_str(),
            self.date_override_six.as_str(),
        ]
    }
}

/// `Subscription` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
