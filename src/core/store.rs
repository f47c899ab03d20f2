//! Subscription store - the document-store seam the scheduling core talks to.
//!
//! The core only needs three things from storage: read the latest record for a
//! user, replace all six override slots at once, and be told when a record
//! changes. [`DbSubscriptionStore`] provides them on top of `SeaORM`, with a
//! broadcast channel standing in for the document store's change feed.

use crate::{
    core::{
        overrides::{Override, OverrideSlots},
        plan::SubscriptionStatus,
        subscription::{self, Subscription},
    },
    errors::Result,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::future::Future;
use tokio::sync::broadcast;
use tracing::{info, instrument, trace};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification that a user's subscription record was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    /// Whose record changed
    pub user_id: String,
}

/// Read, replace-slots and change-feed access to subscription records.
pub trait SubscriptionStore {
    /// Latest stored record for `user_id`.
    fn load(&self, user_id: &str) -> impl Future<Output = Result<Subscription>> + Send;

    /// Replaces all six override slots in one write and returns the stored record.
    fn replace_override_slots(
        &self,
        user_id: &str,
        slots: &OverrideSlots,
    ) -> impl Future<Output = Result<Subscription>> + Send;

    /// Change feed covering every record in the store.
    fn subscribe(&self) -> broadcast::Receiver<SubscriptionChange>;
}

/// `SeaORM`-backed store.
#[derive(Debug, Clone)]
pub struct DbSubscriptionStore {
    db: DatabaseConnection,
    changes: broadcast::Sender<SubscriptionChange>,
}

impl DbSubscriptionStore {
    /// Wraps a database connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { db, changes }
    }

    /// Underlying connection, for operations outside the core seam.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Writes one override slot on behalf of the scheduling workflow.
    pub async fn set_override(
        &self,
        user_id: &str,
        slot: usize,
        value: Override,
    ) -> Result<Subscription> {
        let updated = subscription::set_override(&self.db, user_id, slot, value).await?;
        self.notify_changed(user_id);
        Ok(updated)
    }

    /// Records a billing status pushed by the payment provider.
    pub async fn update_status(
        &self,
        user_id: &str,
        status: &SubscriptionStatus,
    ) -> Result<Subscription> {
        let updated = subscription::update_status(&self.db, user_id, status).await?;
        self.notify_changed(user_id);
        Ok(updated)
    }

    /// Tells change-feed listeners that `user_id` was written.
    pub fn notify_changed(&self, user_id: &str) {
        let change = SubscriptionChange {
            user_id: user_id.to_string(),
        };
        if self.changes.send(change).is_err() {
            trace!(user_id, "No change listeners");
        }
    }
}

impl SubscriptionStore for DbSubscriptionStore {
    async fn load(&self, user_id: &str) -> Result<Subscription> {
        subscription::load_subscription(&self.db, user_id).await
    }

    #[instrument(skip(self, slots))]
    async fn replace_override_slots(
        &self,
        user_id: &str,
        slots: &OverrideSlots,
    ) -> Result<Subscription> {
        let txn = self.db.begin().await?;
        let updated = subscription::replace_override_slots(&txn, user_id, slots).await?;
        txn.commit().await?;

        info!(user_id, "Override slots persisted");
        self.notify_changed(user_id);
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<SubscriptionChange> {
        self.changes.subscribe()
    }
}
