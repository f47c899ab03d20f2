//! Application state for a signed-in customer session.
//!
//! [`AppState`] is an explicit container handed to whatever renders the
//! schedule: it starts empty, is initialised with a user when a session
//! begins, and is reset on sign-out. [`Session`] keeps it in step with the
//! store, reconciling override slots every time the record is loaded or a
//! change notification arrives.

use crate::{
    core::{
        reconcile::{Reconciled, persist_reconciled},
        resolution::{ResolvedOccurrence, resolve_next_pickup, resolve_next_six},
        store::SubscriptionStore,
        subscription::Subscription,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, TimeZone};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Schedule state for the signed-in user.
#[derive(Debug, Clone)]
pub struct AppState<Tz: TimeZone> {
    user_id: Option<String>,
    subscription: Option<Subscription>,
    next_pickup: Option<ResolvedOccurrence<Tz>>,
    upcoming: Vec<ResolvedOccurrence<Tz>>,
}

impl<Tz: TimeZone> Default for AppState<Tz> {
    fn default() -> Self {
        Self {
            user_id: None,
            subscription: None,
            next_pickup: None,
            upcoming: Vec::new(),
        }
    }
}

impl<Tz: TimeZone> AppState<Tz> {
    /// Empty state with no user.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `user_id`, discarding anything from a previous one.
    pub fn init(&mut self, user_id: &str) {
        self.reset();
        self.user_id = Some(user_id.to_string());
    }

    /// Returns to the initial, signed-out state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Replaces the observed record and recomputes the displayed schedule.
    pub fn apply_snapshot(&mut self, subscription: Subscription, now: &DateTime<Tz>) {
        self.next_pickup = resolve_next_pickup(&subscription, now);
        self.upcoming = resolve_next_six(&subscription, now);
        self.subscription = Some(subscription);
    }

    /// Signed-in user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Last successfully observed record.
    #[must_use]
    pub const fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// The next visit, with the first override slot applied.
    #[must_use]
    pub const fn next_pickup(&self) -> Option<&ResolvedOccurrence<Tz>> {
        self.next_pickup.as_ref()
    }

    /// The next six visits with overrides applied.
    #[must_use]
    pub fn upcoming(&self) -> &[ResolvedOccurrence<Tz>] {
        &self.upcoming
    }
}

/// Keeps an [`AppState`] in step with the store for one user.
#[derive(Debug)]
pub struct Session<'a, S, Tz: TimeZone> {
    store: &'a S,
    state: AppState<Tz>,
}

impl<'a, S, Tz> Session<'a, S, Tz>
where
    S: SubscriptionStore,
    Tz: TimeZone,
{
    /// Starts a session for `user_id` against `store`.
    pub fn start(store: &'a S, user_id: &str) -> Self {
        let mut state = AppState::new();
        state.init(user_id);
        info!(user_id, "Session started");
        Self { store, state }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &AppState<Tz> {
        &self.state
    }

    /// Loads the latest record, reconciles its override slots and updates the
    /// state.
    ///
    /// If the reconciled slots cannot be written the state keeps showing the
    /// previous schedule, or the loaded pre-rotation record when nothing has
    /// been shown yet.
    pub async fn refresh(&mut self, now: &DateTime<Tz>) -> Result<Reconciled> {
        let Some(user_id) = self.state.user_id().map(str::to_string) else {
            return Err(Error::Config {
                message: "Session has no signed-in user".to_string(),
            });
        };

        let latest = self.store.load(&user_id).await?;
        let fallback = self.state.subscription().is_none().then(|| latest.clone());
        let reconciled = match persist_reconciled(self.store, latest, now).await {
            Ok(reconciled) => reconciled,
            Err(e) => {
                if let Some(loaded) = fallback.filter(|_| e.is_persistence()) {
                    debug!(user_id = %user_id, "Showing pre-rotation schedule");
                    self.state.apply_snapshot(loaded, now);
                }
                return Err(e);
            }
        };
        self.state.apply_snapshot(reconciled.subscription.clone(), now);
        debug!(
            user_id = %user_id,
            upcoming = self.state.upcoming().len(),
            "Schedule refreshed"
        );
        Ok(reconciled)
    }

    /// Refreshes on every change to this user's record until the feed closes.
    ///
    /// Failed refreshes are logged and retried on the next notification.
    /// `clock` supplies the current time for each refresh.
    pub async fn observe<F>(&mut self, mut clock: F) -> Result<()>
    where
        F: FnMut() -> DateTime<Tz>,
    {
        let mut changes = self.store.subscribe();
        if let Err(e) = self.refresh(&clock()).await {
            warn!("Initial refresh failed: {e}");
        }

        loop {
            match changes.recv().await {
                Ok(change) if Some(change.user_id.as_str()) == self.state.user_id() => {
                    if let Err(e) = self.refresh(&clock()).await {
                        warn!("Refresh after change failed: {e}");
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Change feed lagged, refreshing");
                    if let Err(e) = self.refresh(&clock()).await {
                        warn!("Refresh after lag failed: {e}");
                    }
                }
                Err(RecvError::Closed) => {
                    info!("Change feed closed, ending session observation");
                    return Ok(());
                }
            }
        }
    }

    /// Ends the session, returning the state to signed-out.
    pub fn sign_out(&mut self) {
        if let Some(user_id) = self.state.user_id() {
            info!(user_id, "Session ended");
        }
        self.state.reset();
    }
}
