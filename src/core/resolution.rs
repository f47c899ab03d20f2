//! Override resolution - what the customer actually sees for each upcoming visit.
//!
//! Generated visit dates are overlaid with the override slot at the same
//! position. A slot can move a visit, cancel it, or replace its treatment
//! icons. A moved visit whose original date has already passed is shown on
//! its generated date again, even before the expiry job clears the slot.

use crate::core::{
    features::{PickupFeatures, compute_features},
    occurrence::{next_occurrence, next_six_occurrences, schedule_reference},
    overrides::{IconSet, Override},
    subscription::Subscription,
};
use chrono::{DateTime, TimeZone};

/// One upcoming visit after overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOccurrence<Tz: TimeZone> {
    /// Date to show
    pub date: DateTime<Tz>,
    /// Date the plan rules generated for this visit
    pub generated_date: DateTime<Tz>,
    /// Treatments from the plan rules (all false when cancelled)
    pub features: PickupFeatures,
    /// No visit will happen
    pub cancelled: bool,
    /// Manually chosen icons, if any
    pub manual_icons: Option<IconSet>,
}

impl<Tz: TimeZone> ResolvedOccurrence<Tz> {
    fn generated(subscription: &Subscription, generated: &DateTime<Tz>) -> Self {
        Self {
            date: generated.clone(),
            generated_date: generated.clone(),
            features: compute_features(
                subscription.plan,
                subscription.plan_start,
                Some(generated),
            ),
            cancelled: false,
            manual_icons: None,
        }
    }

    /// Icons to display: empty when cancelled, manual when set, otherwise derived.
    #[must_use]
    pub fn icons(&self) -> IconSet {
        if self.cancelled {
            IconSet::EMPTY
        } else {
            self.manual_icons.unwrap_or_else(|| self.features.icons())
        }
    }

    /// A cancelled visit is refunded against the next payment.
    #[must_use]
    pub const fn refund_at_next_payment(&self) -> bool {
        self.cancelled
    }

    /// Whether an override changed the shown date.
    #[must_use]
    pub fn is_moved(&self) -> bool {
        !self.cancelled && self.date != self.generated_date
    }
}

fn to_zone<Tz: TimeZone>(seconds: i64, zone: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(seconds, 0).map(|utc| utc.with_timezone(zone))
}

/// Applies one override slot to one generated visit.
#[must_use]
pub fn resolve_occurrence<Tz: TimeZone>(
    subscription: &Subscription,
    generated: &DateTime<Tz>,
    slot: Option<&Override>,
    now: &DateTime<Tz>,
) -> ResolvedOccurrence<Tz> {
    let plain = ResolvedOccurrence::generated(subscription, generated);
    let Some(slot) = slot.filter(|slot| slot.is_active()) else {
        return plain;
    };

    let zone = generated.timezone();
    if slot.cancel {
        return ResolvedOccurrence {
            date: slot
                .date
                .and_then(|date| to_zone(date, &zone))
                .unwrap_or_else(|| generated.clone()),
            features: PickupFeatures::default(),
            cancelled: true,
            manual_icons: None,
            ..plain
        };
    }

    let expected_ms = slot.original_date.or(slot.date).map_or_else(
        || generated.timestamp_millis(),
        |seconds| seconds.saturating_mul(1000),
    );
    let date = match slot.date.and_then(|date| to_zone(date, &zone)) {
        Some(moved) if now.timestamp_millis() < expected_ms => moved,
        _ => generated.clone(),
    };

    ResolvedOccurrence {
        date,
        manual_icons: slot.manual_icons.then_some(slot.icons),
        ..plain
    }
}

/// The next six visits with their override slots applied.
///
/// Empty while the subscription is still being planned or has no known plan.
#[must_use]
pub fn resolve_next_six<Tz: TimeZone>(
    subscription: &Subscription,
    now: &DateTime<Tz>,
) -> Vec<ResolvedOccurrence<Tz>> {
    if subscription.status.suppresses_schedule() {
        return Vec::new();
    }

    next_six_occurrences(
        subscription.plan,
        subscription.plan_day,
        subscription.plan_start,
        now,
    )
    .iter()
    .enumerate()
    .map(|(index, generated)| {
        resolve_occurrence(
            subscription,
            generated,
            subscription.overrides.get(index),
            now,
        )
    })
    .collect()
}

/// The single next visit, resolved against the first override slot only.
#[must_use]
pub fn resolve_next_pickup<Tz: TimeZone>(
    subscription: &Subscription,
    now: &DateTime<Tz>,
) -> Option<ResolvedOccurrence<Tz>> {
    if subscription.status.suppresses_schedule() {
        return None;
    }

    let reference = schedule_reference(subscription.plan_start, now);
    let generated = next_occurrence(subscription.plan, subscription.plan_day, &reference)?;
    Some(resolve_occurrence(
        subscription,
        &generated,
        subscription.overrides.get(0),
        now,
    ))
}
