//! Visit date generation from the plan's weekday rules.
//!
//! The generated sequence ignores overrides entirely: each step starts from the
//! previous generated date, so manual changes never shift the cadence.

use crate::core::{
    overrides::SLOT_COUNT,
    plan::{PlanDay, PlanType},
};
use chrono::{DateTime, Datelike, Duration, TimeZone, Weekday};

/// The first `weekday` strictly after `from`, one to seven days ahead.
#[must_use]
pub fn next_weekday<Tz: TimeZone>(from: &DateTime<Tz>, weekday: Weekday) -> DateTime<Tz> {
    let current = i64::from(from.weekday().num_days_from_sunday());
    let wanted = i64::from(weekday.num_days_from_sunday());
    let days = match (wanted - current).rem_euclid(7) {
        0 => 7,
        n => n,
    };
    from.clone() + Duration::days(days)
}

/// Weekday of the next visit after `from`, or `None` without a known plan.
#[must_use]
pub fn next_service_weekday(
    plan: Option<PlanType>,
    plan_day: Option<PlanDay>,
    from_weekday: Weekday,
) -> Option<Weekday> {
    let weekday = match plan? {
        PlanType::TwiceAWeekPremium
        | PlanType::TwiceAWeekArtificialGrass
        | PlanType::TwiceAWeek => match from_weekday {
            Weekday::Tue | Weekday::Wed | Weekday::Thu => Weekday::Fri,
            Weekday::Mon | Weekday::Fri | Weekday::Sat | Weekday::Sun => Weekday::Mon,
        },
        PlanType::OnceAWeekPremiumFriday | PlanType::OnceAWeekFriday => Weekday::Fri,
        PlanType::OnceAWeekPremium | PlanType::OnceAWeek => match plan_day {
            Some(PlanDay::Mon) => Weekday::Mon,
            Some(PlanDay::Wed) | None => Weekday::Wed,
        },
        PlanType::OnceAWeekArtificialGrass => Weekday::Wed,
    };
    Some(weekday)
}

/// The next visit strictly after `from`.
#[must_use]
pub fn next_occurrence<Tz: TimeZone>(
    plan: Option<PlanType>,
    plan_day: Option<PlanDay>,
    from: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    next_service_weekday(plan, plan_day, from.weekday()).map(|weekday| next_weekday(from, weekday))
}

/// The next `count` visits after `from`, each generated from the one before.
/// Empty without a known plan.
#[must_use]
pub fn next_occurrences<Tz: TimeZone>(
    plan: Option<PlanType>,
    plan_day: Option<PlanDay>,
    from: &DateTime<Tz>,
    count: usize,
) -> Vec<DateTime<Tz>> {
    let mut dates = Vec::with_capacity(count);
    let mut cursor = from.clone();
    while dates.len() < count {
        let Some(next) = next_occurrence(plan, plan_day, &cursor) else {
            break;
        };
        cursor = next.clone();
        dates.push(next);
    }
    dates
}

/// Where counting of upcoming visits begins: `now`, or the plan start when
/// that is still in the future.
#[must_use]
pub fn schedule_reference<Tz: TimeZone>(plan_start: Option<i64>, now: &DateTime<Tz>) -> DateTime<Tz> {
    plan_start
        .and_then(|start| DateTime::from_timestamp(start, 0))
        .map(|start| start.with_timezone(&now.timezone()))
        .filter(|start| start > now)
        .unwrap_or_else(|| now.clone())
}

/// The six visits that the override slots refer to.
#[must_use]
pub fn next_six_occurrences<Tz: TimeZone>(
    plan: Option<PlanType>,
    plan_day: Option<PlanDay>,
    plan_start: Option<i64>,
    now: &DateTime<Tz>,
) -> Vec<DateTime<Tz>> {
    next_occurrences(plan, plan_day, &schedule_reference(plan_start, now), SLOT_COUNT)
}
