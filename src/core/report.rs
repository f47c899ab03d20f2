//! Plain-text schedule summaries for logs and the command line.

use crate::core::resolution::ResolvedOccurrence;
use chrono::TimeZone;
use std::fmt::Display;

const DATE_FORMAT: &str = "%a %d %b %Y";

/// One line per visit: date, then treatments or the cancellation notice.
///
/// # Example output
/// ```text
/// Upcoming pickups (2)
///   Wed 06 Mar 2024 | Pickup, Deodorise, Soil neutraliser, Fertiliser, Aeration, Overseed, Repair
///   Wed 13 Mar 2024 | CANCELLED (refund at next payment)
/// ```
#[must_use]
pub fn format_schedule_summary<Tz>(visits: &[ResolvedOccurrence<Tz>]) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if visits.is_empty() {
        return "No upcoming pickups scheduled".to_string();
    }

    let mut summary = format!("Upcoming pickups ({})\n", visits.len());
    for visit in visits {
        let detail = if visit.refund_at_next_payment() {
            "CANCELLED (refund at next payment)".to_string()
        } else {
            visit.icons().labels().join(", ")
        };

        summary.push_str(&format!("  {} | {detail}", visit.date.format(DATE_FORMAT)));
        if visit.manual_icons.is_some() && !visit.cancelled {
            summary.push_str(" [manual]");
        }
        if visit.is_moved() {
            summary.push_str(&format!(
                " (moved from {})",
                visit.generated_date.format(DATE_FORMAT)
            ));
        }
        summary.push('\n');
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            overrides::{IconSet, Override},
            plan::PlanDay,
            resolution::resolve_next_six,
        },
        test_utils::{subscription_fixture, utc_day},
    };
    use chrono::Utc;

    #[test]
    fn test_empty_schedule() {
        let visits: Vec<ResolvedOccurrence<Utc>> = Vec::new();
        assert_eq!(format_schedule_summary(&visits), "No upcoming pickups scheduled");
    }

    #[test]
    fn test_summary_lists_treatments_and_cancellations() {
        let now = utc_day(2024, 3, 4);
        let mut subscription = subscription_fixture("Once a week Premium", Some(PlanDay::Wed));
        subscription.overrides[1] = Override::cancellation(utc_day(2024, 3, 13).timestamp());
        subscription.overrides[2] = Override::reschedule(
            utc_day(2024, 3, 21).timestamp(),
            utc_day(2024, 3, 20).timestamp(),
        )
        .with_icons(IconSet {
            doo: true,
            ..IconSet::EMPTY
        });

        let summary = format_schedule_summary(&resolve_next_six(&subscription, &now));

        assert!(summary.starts_with("Upcoming pickups (6)"));
        assert!(summary.contains("Wed 06 Mar 2024 | Pickup, Deodorise, Soil neutraliser"));
        assert!(summary.contains("Wed 13 Mar 2024 | CANCELLED (refund at next payment)"));
        assert!(summary.contains("Thu 21 Mar 2024 | Pickup [manual] (moved from Wed 20 Mar 2024)"));
        assert_eq!(summary.lines().count(), 7);
    }
}
