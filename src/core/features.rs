//! Treatment rules - which add-on treatments ride along with a given visit.
//!
//! Treatments follow a weekly cadence counted from the plan start date, with
//! fertiliser work skipped in the hottest and coldest months of the southern
//! hemisphere year. Everything here is a pure function of its inputs.

use crate::core::{
    overrides::IconSet,
    plan::{PlanTier, PlanType},
};
use chrono::{DateTime, Datelike, TimeZone};

const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Months (zero-based) in which fertiliser is never applied: Jan, Feb, Jun, Jul, Aug.
const FERTILISER_BLACKOUT_MONTHS: [u32; 5] = [0, 1, 5, 6, 7];

/// Months (zero-based) in which aeration accompanies fertiliser: Mar-May, Sep-Nov.
const AERATION_MONTHS: [u32; 6] = [2, 3, 4, 8, 9, 10];

/// Treatments that apply to one visit. Derived per date and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickupFeatures {
    /// Soil neutraliser, every 4th week
    pub soil_neutraliser: bool,
    /// Fertiliser, every 8th week outside blackout months
    pub fertiliser: bool,
    /// Overseeding, always alongside fertiliser
    pub overseed: bool,
    /// Aeration, on spring and autumn fertiliser weeks
    pub aeration: bool,
    /// Lawn repair, every 2nd week
    pub repair: bool,
    /// Plan is on the premium tier
    pub is_premium: bool,
    /// Plan is on the artificial grass tier
    pub is_artificial_grass: bool,
}

impl PickupFeatures {
    /// Features for a plan whose cadence cannot be computed: only the tier flags.
    #[must_use]
    pub const fn tier_only(tier: PlanTier) -> Self {
        Self {
            soil_neutraliser: false,
            fertiliser: false,
            overseed: false,
            aeration: false,
            repair: false,
            is_premium: tier.is_premium(),
            is_artificial_grass: tier.is_artificial_grass(),
        }
    }

    /// Icon set shown for these features when no manual icons are set.
    /// Every visit includes the scoop; deodorising comes with either paid tier.
    #[must_use]
    pub const fn icons(&self) -> IconSet {
        IconSet {
            doo: true,
            deod: self.is_premium || self.is_artificial_grass,
            soil_neutraliser: self.soil_neutraliser,
            fert: self.fertiliser,
            aer: self.aeration,
            seed: self.overseed,
            repair: self.repair,
        }
    }
}

/// Whole weeks between the plan start and the target, floored.
///
/// Negative when the target precedes the plan start. The result is then used
/// with Rust's truncating `%`, so `-1 % 4 == -1` is an "off" week.
#[must_use]
pub fn weeks_since_start<Tz: TimeZone>(plan_start: i64, target: &DateTime<Tz>) -> i64 {
    let elapsed = target
        .timestamp_millis()
        .saturating_sub(plan_start.saturating_mul(1000));
    elapsed.div_euclid(WEEK_MILLIS)
}

/// Computes the treatments for a visit on `target`.
///
/// A missing plan yields all-false flags. A missing or zero plan start, or a
/// missing target, yields only the tier flags.
#[must_use]
pub fn compute_features<Tz: TimeZone>(
    plan: Option<PlanType>,
    plan_start: Option<i64>,
    target: Option<&DateTime<Tz>>,
) -> PickupFeatures {
    let tier = plan.map_or(PlanTier::Standard, PlanType::tier);
    let base = PickupFeatures::tier_only(tier);

    let (Some(plan_start), Some(target)) = (plan_start.filter(|s| *s > 0), target) else {
        return base;
    };

    let weeks = weeks_since_start(plan_start, target);
    let month = target.month0();
    let premium = tier.is_premium();

    let fertiliser =
        premium && !FERTILISER_BLACKOUT_MONTHS.contains(&month) && weeks % 8 == 0;

    PickupFeatures {
        soil_neutraliser: premium && weeks % 4 == 0,
        fertiliser,
        overseed: fertiliser,
        aeration: fertiliser && AERATION_MONTHS.contains(&month),
        repair: premium && weeks % 2 == 0,
        ..base
    }
}
