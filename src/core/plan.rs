//! Plan catalogue - the closed set of service plans and how they are classified.
//!
//! Plan names come from the billing provider as display strings. Tier
//! classification is done by substring so it also works on raw names that are
//! not (yet) part of the catalogue.

use serde::{Deserialize, Serialize};
use std::fmt;

const PREMIUM_MARKER: &str = "Premium";
const ARTIFICIAL_GRASS_MARKER: &str = "Artificial Grass";

/// A subscription plan offered to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanType {
    /// Monday and Friday visits with soil treatments
    #[serde(rename = "Twice a week Premium")]
    TwiceAWeekPremium,
    /// Friday visits with soil treatments
    #[serde(rename = "Once a week Premium Friday")]
    OnceAWeekPremiumFriday,
    /// Monday or Wednesday visits with soil treatments
    #[serde(rename = "Once a week Premium")]
    OnceAWeekPremium,
    /// Wednesday visits for astro-turf lawns
    #[serde(rename = "Once a week Artificial Grass")]
    OnceAWeekArtificialGrass,
    /// Monday and Friday visits for astro-turf lawns
    #[serde(rename = "Twice a week Artificial Grass")]
    TwiceAWeekArtificialGrass,
    /// Monday and Friday scoop-only visits
    #[serde(rename = "Twice a week")]
    TwiceAWeek,
    /// Friday scoop-only visits
    #[serde(rename = "Once a week Friday")]
    OnceAWeekFriday,
    /// Monday or Wednesday scoop-only visits
    #[serde(rename = "Once a week")]
    OnceAWeek,
}

impl PlanType {
    /// Every plan in the catalogue.
    pub const ALL: [Self; 8] = [
        Self::TwiceAWeekPremium,
        Self::OnceAWeekPremiumFriday,
        Self::OnceAWeekPremium,
        Self::OnceAWeekArtificialGrass,
        Self::TwiceAWeekArtificialGrass,
        Self::TwiceAWeek,
        Self::OnceAWeekFriday,
        Self::OnceAWeek,
    ];

    /// The plan name exactly as the billing provider reports it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TwiceAWeekPremium => "Twice a week Premium",
            Self::OnceAWeekPremiumFriday => "Once a week Premium Friday",
            Self::OnceAWeekPremium => "Once a week Premium",
            Self::OnceAWeekArtificialGrass => "Once a week Artificial Grass",
            Self::TwiceAWeekArtificialGrass => "Twice a week Artificial Grass",
            Self::TwiceAWeek => "Twice a week",
            Self::OnceAWeekFriday => "Once a week Friday",
            Self::OnceAWeek => "Once a week",
        }
    }

    /// Looks up a plan by its exact name. Unknown names yield `None` so callers
    /// can fall back to a "no plan" state instead of failing.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|plan| plan.as_str() == name)
    }

    /// Tier derived from the plan name.
    #[must_use]
    pub fn tier(self) -> PlanTier {
        PlanTier::classify(self.as_str())
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service tier, which decides the treatment schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanTier {
    /// Scoop-only
    Standard,
    /// Scoop plus soil treatments
    Premium,
    /// Scoop plus grass cleaning
    ArtificialGrass,
}

impl PlanTier {
    /// Classifies any plan name by substring. Empty names are standard.
    #[must_use]
    pub fn classify(plan_name: &str) -> Self {
        if plan_name.contains(PREMIUM_MARKER) {
            Self::Premium
        } else if plan_name.contains(ARTIFICIAL_GRASS_MARKER) {
            Self::ArtificialGrass
        } else {
            Self::Standard
        }
    }

    /// Whether soil treatments apply.
    #[must_use]
    pub const fn is_premium(self) -> bool {
        matches!(self, Self::Premium)
    }

    /// Whether grass cleaning applies.
    #[must_use]
    pub const fn is_artificial_grass(self) -> bool {
        matches!(self, Self::ArtificialGrass)
    }
}

/// Preferred service day for single-weekly plans that can run Monday or Wednesday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDay {
    /// Monday service
    Mon,
    /// Wednesday service
    Wed,
}

impl PlanDay {
    /// Parses the stored `"mon"` / `"wed"` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mon" => Some(Self::Mon),
            "wed" => Some(Self::Wed),
            _ => None,
        }
    }

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Wed => "wed",
        }
    }
}

/// Billing status as reported by the payment provider. The set is open, so
/// anything unrecognised is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    /// Signed up but service not yet scheduled
    Planning,
    /// Free trial
    Trial,
    /// Provider-side trial period
    Trialing,
    /// Paid and running
    Active,
    /// Payment is overdue
    PastDue,
    /// Subscription ended
    Canceled,
    /// Any other provider status
    Other(String),
}

impl SubscriptionStatus {
    /// Maps a provider status string onto a known variant.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "planning" => Self::Planning,
            "trial" => Self::Trial,
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Provider representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Planning => "planning",
            Self::Trial => "trial",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Other(other) => other,
        }
    }

    /// Planning subscriptions have no service dates yet.
    #[must_use]
    pub const fn suppresses_schedule(&self) -> bool {
        matches!(self, Self::Planning)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
