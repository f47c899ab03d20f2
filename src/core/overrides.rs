//! Manual override slots - one-off reschedules, cancellations and icon changes.
//!
//! A subscription carries six ordered slots. Slot `i` belongs to the `i`-th
//! upcoming visit. In storage each slot is a JSON document holding a
//! single-element list with integer 0/1 flags; this module is the boundary
//! where that loose shape is validated into [`Override`].

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use tracing::warn;

/// Number of override slots on every subscription.
pub const SLOT_COUNT: usize = 6;

/// Per-treatment icon flags shown against a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IconSet {
    /// Waste pickup
    pub doo: bool,
    /// Deodorising
    pub deod: bool,
    /// Soil neutraliser
    pub soil_neutraliser: bool,
    /// Fertiliser
    pub fert: bool,
    /// Aeration
    pub aer: bool,
    /// Overseeding
    pub seed: bool,
    /// Lawn repair
    pub repair: bool,
}

impl IconSet {
    /// No icons at all (used for cancelled visits).
    pub const EMPTY: Self = Self {
        doo: false,
        deod: false,
        soil_neutraliser: false,
        fert: false,
        aer: false,
        seed: false,
        repair: false,
    };

    /// Human-readable names of the enabled icons, in display order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.doo, "Pickup"),
            (self.deod, "Deodorise"),
            (self.soil_neutraliser, "Soil neutraliser"),
            (self.fert, "Fertiliser"),
            (self.aer, "Aeration"),
            (self.seed, "Overseed"),
            (self.repair, "Repair"),
        ]
        .into_iter()
        .filter_map(|(enabled, label)| enabled.then_some(label))
        .collect()
    }

    /// True when no icon is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// One validated override slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Override {
    /// Whether the slot is in effect
    pub active: bool,
    /// Replacement visit date, Unix seconds
    pub date: Option<i64>,
    /// The generated visit date this override replaces, Unix seconds
    pub original_date: Option<i64>,
    /// The visit is cancelled outright
    pub cancel: bool,
    /// Icons come from [`Override::icons`] instead of the treatment rules
    pub manual_icons: bool,
    /// Manually chosen icons
    pub icons: IconSet,
}

impl Override {
    /// An empty, inactive slot.
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Moves the visit that was due at `original_date` to `date`.
    #[must_use]
    pub const fn reschedule(date: i64, original_date: i64) -> Self {
        Self {
            active: true,
            date: Some(date),
            original_date: Some(original_date),
            cancel: false,
            manual_icons: false,
            icons: IconSet::EMPTY,
        }
    }

    /// Cancels the visit due at `date`.
    #[must_use]
    pub const fn cancellation(date: i64) -> Self {
        Self {
            active: true,
            date: Some(date),
            original_date: Some(date),
            cancel: true,
            manual_icons: false,
            icons: IconSet::EMPTY,
        }
    }

    /// Returns this override with manually chosen icons.
    #[must_use]
    pub const fn with_icons(mut self, icons: IconSet) -> Self {
        self.manual_icons = true;
        self.icons = icons;
        self
    }

    /// Whether the slot currently holds an override.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Checks the record for combinations that cannot be acted on.
    pub fn validate(&self, slot: usize) -> Result<()> {
        if self.active && !self.cancel && !self.manual_icons && self.date.is_none() {
            return Err(Error::InvalidOverride {
                slot,
                message: "active override neither moves, cancels nor re-icons the visit"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Parses one stored slot document.
    ///
    /// Accepts the stored single-element list, an empty list (treated as an
    /// empty slot) or a bare object.
    pub fn from_json(slot: usize, json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::cleared());
        }

        let raw = match serde_json::from_str::<StoredSlot>(json)? {
            StoredSlot::List(mut entries) => match entries.len() {
                0 => return Ok(Self::cleared()),
                1 => entries.remove(0),
                n => {
                    return Err(Error::InvalidOverride {
                        slot,
                        message: format!("expected one override, found {n}"),
                    });
                }
            },
            StoredSlot::Single(raw) => raw,
        };

        let parsed = raw.into_override(slot)?;
        parsed.validate(slot)?;
        Ok(parsed)
    }

    /// Serializes this slot in its stored single-element list form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&[RawOverride::from(self)]).map_err(Into::into)
    }
}

/// The six override slots of a subscription, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverrideSlots([Override; SLOT_COUNT]);

impl OverrideSlots {
    /// Six empty slots, as created with a new subscription.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Slot at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Override> {
        self.0.get(index)
    }

    /// Number of active slots.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_active()).count()
    }

    /// Parses all six stored slot documents.
    ///
    /// A slot that fails to parse or validate is read as empty, so one bad
    /// document never hides the rest of the schedule.
    #[must_use]
    pub fn from_json_columns(columns: [&str; SLOT_COUNT]) -> Self {
        let mut slots = [Override::cleared(); SLOT_COUNT];
        for (index, column) in columns.into_iter().enumerate() {
            match Override::from_json(index, column) {
                Ok(parsed) => slots[index] = parsed,
                Err(e) => warn!(slot = index, "Ignoring unreadable override slot: {e}"),
            }
        }
        Self(slots)
    }

    /// Serializes all six slots into their stored documents.
    pub fn to_json_columns(&self) -> Result<[String; SLOT_COUNT]> {
        let mut columns: [String; SLOT_COUNT] = Default::default();
        for (column, slot) in columns.iter_mut().zip(self.0.iter()) {
            *column = slot.to_json()?;
        }
        Ok(columns)
    }
}

impl Index<usize> for OverrideSlots {
    type Output = Override;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for OverrideSlots {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSlot {
    List(Vec<RawOverride>),
    Single(RawOverride),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOverride {
    #[serde(rename = "override", default)]
    active: u8,
    #[serde(default)]
    date: Option<i64>,
    #[serde(default)]
    original_date: Option<i64>,
    #[serde(default)]
    override_cancel: u8,
    #[serde(default)]
    override_icons: u8,
    #[serde(default)]
    icons: RawIcons,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIcons {
    #[serde(default)]
    doo: u8,
    #[serde(default)]
    deod: u8,
    #[serde(default)]
    soil_neutraliser: u8,
    #[serde(default)]
    fert: u8,
    #[serde(default)]
    aer: u8,
    #[serde(default)]
    seed: u8,
    #[serde(default)]
    repair: u8,
}

fn flag(slot: usize, field: &str, value: u8) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::InvalidOverride {
            slot,
            message: format!("{field} must be 0 or 1, got {other}"),
        }),
    }
}

impl RawOverride {
    fn into_override(self, slot: usize) -> Result<Override> {
        let icons = &self.icons;
        Ok(Override {
            active: flag(slot, "override", self.active)?,
            date: self.date,
            original_date: self.original_date,
            cancel: flag(slot, "overrideCancel", self.override_cancel)?,
            manual_icons: flag(slot, "overrideIcons", self.override_icons)?,
            icons: IconSet {
                doo: flag(slot, "icons.doo", icons.doo)?,
                deod: flag(slot, "icons.deod", icons.deod)?,
                soil_neutraliser: flag(slot, "icons.soilNeutraliser", icons.soil_neutraliser)?,
                fert: flag(slot, "icons.fert", icons.fert)?,
                aer: flag(slot, "icons.aer", icons.aer)?,
                seed: flag(slot, "icons.seed", icons.seed)?,
                repair: flag(slot, "icons.repair", icons.repair)?,
            },
        })
    }
}

impl From<&Override> for RawOverride {
    fn from(value: &Override) -> Self {
        let icons = &value.icons;
        Self {
            active: value.active.into(),
            date: value.date,
            original_date: value.original_date,
            override_cancel: value.cancel.into(),
            override_icons: value.manual_icons.into(),
            icons: RawIcons {
                doo: icons.doo.into(),
                deod: icons.deod.into(),
                soil_neutraliser: icons.soil_neutraliser.into(),
                fert: icons.fert.into(),
                aer: icons.aer.into(),
                seed: icons.seed.into(),
                repair: icons.repair.into(),
            },
        }
    }
}
