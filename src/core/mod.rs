//! Core scheduling logic, independent of how the schedule is shown.

/// Treatment rules per visit date
pub mod features;
/// Visit date generation from plan weekday rules
pub mod occurrence;
/// Manual override slot records
pub mod overrides;
/// Plan catalogue, tiers and billing status
pub mod plan;
/// Override expiry and rotation
pub mod reconcile;
/// Plain-text schedule summaries
pub mod report;
/// Overlaying override slots on generated visits
pub mod resolution;
/// Store seam and change feed
pub mod store;
/// Subscription records
pub mod subscription;
