use serde::Serialize;

use super::capacity::resolve_capacity;
use crate::members::{Resource, ResourceType};

/// How pre-allocated hours on pending members are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Pending members report their real pre-allocations and count in team rollups.
    #[default]
    Include,
    /// Pending members report 0% and are left out of team rollups.
    Exclude,
}

impl PendingPolicy {
    /// Unknown strings fall back to `Include` with a warning.
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_else(|| {
            log::warn!("unknown pending_policy '{s}', using include");
            PendingPolicy::Include
        })
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "include" => Some(PendingPolicy::Include),
            "exclude" => Some(PendingPolicy::Exclude),
            _ => None,
        }
    }
}

/// Per-member utilization for one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationResult {
    pub member_id: String,
    pub member_name: String,
    pub resource_type: ResourceType,
    pub is_pending: bool,
    /// Percentage, unrounded. May exceed 100.
    pub utilization_rate: f64,
    pub total_allocated_hours: f64,
    pub weekly_capacity: f64,
    /// `weekly_capacity * week_multiplier`.
    pub period_capacity_hours: f64,
}

impl UtilizationResult {
    pub fn rounded_rate(&self) -> i64 {
        self.utilization_rate.round() as i64
    }
}

/// `allocated / (capacity * multiplier) * 100`, or 0 when the denominator is not positive.
pub fn compute_utilization(allocated_hours: f64, weekly_capacity: f64, week_multiplier: u32) -> f64 {
    let period_capacity = weekly_capacity * week_multiplier as f64;
    if !period_capacity.is_finite() || period_capacity <= 0.0 || !allocated_hours.is_finite() {
        return 0.0;
    }
    allocated_hours / period_capacity * 100.0
}

/// Build the per-member result. Both variants go through the same math
/// unless `policy` excludes pending members.
pub fn member_utilization(
    member: &Resource,
    allocated_hours: f64,
    company_default_hours: f64,
    week_multiplier: u32,
    policy: PendingPolicy,
) -> UtilizationResult {
    let weekly_capacity = resolve_capacity(member, company_default_hours);
    let utilization_rate = if member.is_pending() && policy == PendingPolicy::Exclude {
        0.0
    } else {
        compute_utilization(allocated_hours, weekly_capacity, week_multiplier)
    };

    UtilizationResult {
        member_id: member.id().to_string(),
        member_name: member.display_name(),
        resource_type: member.resource_type(),
        is_pending: member.is_pending(),
        utilization_rate,
        total_allocated_hours: allocated_hours,
        weekly_capacity,
        period_capacity_hours: weekly_capacity * week_multiplier as f64,
    }
}
