use serde::Serialize;

use super::utilization::UtilizationResult;

/// Rate above which a member counts as overloaded.
pub const OVERLOAD_THRESHOLD: f64 = 100.0;
/// Rate below which a member counts as under-utilized.
pub const UNDERUTILIZED_THRESHOLD: f64 = 50.0;

/// Which number `team_utilization_rate` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRateMethod {
    /// Arithmetic mean of member rates.
    #[default]
    Mean,
    /// Total allocated hours over total capacity.
    Weighted,
}

impl TeamRateMethod {
    /// Unknown strings fall back to `Mean` with a warning.
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_else(|| {
            log::warn!("unknown team_rate '{s}', using mean");
            TeamRateMethod::Mean
        })
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Some(TeamRateMethod::Mean),
            "weighted" => Some(TeamRateMethod::Weighted),
            _ => None,
        }
    }
}

/// Team rollup of per-member utilization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamSummary {
    pub member_count: u64,
    pub team_utilization_rate: f64,
    pub mean_utilization_rate: f64,
    pub weighted_utilization_rate: f64,
    pub overloaded_count: u64,
    pub underutilized_count: u64,
    pub total_capacity_hours: f64,
    pub total_allocated_hours: f64,
    /// Capacity minus allocated. Negative means over-committed.
    pub capacity_gap_hours: f64,
    pub has_capacity_gap: bool,
    /// Gap as a percentage of capacity.
    pub capacity_buffer_pct: f64,
}

impl TeamSummary {
    /// "N hours over" when over-committed, else "N hours available".
    pub fn capacity_gap_display(&self) -> String {
        let hours = self.capacity_gap_hours.abs().round() as i64;
        if self.has_capacity_gap {
            format!("{hours} hours over")
        } else {
            format!("{hours} hours available")
        }
    }
}

/// Aggregate with the canonical mean rate.
pub fn aggregate_team(results: &[UtilizationResult]) -> TeamSummary {
    aggregate_team_with(results, TeamRateMethod::Mean)
}

pub fn aggregate_team_with(results: &[UtilizationResult], method: TeamRateMethod) -> TeamSummary {
    if results.is_empty() {
        return TeamSummary::default();
    }

    let member_count = results.len() as u64;
    let rate_sum: f64 = results.iter().map(|r| r.utilization_rate).sum();
    let mean_utilization_rate = rate_sum / results.len() as f64;

    let total_capacity_hours: f64 = results.iter().map(|r| r.period_capacity_hours).sum();
    let total_allocated_hours: f64 = results.iter().map(|r| r.total_allocated_hours).sum();

    let weighted_utilization_rate = ratio_pct(total_allocated_hours, total_capacity_hours);
    let (capacity_gap_hours, has_capacity_gap) =
        capacity_gap(total_capacity_hours, total_allocated_hours);

    TeamSummary {
        member_count,
        team_utilization_rate: match method {
            TeamRateMethod::Mean => mean_utilization_rate,
            TeamRateMethod::Weighted => weighted_utilization_rate,
        },
        mean_utilization_rate,
        weighted_utilization_rate,
        overloaded_count: results
            .iter()
            .filter(|r| r.utilization_rate > OVERLOAD_THRESHOLD)
            .count() as u64,
        underutilized_count: results
            .iter()
            .filter(|r| r.utilization_rate < UNDERUTILIZED_THRESHOLD)
            .count() as u64,
        total_capacity_hours,
        total_allocated_hours,
        capacity_gap_hours,
        has_capacity_gap,
        capacity_buffer_pct: ratio_pct(capacity_gap_hours, total_capacity_hours),
    }
}

/// Capacity gap from raw totals.
pub fn capacity_gap(total_capacity: f64, total_allocated: f64) -> (f64, bool) {
    let gap = total_capacity - total_allocated;
    (gap, gap < 0.0)
}

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && numerator.is_finite() {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::ResourceType;

    fn result(rate: f64, allocated: f64, capacity: f64) -> UtilizationResult {
        UtilizationResult {
            member_id: format!("m{rate}"),
            member_name: "x".into(),
            resource_type: ResourceType::Active,
            is_pending: false,
            utilization_rate: rate,
            total_allocated_hours: allocated,
            weekly_capacity: capacity,
            period_capacity_hours: capacity,
        }
    }

    #[test]
    fn test_rate_method_parse() {
        assert_eq!(TeamRateMethod::try_parse(" Weighted "), Some(TeamRateMethod::Weighted));
        assert_eq!(TeamRateMethod::try_parse("weigthed"), None);
        assert_eq!(TeamRateMethod::parse("weigthed"), TeamRateMethod::Mean);
    }

    #[test]
    fn test_empty_team_is_all_zero() {
        let s = aggregate_team(&[]);
        assert_eq!(s.team_utilization_rate, 0.0);
        assert_eq!(s.overloaded_count, 0);
        assert_eq!(s.capacity_gap_hours, 0.0);
        assert!(!s.team_utilization_rate.is_nan());
        assert!(!s.has_capacity_gap);
    }

    #[test]
    fn test_mean_of_three() {
        let s = aggregate_team(&[
            result(50.0, 20.0, 40.0),
            result(75.0, 30.0, 40.0),
            result(100.0, 40.0, 40.0),
        ]);
        assert_eq!(s.team_utilization_rate, 75.0);
        // 100 is not over 100
        assert_eq!(s.overloaded_count, 0);
        assert_eq!(s.member_count, 3);
    }

    #[test]
    fn test_mean_and_weighted_differ_for_mixed_capacity() {
        let results = [result(100.0, 40.0, 40.0), result(0.0, 0.0, 10.0)];
        let mean = aggregate_team_with(&results, TeamRateMethod::Mean);
        let weighted = aggregate_team_with(&results, TeamRateMethod::Weighted);
        assert_eq!(mean.team_utilization_rate, 50.0);
        assert_eq!(weighted.team_utilization_rate, 80.0);
        assert_eq!(mean.weighted_utilization_rate, 80.0);
    }

    #[test]
    fn test_over_commitment_gap() {
        let (gap, over) = capacity_gap(600.0, 650.0);
        assert_eq!(gap, -50.0);
        assert!(over);

        let s = aggregate_team(&[result(108.3, 650.0, 600.0)]);
        assert_eq!(s.capacity_gap_hours, -50.0);
        assert!(s.has_capacity_gap);
        assert_eq!(s.capacity_gap_display(), "50 hours over");
        assert_eq!(s.overloaded_count, 1);
    }

    #[test]
    fn test_available_gap_display_and_buffer() {
        let s = aggregate_team(&[result(75.0, 30.0, 40.0)]);
        assert_eq!(s.capacity_gap_display(), "10 hours available");
        assert_eq!(s.capacity_buffer_pct, 25.0);
        assert_eq!(s.underutilized_count, 0);
    }

    #[test]
    fn test_zero_capacity_team_has_zero_ratios() {
        let s = aggregate_team(&[result(0.0, 5.0, 0.0)]);
        assert_eq!(s.weighted_utilization_rate, 0.0);
        assert_eq!(s.capacity_buffer_pct, 0.0);
    }
}
