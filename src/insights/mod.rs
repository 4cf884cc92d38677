pub mod generators;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metrics::classify::Severity;
use crate::metrics::Dashboard;
use crate::storage::repository::Holiday;

/// Default number of insights shown on the dashboard.
pub const DEFAULT_INSIGHT_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Utilization,
    ProjectLoad,
    TeamScaling,
    Timing,
    CapacityBuffer,
    Leave,
}

impl InsightCategory {
    /// Lenient parse for categories returned by the AI service.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "project_load" | "projects" | "workload" => InsightCategory::ProjectLoad,
            "team_scaling" | "hiring" | "staffing" => InsightCategory::TeamScaling,
            "timing" | "time" | "planning" => InsightCategory::Timing,
            "capacity_buffer" | "capacity" => InsightCategory::CapacityBuffer,
            "leave" | "holidays" | "holiday" => InsightCategory::Leave,
            _ => InsightCategory::Utilization,
        }
    }
}

/// One advisory message. Lower `priority` sorts first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightItem {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: InsightCategory,
    pub icon: String,
    pub metric: Option<String>,
    pub priority: u8,
}

/// Inputs every generator reads. Built once per dashboard render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightMetrics {
    pub now: NaiveDate,
    pub utilization_rate: f64,
    pub team_size: u64,
    pub pending_count: u64,
    pub overloaded_count: u64,
    pub underutilized_count: u64,
    pub active_project_count: u64,
    pub capacity_buffer_pct: f64,
    pub upcoming_holidays: Vec<Holiday>,
}

impl InsightMetrics {
    pub fn from_dashboard(dashboard: &Dashboard, holidays: &[Holiday], now: NaiveDate) -> Self {
        Self {
            now,
            utilization_rate: dashboard.summary.team_utilization_rate,
            team_size: dashboard.summary.member_count,
            pending_count: dashboard.pending_count,
            overloaded_count: dashboard.summary.overloaded_count,
            underutilized_count: dashboard.summary.underutilized_count,
            active_project_count: dashboard.active_project_count,
            capacity_buffer_pct: dashboard.summary.capacity_buffer_pct,
            upcoming_holidays: holidays
                .iter()
                .filter(|h| h.end_date.unwrap_or(h.date) >= now)
                .cloned()
                .collect(),
        }
    }
}

/// Merge all generators, sort by priority, keep the top `DEFAULT_INSIGHT_LIMIT`.
pub fn aggregate_insights(metrics: &InsightMetrics) -> Vec<InsightItem> {
    aggregate_insights_top(metrics, DEFAULT_INSIGHT_LIMIT)
}

pub fn aggregate_insights_top(metrics: &InsightMetrics, limit: usize) -> Vec<InsightItem> {
    let mut items: Vec<InsightItem> = [
        generators::utilization_insights,
        generators::project_load_insights,
        generators::team_scaling_insights,
        generators::time_based_insights,
        generators::capacity_buffer_insights,
        generators::leave_insights,
    ]
    .iter()
    .flat_map(|generate| generate(metrics))
    .collect();

    // Stable: ties keep generator order.
    items.sort_by_key(|i| i.priority);
    items.truncate(limit);
    items
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn metrics(now: NaiveDate) -> InsightMetrics {
        InsightMetrics {
            now,
            utilization_rate: 75.0,
            team_size: 8,
            pending_count: 0,
            overloaded_count: 0,
            underutilized_count: 1,
            active_project_count: 12,
            capacity_buffer_pct: 25.0,
            upcoming_holidays: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::metrics;
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let mut m = metrics(day(2025, 3, 28));
        m.utilization_rate = 130.0;
        m.overloaded_count = 3;
        let first = aggregate_insights(&m);
        let second = aggregate_insights(&m);
        assert_eq!(first, second);
        assert_eq!(first.len(), DEFAULT_INSIGHT_LIMIT);
    }

    #[test]
    fn test_sorted_by_priority() {
        let mut m = metrics(day(2025, 3, 28));
        m.utilization_rate = 130.0;
        m.capacity_buffer_pct = -30.0;
        let items = aggregate_insights_top(&m, 10);
        assert!(items.len() > 3);
        assert!(items.windows(2).all(|w| w[0].priority <= w[1].priority));
        assert_eq!(items[0].severity, Severity::Danger);
    }

    #[test]
    fn test_limit_respected() {
        let m = metrics(day(2025, 3, 28));
        assert!(aggregate_insights_top(&m, 1).len() <= 1);
        assert!(aggregate_insights_top(&m, 0).is_empty());
    }

    #[test]
    fn test_empty_team_still_advises() {
        let mut m = metrics(day(2025, 3, 5));
        m.team_size = 0;
        m.utilization_rate = 0.0;
        m.active_project_count = 0;
        m.capacity_buffer_pct = 0.0;
        let items = aggregate_insights(&m);
        assert!(!items.is_empty());
        assert_eq!(items[0].title, "No Team Data");
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(InsightCategory::parse("Project Load"), InsightCategory::ProjectLoad);
        assert_eq!(InsightCategory::parse("hiring"), InsightCategory::TeamScaling);
        assert_eq!(InsightCategory::parse("holidays"), InsightCategory::Leave);
        assert_eq!(InsightCategory::parse("whatever"), InsightCategory::Utilization);
    }
}
