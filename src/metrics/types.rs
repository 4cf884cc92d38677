use serde::Serialize;

use super::classify::Classification;
use super::projects::ProjectGroup;
use super::team::TeamSummary;
use super::utilization::UtilizationResult;
use crate::members::Resource;
use crate::query::time_range::ResolvedRange;
use crate::storage::repository::{Allocation, Holiday, Project};

/// Everything the pipeline reads for one company and one window.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub resources: Vec<Resource>,
    pub projects: Vec<Project>,
    pub allocations: Vec<Allocation>,
    pub holidays: Vec<Holiday>,
    pub default_weekly_hours: f64,
    /// Set when the fetch failed and this snapshot is the empty fallback.
    pub load_error: Option<String>,
}

impl Snapshot {
    /// Empty snapshot carrying the fetch error, so every aggregate degrades to 0.
    pub fn degraded(error: impl Into<String>, default_weekly_hours: f64) -> Self {
        Self {
            default_weekly_hours,
            load_error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn pending_count(&self) -> u64 {
        self.resources.iter().filter(|r| r.is_pending()).count() as u64
    }

    /// Narrow to one office: its people, their allocations, its projects, and
    /// holidays that are company-wide or local to it. Codes compare case-insensitively.
    pub fn for_office(&self, office: &str) -> Snapshot {
        let office = office.trim();
        let here = |loc: Option<&str>| loc.is_some_and(|l| l.trim().eq_ignore_ascii_case(office));

        let resources: Vec<Resource> = self
            .resources
            .iter()
            .filter(|r| here(r.location()))
            .cloned()
            .collect();
        let allocations = self
            .allocations
            .iter()
            .filter(|a| {
                resources
                    .iter()
                    .any(|r| r.id() == a.resource_id && r.resource_type() == a.resource_type)
            })
            .cloned()
            .collect();

        Snapshot {
            projects: self
                .projects
                .iter()
                .filter(|p| here(p.location.as_deref()))
                .cloned()
                .collect(),
            holidays: self
                .holidays
                .iter()
                .filter(|h| h.location.is_none() || here(h.location.as_deref()))
                .cloned()
                .collect(),
            resources,
            allocations,
            default_weekly_hours: self.default_weekly_hours,
            load_error: self.load_error.clone(),
        }
    }
}

/// Status badges derived from the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStatus {
    pub utilization: Classification,
    pub project_load: Classification,
    pub capacity_buffer: Classification,
    pub projects_per_person: f64,
}

/// Aggregated numbers for one window, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub company_id: String,
    /// Office code the dashboard is scoped to, if any.
    pub office: Option<String>,
    pub range: ResolvedRange,
    pub members: Vec<UtilizationResult>,
    pub summary: TeamSummary,
    pub status: DashboardStatus,
    pub active_project_count: u64,
    pub pending_count: u64,
    pub projects_by_status: Vec<ProjectGroup>,
    pub projects_by_location: Vec<ProjectGroup>,
    pub load_error: Option<String>,
}

impl Dashboard {
    /// True when there is nothing to chart.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
