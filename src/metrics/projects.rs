use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::query::time_range::ResolvedRange;
use crate::storage::repository::{Allocation, Project};

/// Normalized project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProjectStatus {
    Planning,
    Active,
    OnHold,
    Complete,
    Other,
}

impl ProjectStatus {
    /// "Active" and "In Progress" are the same bucket.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "planning" => ProjectStatus::Planning,
            "active" | "in progress" => ProjectStatus::Active,
            "on hold" => ProjectStatus::OnHold,
            "complete" | "completed" => ProjectStatus::Complete,
            _ => ProjectStatus::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "Planning",
            ProjectStatus::Active => "Active",
            ProjectStatus::OnHold => "On Hold",
            ProjectStatus::Complete => "Complete",
            ProjectStatus::Other => "Other",
        }
    }

    /// Counts toward project load.
    pub fn is_live(&self) -> bool {
        matches!(self, ProjectStatus::Planning | ProjectStatus::Active)
    }
}

/// One chart slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectGroup {
    pub key: String,
    pub project_count: u64,
    pub allocated_hours: f64,
}

pub fn active_project_count(projects: &[Project]) -> u64 {
    projects
        .iter()
        .filter(|p| ProjectStatus::parse(&p.status).is_live())
        .count() as u64
}

pub fn by_status(projects: &[Project], rows: &[Allocation], range: &ResolvedRange) -> Vec<ProjectGroup> {
    let mut groups: BTreeMap<ProjectStatus, (u64, f64)> = BTreeMap::new();
    group_into(projects, rows, range, |p| ProjectStatus::parse(&p.status), &mut groups);
    groups
        .into_iter()
        .map(|(status, (count, hours))| ProjectGroup {
            key: status.label().to_string(),
            project_count: count,
            allocated_hours: hours,
        })
        .collect()
}

/// Projects without a location fall under "Unassigned".
pub fn by_location(projects: &[Project], rows: &[Allocation], range: &ResolvedRange) -> Vec<ProjectGroup> {
    let mut groups: BTreeMap<String, (u64, f64)> = BTreeMap::new();
    group_into(
        projects,
        rows,
        range,
        |p| {
            p.location
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| "Unassigned".to_string())
        },
        &mut groups,
    );
    groups
        .into_iter()
        .map(|(key, (count, hours))| ProjectGroup {
            key,
            project_count: count,
            allocated_hours: hours,
        })
        .collect()
}

fn group_into<K: Ord>(
    projects: &[Project],
    rows: &[Allocation],
    range: &ResolvedRange,
    key_of: impl Fn(&Project) -> K,
    groups: &mut BTreeMap<K, (u64, f64)>,
) {
    let mut hours_by_project: HashMap<&str, f64> = HashMap::new();
    for a in rows.iter().filter(|a| range.contains(a.allocation_date)) {
        *hours_by_project.entry(a.project_id.as_str()).or_default() += a.hours.max(0.0);
    }
    for p in projects {
        let entry = groups.entry(key_of(p)).or_default();
        entry.0 += 1;
        entry.1 += hours_by_project.get(p.id.as_str()).copied().unwrap_or(0.0);
    }
}
