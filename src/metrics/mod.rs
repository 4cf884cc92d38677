pub mod allocation;
pub mod capacity;
pub mod classify;
pub mod projects;
pub mod team;
pub mod types;
pub mod utilization;
pub mod workload;

pub use types::*;

use crate::error::Result;
use crate::members::Resource;
use crate::query::time_range::ResolvedRange;
use crate::settings::Settings;
use crate::storage::repository;
use crate::storage::Database;

use classify::{classify_capacity_buffer, classify_project_load, classify_utilization};
use utilization::{member_utilization, PendingPolicy};

/// How far ahead holidays are loaded for leave insights.
pub const HOLIDAY_LOOKAHEAD_DAYS: i64 = 30;

/// Fetch members, invites, projects, allocations and holidays concurrently,
/// then join them into one snapshot.
pub async fn load_snapshot(
    db: &Database,
    company_id: &str,
    range: &ResolvedRange,
    default_weekly_hours: f64,
) -> Result<Snapshot> {
    let reader = db.reader();
    let (start, end) = (range.start, range.end);
    let holiday_end = end + chrono::Duration::days(HOLIDAY_LOOKAHEAD_DAYS);

    let members = {
        let company_id = company_id.to_string();
        reader.call(move |conn| repository::list_profiles(conn, &company_id))
    };
    let pending = {
        let company_id = company_id.to_string();
        reader.call(move |conn| repository::list_pending_invites(conn, &company_id))
    };
    let projects = {
        let company_id = company_id.to_string();
        reader.call(move |conn| repository::list_projects(conn, &company_id))
    };
    let allocations = {
        let company_id = company_id.to_string();
        reader.call(move |conn| repository::list_allocations(conn, &company_id, start, end))
    };
    let holidays = {
        let company_id = company_id.to_string();
        reader.call(move |conn| repository::list_holidays(conn, &company_id, end, holiday_end))
    };

    let (members, pending, projects, allocations, holidays) =
        tokio::try_join!(members, pending, projects, allocations, holidays)?;

    log::debug!(
        "loaded snapshot for {company_id}: {} members, {} pending, {} projects, {} allocations",
        members.len(),
        pending.len(),
        projects.len(),
        allocations.len()
    );

    let resources = members
        .into_iter()
        .map(Resource::Active)
        .chain(pending.into_iter().map(Resource::Pending))
        .collect();

    Ok(Snapshot {
        resources,
        projects,
        allocations,
        holidays,
        default_weekly_hours,
        load_error: None,
    })
}

/// Run the pure part of the pipeline over a snapshot, optionally scoped to
/// one office.
pub fn compute_dashboard(
    company_id: &str,
    snapshot: &Snapshot,
    range: &ResolvedRange,
    settings: &Settings,
    office: Option<&str>,
) -> Dashboard {
    let scoped;
    let snapshot = match office {
        Some(code) => {
            scoped = snapshot.for_office(code);
            &scoped
        }
        None => snapshot,
    };
    let hours = allocation::hours_by_resource(&snapshot.allocations, range);

    let members: Vec<utilization::UtilizationResult> = snapshot
        .resources
        .iter()
        .map(|r| {
            let allocated = hours
                .get(&(r.id().to_string(), r.resource_type()))
                .copied()
                .unwrap_or(0.0);
            member_utilization(
                r,
                allocated,
                snapshot.default_weekly_hours,
                range.week_multiplier,
                settings.pending_policy,
            )
        })
        .collect();

    let rollup: Vec<utilization::UtilizationResult> = match settings.pending_policy {
        PendingPolicy::Include => members.clone(),
        PendingPolicy::Exclude => members.iter().filter(|m| !m.is_pending).cloned().collect(),
    };
    let summary = team::aggregate_team_with(&rollup, settings.team_rate);

    let active_project_count = projects::active_project_count(&snapshot.projects);
    let projects_per_person = if summary.member_count > 0 {
        active_project_count as f64 / summary.member_count as f64
    } else {
        0.0
    };

    let status = DashboardStatus {
        utilization: classify_utilization(summary.team_utilization_rate),
        project_load: classify_project_load(projects_per_person),
        capacity_buffer: classify_capacity_buffer(summary.capacity_buffer_pct, summary.member_count),
        projects_per_person,
    };

    Dashboard {
        company_id: company_id.to_string(),
        office: office.map(|o| o.trim().to_uppercase()),
        range: *range,
        projects_by_status: projects::by_status(&snapshot.projects, &snapshot.allocations, range),
        projects_by_location: projects::by_location(&snapshot.projects, &snapshot.allocations, range),
        members,
        summary,
        status,
        active_project_count,
        pending_count: snapshot.pending_count(),
        load_error: snapshot.load_error.clone(),
    }
}

/// Load and compute. A failed fetch is logged and yields an all-zero dashboard
/// carrying `load_error` rather than an error. The returned snapshot is the
/// office-scoped one the dashboard was built from.
pub async fn team_dashboard(
    db: &Database,
    range: &ResolvedRange,
    settings: &Settings,
    office: Option<&str>,
) -> (Dashboard, Snapshot) {
    let snapshot = load_snapshot_or_degraded(db, range, settings, office).await;
    let dashboard = compute_dashboard(&settings.company_id, &snapshot, range, settings, office);
    (dashboard, snapshot)
}

/// Fetch a snapshot, narrowed to `office` when given. A failed fetch is
/// logged and replaced by an empty snapshot carrying the error.
pub async fn load_snapshot_or_degraded(
    db: &Database,
    range: &ResolvedRange,
    settings: &Settings,
    office: Option<&str>,
) -> Snapshot {
    match load_snapshot(db, &settings.company_id, range, settings.default_weekly_hours).await {
        Ok(s) => match office {
            Some(code) => s.for_office(code),
            None => s,
        },
        Err(e) => {
            log::warn!("Failed to load team data for {}: {e}", settings.company_id);
            Snapshot::degraded(e.to_string(), settings.default_weekly_hours)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};

    use super::*;
    use crate::members::fixtures::{member, pending};
    use crate::members::ResourceType;
    use crate::query::time_range::TimeRange;
    use crate::storage::repository::{NewAllocation, Project};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded_db(now: NaiveDate) -> Database {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(move |conn| {
                repository::insert_profile(conn, &member("m1", "Ada", None))?;
                repository::insert_profile(conn, &member("m2", "Bo", Some(20.0)))?;
                repository::insert_invite(conn, &pending("i1", "Cy", None))?;
                repository::insert_project(
                    conn,
                    &Project {
                        id: "p1".into(),
                        company_id: "c1".into(),
                        code: Some("P-1".into()),
                        name: "Tower".into(),
                        status: "Active".into(),
                        stage: None,
                        location: Some("LDN".into()),
                        pm_id: None,
                    },
                )?;
                repository::insert_holiday(conn, "c1", now + chrono::Duration::days(5), None, "Bank Holiday", None)?;
                let base = NewAllocation {
                    company_id: "c1".into(),
                    project_id: "p1".into(),
                    resource_id: "m1".into(),
                    resource_type: ResourceType::Active,
                    allocation_date: now,
                    hours: 30.0,
                };
                repository::insert_allocation(conn, &base)?;
                repository::insert_allocation(
                    conn,
                    &NewAllocation { resource_id: "m2".into(), hours: 25.0, ..base.clone() },
                )?;
                repository::insert_allocation(
                    conn,
                    &NewAllocation {
                        resource_id: "i1".into(),
                        resource_type: ResourceType::PreRegistered,
                        hours: 20.0,
                        ..base.clone()
                    },
                )?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        db
    }

    fn settings() -> Settings {
        Settings {
            company_id: "c1".into(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_load_snapshot_joins_all_sources() {
        let now = day(2025, 3, 14);
        let db = seeded_db(now).await;
        let range = TimeRange::Week.resolve(now);
        let snap = load_snapshot(&db, "c1", &range, 40.0).await.unwrap();
        assert_eq!(snap.resources.len(), 3);
        assert_eq!(snap.pending_count(), 1);
        assert_eq!(snap.projects.len(), 1);
        assert_eq!(snap.allocations.len(), 3);
        assert_eq!(snap.holidays.len(), 1);
        assert!(snap.load_error.is_none());
    }

    #[tokio::test]
    async fn test_dashboard_per_member_rates() {
        let now = day(2025, 3, 14);
        let db = seeded_db(now).await;
        let range = TimeRange::Week.resolve(now);
        let (dash, _) = team_dashboard(&db, &range, &settings(), None).await;

        let rate = |id: &str| {
            dash.members
                .iter()
                .find(|m| m.member_id == id)
                .map(|m| m.utilization_rate)
                .unwrap()
        };
        assert_eq!(rate("m1"), 75.0);
        assert_eq!(rate("m2"), 125.0);
        assert_eq!(rate("i1"), 50.0);

        assert_eq!(dash.summary.member_count, 3);
        assert_eq!(dash.summary.team_utilization_rate, 250.0 / 3.0);
        assert_eq!(dash.summary.overloaded_count, 1);
        assert_eq!(dash.active_project_count, 1);
        assert_eq!(dash.pending_count, 1);
        assert_eq!(dash.status.utilization.label, "Optimal");
        assert_eq!(dash.projects_by_status[0].allocated_hours, 75.0);
    }

    #[tokio::test]
    async fn test_dashboard_excluding_pending() {
        let now = day(2025, 3, 14);
        let db = seeded_db(now).await;
        let range = TimeRange::Week.resolve(now);
        let s = Settings {
            pending_policy: PendingPolicy::Exclude,
            ..settings()
        };
        let (dash, _) = team_dashboard(&db, &range, &s, None).await;
        let cy = dash.members.iter().find(|m| m.member_id == "i1").unwrap();
        assert_eq!(cy.utilization_rate, 0.0);
        assert_eq!(dash.summary.member_count, 2);
        assert_eq!(dash.summary.team_utilization_rate, 100.0);
    }

    #[tokio::test]
    async fn test_other_company_sees_nothing() {
        let now = day(2025, 3, 14);
        let db = seeded_db(now).await;
        let range = TimeRange::Week.resolve(now);
        let s = Settings {
            company_id: "c2".into(),
            ..Settings::default()
        };
        let (dash, _) = team_dashboard(&db, &range, &s, None).await;
        assert!(dash.is_empty());
        assert_eq!(dash.summary.team_utilization_rate, 0.0);
    }

    #[test]
    fn test_degraded_snapshot_is_all_zero() {
        let range = TimeRange::Month.resolve(day(2025, 3, 14));
        let snap = Snapshot::degraded("connection refused", 40.0);
        let dash = compute_dashboard("c1", &snap, &range, &settings(), None);
        assert!(dash.is_empty());
        assert_eq!(dash.summary.team_utilization_rate, 0.0);
        assert_eq!(dash.summary.overloaded_count, 0);
        assert_eq!(dash.summary.capacity_gap_hours, 0.0);
        assert_eq!(dash.status.projects_per_person, 0.0);
        assert_eq!(dash.load_error.as_deref(), Some("connection refused"));
    }

    fn active(id: &str, capacity: f64, office: &str) -> Resource {
        let mut m = member(id, id, Some(capacity));
        m.location = Some(office.into());
        Resource::Active(m)
    }

    fn booking(resource_id: &str, date: NaiveDate, hours: f64) -> repository::Allocation {
        crate::metrics::allocation::fixtures::alloc(resource_id, ResourceType::Active, "p1", date, hours)
    }

    #[test]
    fn test_full_time_week_is_exactly_full() {
        // Fri 2025-03-14; 8h every weekday for the two weeks ending then
        let now = day(2025, 3, 14);
        let allocations = (0..14)
            .map(|i| day(2025, 3, 1) + chrono::Duration::days(i))
            .filter(|d| d.weekday().num_days_from_monday() < 5)
            .map(|d| booking("m1", d, 8.0))
            .collect();
        let snap = Snapshot {
            resources: vec![active("m1", 40.0, "NYC")],
            allocations,
            default_weekly_hours: 40.0,
            ..Default::default()
        };

        let range = TimeRange::Week.resolve(now);
        let dash = compute_dashboard("c1", &snap, &range, &settings(), None);
        assert_eq!(dash.members[0].total_allocated_hours, 40.0);
        assert_eq!(dash.members[0].utilization_rate, 100.0);
        assert_eq!(dash.summary.overloaded_count, 0);
        assert_eq!(dash.summary.capacity_gap_display(), "0 hours available");
    }

    #[test]
    fn test_office_scope_changes_summary() {
        let now = day(2025, 3, 14);
        let snap = Snapshot {
            resources: vec![
                active("ny1", 40.0, "NYC"),
                active("ny2", 40.0, "NYC"),
                active("ld1", 40.0, "LDN"),
            ],
            projects: vec![Project {
                id: "p1".into(),
                company_id: "c1".into(),
                code: None,
                name: "Pier".into(),
                status: "Active".into(),
                stage: None,
                location: Some("NYC".into()),
                pm_id: None,
            }],
            allocations: vec![
                booking("ny1", now, 40.0),
                booking("ny2", now, 20.0),
                booking("ld1", now, 10.0),
            ],
            default_weekly_hours: 40.0,
            ..Default::default()
        };
        let range = TimeRange::Week.resolve(now);

        let nyc = compute_dashboard("c1", &snap, &range, &settings(), Some("nyc"));
        assert_eq!(nyc.office.as_deref(), Some("NYC"));
        assert_eq!(nyc.summary.member_count, 2);
        assert_eq!(nyc.summary.team_utilization_rate, 75.0);
        assert_eq!(nyc.active_project_count, 1);

        let ldn = compute_dashboard("c1", &snap, &range, &settings(), Some("LDN"));
        assert_eq!(ldn.summary.member_count, 1);
        assert_eq!(ldn.summary.team_utilization_rate, 25.0);
        assert_eq!(ldn.active_project_count, 0);

        let all = compute_dashboard("c1", &snap, &range, &settings(), None);
        assert_eq!(all.summary.member_count, 3);
        assert!(all.office.is_none());
    }

    #[tokio::test]
    async fn test_team_dashboard_for_unknown_office_is_empty() {
        let now = day(2025, 3, 14);
        let db = seeded_db(now).await;
        let range = TimeRange::Week.resolve(now);
        let (dash, snap) = team_dashboard(&db, &range, &settings(), Some("SYD")).await;
        assert!(dash.is_empty());
        assert!(snap.resources.is_empty());
        // company-wide holidays still apply
        assert_eq!(snap.holidays.len(), 1);
    }
}
