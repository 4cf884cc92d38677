pub mod date_util;
pub mod error;
pub mod insights;
pub mod llm;
pub mod members;
pub mod metrics;
pub mod query;
pub mod settings;
pub mod storage;

pub use error::{Error, Result};
pub use insights::{InsightCategory, InsightItem, InsightMetrics};
pub use llm::InsightSource;
pub use members::{
    BulkReport, BulkStatus, InvitationType, MemberPatch, NewMember, PendingMember, Resource,
    ResourceType, Role, TeamMember,
};
pub use metrics::utilization::UtilizationResult;
pub use metrics::workload::WorkloadRow;
pub use metrics::{Dashboard, Snapshot};
pub use query::builder::{MemberOrder, MemberQuery};
pub use query::time_range::{ResolvedRange, TimeRange};
pub use settings::Settings;
pub use storage::Database;

// Re-export repository types needed by the binary crate, but not the module itself
pub use storage::repository::{Holiday, OfficeReference, Project};

use chrono::NaiveDate;
use serde::Serialize;

use members::validate::{validate_new_member, validate_patch};
use metrics::team::TeamRateMethod;
use metrics::utilization::PendingPolicy;
use storage::repository::{self, NewAllocation};
use storage::schema;

/// Insights plus the dashboard they were derived from.
#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub source: InsightSource,
    pub items: Vec<InsightItem>,
    pub dashboard: Dashboard,
}

/// Heat-map rows for one window.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub range: ResolvedRange,
    pub rows: Vec<WorkloadRow>,
    pub load_error: Option<String>,
}

/// Main entry point: one database, scoped to one company.
pub struct StaffGauge {
    db: Database,
    settings: Settings,
}

impl StaffGauge {
    pub fn new(db: Database, settings: Settings) -> Self {
        Self { db, settings }
    }

    /// Load settings from the database. `company` overrides the configured company.
    pub async fn open(db: Database, company: Option<&str>) -> Result<Self> {
        let settings = Settings::load(&db, company).await?;
        log::debug!("using company {}", settings.company_id);
        Ok(Self { db, settings })
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn company_id(&self) -> &str {
        &self.settings.company_id
    }

    // ── Dashboard ──────────────────────────────────────────────────

    pub async fn dashboard(&self, range: TimeRange, office: Option<&str>) -> Dashboard {
        self.dashboard_at(range, chrono::Local::now().date_naive(), office)
            .await
            .0
    }

    /// Dashboard for a window ending on `now`, optionally for one office.
    /// Fetch failures degrade to an empty dashboard with `load_error` set.
    pub async fn dashboard_at(
        &self,
        range: TimeRange,
        now: NaiveDate,
        office: Option<&str>,
    ) -> (Dashboard, Snapshot) {
        let resolved = range.resolve(now);
        metrics::team_dashboard(&self.db, &resolved, &self.settings, office).await
    }

    /// One person's utilization, summed straight from the allocation store.
    pub async fn member_utilization(&self, id: &str, range: TimeRange) -> Result<UtilizationResult> {
        self.member_utilization_at(id, range, chrono::Local::now().date_naive())
            .await
    }

    pub async fn member_utilization_at(
        &self,
        id: &str,
        range: TimeRange,
        now: NaiveDate,
    ) -> Result<UtilizationResult> {
        let resolved = range.resolve(now);
        let resource = self
            .db
            .reader()
            .call({
                let company_id = self.company_id().to_string();
                let id = id.to_string();
                move |conn| find_resource(conn, &company_id, &id)
            })
            .await?
            .ok_or_else(|| Error::NotFound(format!("member {id}")))?;
        let allocated = metrics::allocation::sum_allocated_hours(
            &self.db,
            self.company_id(),
            resource.id(),
            resource.resource_type(),
            &resolved,
        )
        .await?;
        Ok(metrics::utilization::member_utilization(
            &resource,
            allocated,
            self.settings.default_weekly_hours,
            resolved.week_multiplier,
            self.settings.pending_policy,
        ))
    }

    pub async fn insights(
        &self,
        range: TimeRange,
        office: Option<&str>,
        local_only: bool,
        force: bool,
    ) -> InsightReport {
        self.insights_at(range, chrono::Local::now().date_naive(), office, local_only, force)
            .await
    }

    pub async fn insights_at(
        &self,
        range: TimeRange,
        now: NaiveDate,
        office: Option<&str>,
        local_only: bool,
        force: bool,
    ) -> InsightReport {
        let resolved = range.resolve(now);
        let (dashboard, snapshot) =
            metrics::team_dashboard(&self.db, &resolved, &self.settings, office).await;
        let m = InsightMetrics::from_dashboard(&dashboard, &snapshot.holidays, now);
        let (items, source) = llm::insights_with_fallback(
            &self.db,
            &self.settings,
            &resolved,
            office,
            &m,
            local_only,
            force,
        )
        .await;
        InsightReport {
            source,
            items,
            dashboard,
        }
    }

    pub async fn workload(&self, range: TimeRange, office: Option<&str>) -> WorkloadReport {
        self.workload_at(range, chrono::Local::now().date_naive(), office)
            .await
    }

    /// Weekly heat map. Like the dashboard, a failed fetch yields no rows and
    /// sets `load_error`.
    pub async fn workload_at(
        &self,
        range: TimeRange,
        now: NaiveDate,
        office: Option<&str>,
    ) -> WorkloadReport {
        let resolved = range.resolve(now);
        let snapshot =
            metrics::load_snapshot_or_degraded(&self.db, &resolved, &self.settings, office).await;
        WorkloadReport {
            range: resolved,
            rows: metrics::workload::weekly_workload(
                &snapshot.resources,
                &snapshot.allocations,
                &resolved,
                snapshot.default_weekly_hours,
            ),
            load_error: snapshot.load_error,
        }
    }

    // ── Members ────────────────────────────────────────────────────

    /// Roster query scoped to this company.
    pub fn members(&self) -> MemberQuery {
        MemberQuery::new(self.company_id())
    }

    pub async fn add_member(&self, input: NewMember) -> Result<TeamMember> {
        validate_new_member(&input, false)?;
        let member = input.into_member(members::new_id(), self.company_id());
        self.db
            .writer()
            .call({
                let member = member.clone();
                move |conn| repository::insert_profile(conn, &member)
            })
            .await?;
        log::info!("added member {} ({})", member.id, self.company_id());
        Ok(member)
    }

    /// Email invites require an address; pre-registrations do not.
    pub async fn invite_member(
        &self,
        input: NewMember,
        invitation_type: InvitationType,
    ) -> Result<PendingMember> {
        validate_new_member(&input, invitation_type == InvitationType::EmailInvite)?;
        let pending = input.into_pending(members::new_id(), self.company_id(), invitation_type);
        self.db
            .writer()
            .call({
                let pending = pending.clone();
                move |conn| repository::insert_invite(conn, &pending)
            })
            .await?;
        log::info!(
            "created {} {} ({})",
            invitation_type.as_str(),
            pending.id,
            self.company_id()
        );
        Ok(pending)
    }

    /// Patch a member, or a pending invite with the same id.
    pub async fn edit_member(&self, id: &str, patch: MemberPatch) -> Result<()> {
        validate_patch(&patch)?;
        let updated = self
            .db
            .writer()
            .call({
                let company_id = self.company_id().to_string();
                let id = id.to_string();
                move |conn| {
                    if repository::update_profile(conn, &company_id, &id, &patch)? {
                        return Ok(true);
                    }
                    repository::update_invite(conn, &company_id, &id, &patch)
                }
            })
            .await?;
        if updated {
            Ok(())
        } else {
            Err(Error::NotFound(format!("member {id}")))
        }
    }

    pub async fn delete_member(&self, id: &str) -> Result<()> {
        let deleted = self
            .db
            .writer()
            .call({
                let company_id = self.company_id().to_string();
                let id = id.to_string();
                move |conn| repository::delete_profile(conn, &company_id, &id)
            })
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(Error::NotFound(format!("member {id}")))
        }
    }

    pub async fn cancel_invite(&self, id: &str) -> Result<()> {
        let deleted = self
            .db
            .writer()
            .call({
                let company_id = self.company_id().to_string();
                let id = id.to_string();
                move |conn| repository::delete_invite(conn, &company_id, &id)
            })
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(Error::NotFound(format!("invite {id}")))
        }
    }

    pub async fn bulk_delete(&self, ids: &[String]) -> Result<BulkReport> {
        members::bulk::delete_members(&self.db, self.company_id(), ids).await
    }

    pub async fn bulk_update(&self, ids: &[String], patch: &MemberPatch) -> Result<BulkReport> {
        members::bulk::update_members(&self.db, self.company_id(), ids, patch).await
    }

    /// Import a JSON roster as pre-registered invites.
    pub async fn import_roster(&self, json: &str) -> Result<BulkReport> {
        let rows = members::bulk::parse_roster(json)?;
        members::bulk::import_roster(&self.db, self.company_id(), rows).await
    }

    // ── Projects and allocations ───────────────────────────────────

    pub async fn add_project(&self, mut project: Project) -> Result<()> {
        if project.name.trim().is_empty() {
            return Err(Error::validation("name", "is required"));
        }
        project.company_id = self.company_id().to_string();
        self.db
            .writer()
            .call(move |conn| repository::insert_project(conn, &project))
            .await?;
        Ok(())
    }

    pub async fn projects(&self) -> Result<Vec<Project>> {
        let company_id = self.company_id().to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::list_projects(conn, &company_id))
            .await?)
    }

    /// Book hours for a member or pending invite. The row's `resource_type`
    /// is taken from whichever table the id is found in.
    pub async fn add_allocation(
        &self,
        project_id: &str,
        resource_id: &str,
        date: NaiveDate,
        hours: f64,
    ) -> Result<i64> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(Error::validation("hours", "must be zero or more"));
        }
        let company_id = self.company_id().to_string();
        let project_id = project_id.to_string();
        let resource_id = resource_id.to_string();
        let inserted = self
            .db
            .writer()
            .call(move |conn| {
                let Some(resource) = find_resource(conn, &company_id, &resource_id)? else {
                    return Ok(None);
                };
                let resource_type = resource.resource_type();
                let id = repository::insert_allocation(
                    conn,
                    &NewAllocation {
                        company_id,
                        project_id,
                        resource_id,
                        resource_type,
                        allocation_date: date,
                        hours,
                    },
                )?;
                Ok::<Option<i64>, rusqlite::Error>(Some(id))
            })
            .await?;
        inserted.ok_or_else(|| Error::NotFound("no member or pending invite with that id".into()))
    }

    // ── Holidays ───────────────────────────────────────────────────

    pub async fn add_holiday(
        &self,
        date: NaiveDate,
        end_date: Option<NaiveDate>,
        name: &str,
        location: Option<&str>,
    ) -> Result<i64> {
        if end_date.is_some_and(|end| end < date) {
            return Err(Error::validation("end_date", "is before the start date"));
        }
        let company_id = self.company_id().to_string();
        let name = name.to_string();
        let location = location.map(str::to_string);
        Ok(self
            .db
            .writer()
            .call(move |conn| {
                repository::insert_holiday(conn, &company_id, date, end_date, &name, location.as_deref())
            })
            .await?)
    }

    /// Holidays overlapping `[from, to]`.
    pub async fn holidays(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Holiday>> {
        let company_id = self.company_id().to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::list_holidays(conn, &company_id, from, to))
            .await?)
    }

    pub async fn remove_holiday(&self, id: i64) -> Result<bool> {
        let company_id = self.company_id().to_string();
        Ok(self
            .db
            .writer()
            .call(move |conn| repository::delete_holiday(conn, &company_id, id))
            .await?)
    }

    // ── Offices ────────────────────────────────────────────────────

    pub async fn add_location(&self, code: &str, city: &str, country: Option<&str>) -> Result<()> {
        let company_id = self.company_id().to_string();
        let code = code.trim().to_uppercase();
        let city = city.to_string();
        let country = country.map(str::to_string);
        self.db
            .writer()
            .call(move |conn| {
                repository::insert_location(conn, &company_id, &code, &city, country.as_deref())
            })
            .await?;
        Ok(())
    }

    pub async fn add_department(&self, name: &str) -> Result<()> {
        let company_id = self.company_id().to_string();
        let name = name.trim().to_string();
        self.db
            .writer()
            .call(move |conn| repository::insert_department(conn, &company_id, &name))
            .await?;
        Ok(())
    }

    pub async fn add_practice_area(&self, name: &str) -> Result<()> {
        let company_id = self.company_id().to_string();
        let name = name.trim().to_string();
        self.db
            .writer()
            .call(move |conn| repository::insert_practice_area(conn, &company_id, &name))
            .await?;
        Ok(())
    }

    pub async fn office_reference(&self) -> Result<OfficeReference> {
        let company_id = self.company_id().to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| repository::office_reference(conn, &company_id))
            .await?)
    }

    /// Set the company work week. Takes effect on the next [`StaffGauge::open`].
    pub async fn set_work_week_hours(&self, hours: f64) -> Result<()> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(Error::validation("work_week_hours", "must be greater than zero"));
        }
        let company_id = self.company_id().to_string();
        self.db
            .writer()
            .call(move |conn| repository::set_work_week_hours(conn, &company_id, hours))
            .await?;
        Ok(())
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        self.db
            .reader()
            .call({
                let key = key.to_string();
                move |conn| repository::get_config(conn, &key)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Set a config value. Enumerated keys reject values they don't recognize.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let known = match key {
            "pending_policy" => PendingPolicy::try_parse(value).is_some(),
            "team_rate" => TeamRateMethod::try_parse(value).is_some(),
            "insight_limit" => value.trim().parse::<usize>().is_ok_and(|n| n > 0),
            _ => true,
        };
        if !known {
            return Err(Error::validation(key, format!("unsupported value '{value}'")));
        }
        self.db
            .writer()
            .call({
                let key = key.to_string();
                let value = value.to_string();
                move |conn| repository::set_config(conn, &key, &value)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Row counts per table for this company.
    pub async fn status(&self) -> Result<Vec<(&'static str, i64)>> {
        let company_id = self.company_id().to_string();
        Ok(self
            .db
            .reader()
            .call(move |conn| schema::table_counts(conn, &company_id))
            .await?)
    }
}

/// A profile with this id, else a pending invite with it.
fn find_resource(
    conn: &rusqlite::Connection,
    company_id: &str,
    id: &str,
) -> std::result::Result<Option<Resource>, rusqlite::Error> {
    if let Some(member) = repository::get_profile(conn, company_id, id)? {
        return Ok(Some(Resource::Active(member)));
    }
    Ok(repository::list_pending_invites(conn, company_id)?
        .into_iter()
        .find(|p| p.id == id)
        .map(Resource::Pending))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn gauge() -> StaffGauge {
        let db = Database::open_memory().await.unwrap();
        StaffGauge::open(db, Some("acme")).await.unwrap()
    }

    fn project(id: &str) -> Project {
        Project {
            id: id.into(),
            company_id: String::new(),
            code: None,
            name: "Harbour Bridge".into(),
            status: "Active".into(),
            stage: None,
            location: Some("SYD".into()),
            pm_id: None,
        }
    }

    #[tokio::test]
    async fn test_member_lifecycle_feeds_dashboard() {
        let sg = gauge().await;
        let now = day(2025, 6, 11);

        let ada = sg
            .add_member(NewMember {
                first_name: "Ada".into(),
                weekly_capacity: Some(20.0),
                ..Default::default()
            })
            .await
            .unwrap();
        let bo = sg
            .invite_member(
                NewMember {
                    first_name: "Bo".into(),
                    ..Default::default()
                },
                InvitationType::PreRegistered,
            )
            .await
            .unwrap();
        sg.add_project(project("p1")).await.unwrap();
        sg.add_allocation("p1", &ada.id, now, 15.0).await.unwrap();
        sg.add_allocation("p1", &bo.id, now, 10.0).await.unwrap();

        let (dash, _) = sg.dashboard_at(TimeRange::Week, now, None).await;
        assert_eq!(dash.company_id, "acme");
        assert_eq!(dash.summary.member_count, 2);
        let rate = |id: &str| {
            dash.members
                .iter()
                .find(|m| m.member_id == id)
                .map(|m| m.utilization_rate)
                .unwrap()
        };
        assert_eq!(rate(&ada.id), 75.0);
        assert_eq!(rate(&bo.id), 25.0);
        assert_eq!(dash.pending_count, 1);
    }

    #[tokio::test]
    async fn test_allocation_requires_known_resource() {
        let sg = gauge().await;
        let err = sg.add_allocation("p1", "ghost", day(2025, 6, 11), 4.0).await;
        assert!(matches!(err, Err(Error::NotFound(_))));
        let err = sg.add_allocation("p1", "ghost", day(2025, 6, 11), -1.0).await;
        assert!(matches!(err, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_email_invite_requires_email() {
        let sg = gauge().await;
        let err = sg
            .invite_member(
                NewMember {
                    first_name: "Cy".into(),
                    ..Default::default()
                },
                InvitationType::EmailInvite,
            )
            .await;
        assert!(matches!(err, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_edit_delete_and_cancel() {
        let sg = gauge().await;
        let ada = sg
            .add_member(NewMember {
                first_name: "Ada".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        sg.edit_member(
            &ada.id,
            MemberPatch {
                department: Some("Structures".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let rows = sg.members().department("Structures").rows(sg.db()).await.unwrap();
        assert_eq!(rows.len(), 1);

        assert!(matches!(
            sg.edit_member("nobody", MemberPatch { job_title: Some("x".into()), ..Default::default() })
                .await,
            Err(Error::NotFound(_))
        ));
        sg.delete_member(&ada.id).await.unwrap();
        assert!(matches!(sg.delete_member(&ada.id).await, Err(Error::NotFound(_))));
        assert!(matches!(sg.cancel_invite("nope").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insights_fall_back_to_local() {
        let sg = gauge().await;
        let report = sg
            .insights_at(TimeRange::Month, day(2025, 3, 5), None, false, false)
            .await;
        assert_eq!(report.source, InsightSource::Local);
        assert_eq!(report.items[0].title, "No Team Data");
        assert!(report.dashboard.is_empty());
    }

    #[tokio::test]
    async fn test_holidays_and_status() {
        let sg = gauge().await;
        let id = sg
            .add_holiday(day(2025, 12, 25), Some(day(2025, 12, 26)), "Christmas", None)
            .await
            .unwrap();
        assert!(sg
            .add_holiday(day(2025, 12, 25), Some(day(2025, 12, 24)), "Bad", None)
            .await
            .is_err());
        let found = sg.holidays(day(2025, 12, 26), day(2026, 1, 1)).await.unwrap();
        assert_eq!(found.len(), 1);

        let counts = sg.status().await.unwrap();
        assert!(counts.contains(&("office_holidays", 1)));
        assert!(sg.remove_holiday(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_member_utilization_reads_store() {
        let sg = gauge().await;
        let now = day(2025, 6, 13);
        let ada = sg
            .add_member(NewMember {
                first_name: "Ada".into(),
                weekly_capacity: Some(40.0),
                ..Default::default()
            })
            .await
            .unwrap();
        sg.add_project(project("p1")).await.unwrap();
        for d in 9..=13 {
            sg.add_allocation("p1", &ada.id, day(2025, 6, d), 8.0).await.unwrap();
        }
        // outside the week window
        sg.add_allocation("p1", &ada.id, day(2025, 6, 6), 8.0).await.unwrap();

        let result = sg.member_utilization_at(&ada.id, TimeRange::Week, now).await.unwrap();
        assert_eq!(result.total_allocated_hours, 40.0);
        assert_eq!(result.utilization_rate, 100.0);

        let (dash, _) = sg.dashboard_at(TimeRange::Week, now, None).await;
        assert_eq!(dash.members[0], result);

        assert!(matches!(
            sg.member_utilization_at("ghost", TimeRange::Week, now).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_workload_degrades_on_fetch_failure() {
        let sg = gauge().await;
        let now = day(2025, 6, 13);
        sg.add_member(NewMember {
            first_name: "Ada".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        let ok = sg.workload_at(TimeRange::Week, now, None).await;
        assert_eq!(ok.rows.len(), 1);
        assert!(ok.load_error.is_none());

        sg.db()
            .writer()
            .call(|conn| conn.execute_batch("DROP TABLE project_resource_allocations;"))
            .await
            .unwrap();
        let report = sg.workload_at(TimeRange::Week, now, None).await;
        assert!(report.rows.is_empty());
        assert!(report.load_error.is_some());

        let (dash, _) = sg.dashboard_at(TimeRange::Week, now, None).await;
        assert!(dash.is_empty());
        assert!(dash.load_error.is_some());
    }

    #[tokio::test]
    async fn test_config_set_rejects_unknown_enum_values() {
        let sg = gauge().await;
        assert!(matches!(
            sg.config_set("team_rate", "weigthed").await,
            Err(Error::Validation { .. })
        ));
        assert!(sg.config_set("pending_policy", "maybe").await.is_err());
        assert!(sg.config_set("insight_limit", "0").await.is_err());
        assert_eq!(sg.config_get("team_rate").await.unwrap().as_deref(), Some("mean"));

        sg.config_set("team_rate", "weighted").await.unwrap();
        assert_eq!(sg.config_get("team_rate").await.unwrap().as_deref(), Some("weighted"));
    }
}
