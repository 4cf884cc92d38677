use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::capacity::resolve_capacity;
use crate::date_util::start_of_week;
use crate::members::Resource;
use crate::query::time_range::ResolvedRange;
use crate::storage::repository::Allocation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadCell {
    pub week_start: NaiveDate,
    pub hours: f64,
    /// Hours over weekly capacity, 0.0..; 1.0 is fully booked.
    pub intensity: f64,
}

/// One heat-map row per member, one cell per ISO week in the range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadRow {
    pub member_id: String,
    pub member_name: String,
    pub is_pending: bool,
    pub weekly_capacity: f64,
    pub weeks: Vec<WorkloadCell>,
}

/// Mondays from the week containing `range.start` to the week containing `range.end`.
pub fn week_starts(range: &ResolvedRange) -> Vec<NaiveDate> {
    let last = start_of_week(range.end);
    let mut d = start_of_week(range.start);
    let mut weeks = Vec::new();
    while d <= last {
        weeks.push(d);
        d += Duration::days(7);
    }
    weeks
}

/// Weekly hours per member built from allocation rows.
pub fn weekly_workload(
    resources: &[Resource],
    rows: &[Allocation],
    range: &ResolvedRange,
    company_default_hours: f64,
) -> Vec<WorkloadRow> {
    let weeks = week_starts(range);

    resources
        .iter()
        .map(|r| {
            let capacity = resolve_capacity(r, company_default_hours);
            let mut per_week: BTreeMap<NaiveDate, f64> =
                weeks.iter().map(|w| (*w, 0.0)).collect();
            for a in rows.iter().filter(|a| {
                a.resource_id == r.id()
                    && a.resource_type == r.resource_type()
                    && range.contains(a.allocation_date)
            }) {
                *per_week.entry(start_of_week(a.allocation_date)).or_default() += a.hours.max(0.0);
            }

            WorkloadRow {
                member_id: r.id().to_string(),
                member_name: r.display_name(),
                is_pending: r.is_pending(),
                weekly_capacity: capacity,
                weeks: per_week
                    .into_iter()
                    .map(|(week_start, hours)| WorkloadCell {
                        week_start,
                        hours,
                        intensity: if capacity > 0.0 { hours / capacity } else { 0.0 },
                    })
                    .collect(),
            }
        })
        .collect()
}
