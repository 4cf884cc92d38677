use std::collections::HashMap;

use crate::error::Result;
use crate::members::ResourceType;
use crate::query::time_range::ResolvedRange;
use crate::storage::repository::{self, Allocation};
use crate::storage::Database;

/// Sum allocated hours for one person from the store.
pub async fn sum_allocated_hours(
    db: &Database,
    company_id: &str,
    resource_id: &str,
    resource_type: ResourceType,
    range: &ResolvedRange,
) -> Result<f64> {
    let company_id = company_id.to_string();
    let resource_id = resource_id.to_string();
    let (start, end) = (range.start, range.end);
    let total = db
        .reader()
        .call(move |conn| {
            repository::sum_allocated_hours(conn, &company_id, &resource_id, resource_type, start, end)
        })
        .await?;
    Ok(total)
}

/// Hours per `(resource_id, resource_type)` within the range, in one pass.
/// Negative rows count as zero, matching the store sum.
pub fn hours_by_resource(
    rows: &[Allocation],
    range: &ResolvedRange,
) -> HashMap<(String, ResourceType), f64> {
    let mut totals: HashMap<(String, ResourceType), f64> = HashMap::new();
    for a in rows.iter().filter(|a| range.contains(a.allocation_date)) {
        *totals
            .entry((a.resource_id.clone(), a.resource_type))
            .or_default() += a.hours.max(0.0);
    }
    totals
}


#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::fixtures::alloc;
    use super::*;
    use crate::query::time_range::TimeRange;
    use crate::storage::repository::NewAllocation;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_hours_by_resource() {
        let range = TimeRange::Week.resolve(day(2025, 3, 15));
        let rows = vec![
            alloc("m1", ResourceType::Active, "p1", day(2025, 3, 10), 8.0),
            alloc("m1", ResourceType::Active, "p2", day(2025, 3, 11), 2.0),
            alloc("m1", ResourceType::PreRegistered, "p1", day(2025, 3, 10), 6.0),
        ];
        let totals = hours_by_resource(&rows, &range);
        assert_eq!(totals[&("m1".to_string(), ResourceType::Active)], 10.0);
        assert_eq!(totals[&("m1".to_string(), ResourceType::PreRegistered)], 6.0);
        assert_eq!(totals.len(), 2);
    }

    #[tokio::test]
    async fn test_store_sum_matches_in_memory_sum() {
        let db = Database::open_memory().await.unwrap();
        let now = day(2025, 3, 15);
        let bookings = [
            ("m1", ResourceType::Active, day(2025, 3, 10), 8.0),
            ("m1", ResourceType::Active, day(2025, 3, 11), -3.0),
            ("m1", ResourceType::Active, day(2025, 3, 15), 4.5),
            ("m1", ResourceType::Active, day(2025, 3, 8), 8.0),
            ("m1", ResourceType::PreRegistered, day(2025, 3, 12), 6.0),
            ("m2", ResourceType::Active, day(2025, 3, 12), 2.0),
        ];
        db.writer()
            .call(move |conn| {
                for (id, kind, date, hours) in bookings {
                    repository::insert_allocation(
                        conn,
                        &NewAllocation {
                            company_id: "c1".into(),
                            project_id: "p1".into(),
                            resource_id: id.into(),
                            resource_type: kind,
                            allocation_date: date,
                            hours,
                        },
                    )?;
                }
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let range = TimeRange::Week.resolve(now);
        let rows = db
            .reader()
            .call(move |conn| repository::list_allocations(conn, "c1", range.start, range.end))
            .await
            .unwrap();
        let in_memory = hours_by_resource(&rows, &range);

        for (id, kind) in [
            ("m1", ResourceType::Active),
            ("m1", ResourceType::PreRegistered),
            ("m2", ResourceType::Active),
        ] {
            let stored = sum_allocated_hours(&db, "c1", id, kind, &range).await.unwrap();
            assert_eq!(stored, in_memory[&(id.to_string(), kind)], "{id} {kind:?}");
        }
        assert_eq!(in_memory[&("m1".to_string(), ResourceType::Active)], 12.5);
    }

    #[tokio::test]
    async fn test_sum_allocated_hours_from_store() {
        let db = Database::open_memory().await.unwrap();
        let now = day(2025, 3, 15);
        db.writer()
            .call(move |conn| {
                repository::insert_allocation(
                    conn,
                    &NewAllocation {
                        company_id: "c1".into(),
                        project_id: "p1".into(),
                        resource_id: "m1".into(),
                        resource_type: ResourceType::Active,
                        allocation_date: now,
                        hours: 7.5,
                    },
                )
            })
            .await
            .unwrap();

        let range = TimeRange::Week.resolve(now);
        let total = sum_allocated_hours(&db, "c1", "m1", ResourceType::Active, &range)
            .await
            .unwrap();
        assert_eq!(total, 7.5);
        let other = sum_allocated_hours(&db, "c1", "m1", ResourceType::PreRegistered, &range)
            .await
            .unwrap();
        assert_eq!(other, 0.0);
    }
}
