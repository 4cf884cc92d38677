use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::date_util::date_key;
use crate::members::{
    InvitationType, MemberPatch, PendingMember, ResourceType, Role, TeamMember,
};

// ── Row types ──────────────────────────────────────────────────────

/// A project row. Used only as a grouping dimension here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub company_id: String,
    pub code: Option<String>,
    pub name: String,
    pub status: String,
    pub stage: Option<String>,
    pub location: Option<String>,
    pub pm_id: Option<String>,
}

/// Hours booked for one person on one project on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub id: i64,
    pub company_id: String,
    pub project_id: String,
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub allocation_date: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone)]
pub struct NewAllocation {
    pub company_id: String,
    pub project_id: String,
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub allocation_date: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holiday {
    pub id: i64,
    pub company_id: String,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficeLocation {
    pub id: i64,
    pub code: String,
    pub city: String,
    pub country: Option<String>,
}

/// Reference lists used to populate office/department/practice-area pickers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OfficeReference {
    pub locations: Vec<OfficeLocation>,
    pub departments: Vec<String>,
    pub practice_areas: Vec<String>,
}

// ── Profiles ───────────────────────────────────────────────────────

const PROFILE_COLUMNS: &str = "id, company_id, first_name, last_name, email, weekly_capacity,
    department, location, job_title, role, avatar_url";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<TeamMember> {
    let role: String = row.get(9)?;
    Ok(TeamMember {
        id: row.get(0)?,
        company_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        weekly_capacity: row.get(5)?,
        department: row.get(6)?,
        location: row.get(7)?,
        job_title: row.get(8)?,
        role: Role::parse(&role),
        avatar_url: row.get(10)?,
    })
}

pub fn insert_profile(conn: &Connection, member: &TeamMember) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO profiles (
            id, company_id, first_name, last_name, email, weekly_capacity,
            department, location, job_title, role, avatar_url, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, datetime('now'), datetime('now'))",
        params![
            member.id,
            member.company_id,
            member.first_name,
            member.last_name,
            member.email,
            member.weekly_capacity,
            member.department,
            member.location,
            member.job_title,
            member.role.as_str(),
            member.avatar_url,
        ],
    )?;
    set_user_role(conn, &member.company_id, &member.id, member.role)
}

pub fn get_profile(
    conn: &Connection,
    company_id: &str,
    id: &str,
) -> Result<Option<TeamMember>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE company_id = ?1 AND id = ?2"),
        params![company_id, id],
        profile_from_row,
    )
    .optional()
}

pub fn list_profiles(
    conn: &Connection,
    company_id: &str,
) -> Result<Vec<TeamMember>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE company_id = ?1
         ORDER BY first_name, last_name"
    ))?;
    let rows = stmt.query_map([company_id], profile_from_row)?;
    rows.collect()
}

/// Apply a patch. Returns false if no profile matched.
pub fn update_profile(
    conn: &Connection,
    company_id: &str,
    id: &str,
    patch: &MemberPatch,
) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE profiles SET
            first_name = COALESCE(?3, first_name),
            last_name = COALESCE(?4, last_name),
            weekly_capacity = COALESCE(?5, weekly_capacity),
            department = COALESCE(?6, department),
            location = COALESCE(?7, location),
            job_title = COALESCE(?8, job_title),
            role = COALESCE(?9, role),
            avatar_url = COALESCE(?10, avatar_url),
            updated_at = datetime('now')
         WHERE company_id = ?1 AND id = ?2",
        params![
            company_id,
            id,
            patch.first_name,
            patch.last_name,
            patch.weekly_capacity,
            patch.department,
            patch.location,
            patch.job_title,
            patch.role.map(|r| r.as_str()),
            patch.avatar_url,
        ],
    )?;
    if let (true, Some(role)) = (changed > 0, patch.role) {
        set_user_role(conn, company_id, id, role)?;
    }
    Ok(changed > 0)
}

pub fn delete_profile(conn: &Connection, company_id: &str, id: &str) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "DELETE FROM profiles WHERE company_id = ?1 AND id = ?2",
        params![company_id, id],
    )?;
    conn.execute(
        "DELETE FROM user_roles WHERE company_id = ?1 AND user_id = ?2",
        params![company_id, id],
    )?;
    Ok(changed > 0)
}

// ── Invites ────────────────────────────────────────────────────────

const INVITE_COLUMNS: &str = "id, company_id, first_name, last_name, email, weekly_capacity,
    department, location, job_title, invitation_type";

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<PendingMember> {
    let kind: String = row.get(9)?;
    Ok(PendingMember {
        id: row.get(0)?,
        company_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        weekly_capacity: row.get(5)?,
        department: row.get(6)?,
        location: row.get(7)?,
        job_title: row.get(8)?,
        invitation_type: InvitationType::parse(&kind).unwrap_or(InvitationType::PreRegistered),
    })
}

pub fn insert_invite(conn: &Connection, pending: &PendingMember) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO invites (
            id, company_id, email, first_name, last_name, weekly_capacity,
            department, location, job_title, invitation_type, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'pending', datetime('now'))",
        params![
            pending.id,
            pending.company_id,
            pending.email,
            pending.first_name,
            pending.last_name,
            pending.weekly_capacity,
            pending.department,
            pending.location,
            pending.job_title,
            pending.invitation_type.as_str(),
        ],
    )?;
    Ok(())
}

/// Invites still awaiting acceptance.
pub fn list_pending_invites(
    conn: &Connection,
    company_id: &str,
) -> Result<Vec<PendingMember>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {INVITE_COLUMNS} FROM invites WHERE company_id = ?1 AND status = 'pending'
         ORDER BY first_name, last_name"
    ))?;
    let rows = stmt.query_map([company_id], invite_from_row)?;
    rows.collect()
}

pub fn update_invite(
    conn: &Connection,
    company_id: &str,
    id: &str,
    patch: &MemberPatch,
) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE invites SET
            first_name = COALESCE(?3, first_name),
            last_name = COALESCE(?4, last_name),
            weekly_capacity = COALESCE(?5, weekly_capacity),
            department = COALESCE(?6, department),
            location = COALESCE(?7, location),
            job_title = COALESCE(?8, job_title)
         WHERE company_id = ?1 AND id = ?2 AND status = 'pending'",
        params![
            company_id,
            id,
            patch.first_name,
            patch.last_name,
            patch.weekly_capacity,
            patch.department,
            patch.location,
            patch.job_title,
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete_invite(conn: &Connection, company_id: &str, id: &str) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "DELETE FROM invites WHERE company_id = ?1 AND id = ?2",
        params![company_id, id],
    )?;
    Ok(changed > 0)
}

// ── Projects ───────────────────────────────────────────────────────

pub fn insert_project(conn: &Connection, project: &Project) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO projects (id, company_id, code, name, status, stage, location, pm_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
            code=excluded.code, name=excluded.name, status=excluded.status,
            stage=excluded.stage, location=excluded.location, pm_id=excluded.pm_id",
        params![
            project.id,
            project.company_id,
            project.code,
            project.name,
            project.status,
            project.stage,
            project.location,
            project.pm_id,
        ],
    )?;
    Ok(())
}

pub fn list_projects(conn: &Connection, company_id: &str) -> Result<Vec<Project>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, company_id, code, name, status, stage, location, pm_id
         FROM projects WHERE company_id = ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map([company_id], |row| {
        Ok(Project {
            id: row.get(0)?,
            company_id: row.get(1)?,
            code: row.get(2)?,
            name: row.get(3)?,
            status: row.get(4)?,
            stage: row.get(5)?,
            location: row.get(6)?,
            pm_id: row.get(7)?,
        })
    })?;
    rows.collect()
}

// ── Allocations ────────────────────────────────────────────────────

pub fn insert_allocation(conn: &Connection, alloc: &NewAllocation) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO project_resource_allocations
            (company_id, project_id, resource_id, resource_type, allocation_date, hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            alloc.company_id,
            alloc.project_id,
            alloc.resource_id,
            alloc.resource_type.as_str(),
            date_key(alloc.allocation_date),
            alloc.hours,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All allocation rows for a company with `start <= allocation_date <= end`.
pub fn list_allocations(
    conn: &Connection,
    company_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Allocation>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, company_id, project_id, resource_id, resource_type, allocation_date, hours
         FROM project_resource_allocations
         WHERE company_id = ?1 AND allocation_date >= ?2 AND allocation_date <= ?3
         ORDER BY allocation_date, id",
    )?;
    let rows = stmt.query_map(
        params![company_id, date_key(start), date_key(end)],
        |row| {
            let kind: String = row.get(4)?;
            let date: String = row.get(5)?;
            Ok(Allocation {
                id: row.get(0)?,
                company_id: row.get(1)?,
                project_id: row.get(2)?,
                resource_id: row.get(3)?,
                resource_type: ResourceType::parse(&kind).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "resource_type".into(),
                        rusqlite::types::Type::Text,
                    )
                })?,
                allocation_date: parse_date_col(&date, 5)?,
                hours: row.get(6)?,
            })
        },
    )?;
    rows.collect()
}

/// Sum of hours for one person. Filters on id, type and company together;
/// negative rows count as zero.
pub fn sum_allocated_hours(
    conn: &Connection,
    company_id: &str,
    resource_id: &str,
    resource_type: ResourceType,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<f64, rusqlite::Error> {
    conn.query_row(
        "SELECT COALESCE(SUM(MAX(hours, 0.0)), 0.0) FROM project_resource_allocations
         WHERE company_id = ?1 AND resource_id = ?2 AND resource_type = ?3
           AND allocation_date >= ?4 AND allocation_date <= ?5",
        params![
            company_id,
            resource_id,
            resource_type.as_str(),
            date_key(start),
            date_key(end),
        ],
        |row| row.get(0),
    )
}

// ── Holidays ───────────────────────────────────────────────────────

pub fn insert_holiday(
    conn: &Connection,
    company_id: &str,
    date: NaiveDate,
    end_date: Option<NaiveDate>,
    name: &str,
    location: Option<&str>,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO office_holidays (company_id, holiday_date, end_date, name, location)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![company_id, date_key(date), end_date.map(date_key), name, location],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Holidays overlapping `[from, to]`, earliest first.
pub fn list_holidays(
    conn: &Connection,
    company_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Holiday>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, company_id, holiday_date, end_date, name, location
         FROM office_holidays
         WHERE company_id = ?1
           AND holiday_date <= ?3
           AND COALESCE(end_date, holiday_date) >= ?2
         ORDER BY holiday_date, id",
    )?;
    let rows = stmt.query_map(params![company_id, date_key(from), date_key(to)], |row| {
        let date: String = row.get(2)?;
        let end: Option<String> = row.get(3)?;
        Ok(Holiday {
            id: row.get(0)?,
            company_id: row.get(1)?,
            date: parse_date_col(&date, 2)?,
            end_date: end.as_deref().map(|e| parse_date_col(e, 3)).transpose()?,
            name: row.get(4)?,
            location: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn delete_holiday(conn: &Connection, company_id: &str, id: i64) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        "DELETE FROM office_holidays WHERE company_id = ?1 AND id = ?2",
        params![company_id, id],
    )?;
    Ok(changed > 0)
}

// ── Offices ────────────────────────────────────────────────────────

pub fn insert_location(
    conn: &Connection,
    company_id: &str,
    code: &str,
    city: &str,
    country: Option<&str>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO office_locations (company_id, code, city, country) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(company_id, code) DO UPDATE SET city=excluded.city, country=excluded.country",
        params![company_id, code, city, country],
    )?;
    Ok(())
}

pub fn insert_department(conn: &Connection, company_id: &str, name: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO office_departments (company_id, name) VALUES (?1, ?2)",
        params![company_id, name],
    )?;
    Ok(())
}

pub fn insert_practice_area(conn: &Connection, company_id: &str, name: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO office_practice_areas (company_id, name) VALUES (?1, ?2)",
        params![company_id, name],
    )?;
    Ok(())
}

pub fn office_reference(conn: &Connection, company_id: &str) -> Result<OfficeReference, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, code, city, country FROM office_locations WHERE company_id = ?1 ORDER BY code",
    )?;
    let locations = stmt
        .query_map([company_id], |row| {
            Ok(OfficeLocation {
                id: row.get(0)?,
                code: row.get(1)?,
                city: row.get(2)?,
                country: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let names = |table: &str| -> Result<Vec<String>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!(
            "SELECT name FROM {table} WHERE company_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map([company_id], |row| row.get(0))?;
        rows.collect()
    };

    Ok(OfficeReference {
        locations,
        departments: names("office_departments")?,
        practice_areas: names("office_practice_areas")?,
    })
}

// ── User roles ─────────────────────────────────────────────────────

/// Profiles keep their role in `user_roles` as well; insert, update and
/// delete of a profile keep the two in step.
pub fn set_user_role(conn: &Connection, company_id: &str, user_id: &str, role: Role) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO user_roles (user_id, company_id, role) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, company_id) DO UPDATE SET role=excluded.role",
        params![user_id, company_id, role.as_str()],
    )?;
    Ok(())
}

// ── Office settings ────────────────────────────────────────────────

pub fn get_work_week_hours(conn: &Connection, company_id: &str) -> Result<Option<f64>, rusqlite::Error> {
    conn.query_row(
        "SELECT work_week_hours FROM office_settings WHERE company_id = ?1",
        [company_id],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_work_week_hours(conn: &Connection, company_id: &str, hours: f64) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO office_settings (company_id, work_week_hours, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(company_id) DO UPDATE SET
            work_week_hours=excluded.work_week_hours, updated_at=excluded.updated_at",
        params![company_id, hours],
    )?;
    Ok(())
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Helpers ────────────────────────────────────────────────────────

fn parse_date_col(s: &str, idx: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}
