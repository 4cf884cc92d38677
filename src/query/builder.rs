use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::Database;

/// A roster row: a registered member or a pending invite.
#[derive(Debug, Clone, Serialize)]
pub struct MemberRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub weekly_capacity: Option<f64>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub job_title: Option<String>,
    /// `None` for pending invites.
    pub role: Option<String>,
    pub is_pending: bool,
}

/// Sort keys accepted by [`MemberQuery::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberOrder {
    #[default]
    Name,
    Department,
    Location,
    Capacity,
}

impl MemberOrder {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(MemberOrder::Name),
            "department" => Ok(MemberOrder::Department),
            "location" | "office" => Ok(MemberOrder::Location),
            "capacity" => Ok(MemberOrder::Capacity),
            other => Err(Error::validation("order_by", format!("unknown sort key '{other}'"))),
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            MemberOrder::Name => "r.first_name, r.last_name",
            MemberOrder::Department => "r.department",
            MemberOrder::Location => "r.location",
            MemberOrder::Capacity => "r.weekly_capacity",
        }
    }
}

/// Builder for filtering the company roster. Pending invites are included
/// unless `include_pending(false)` is set.
#[derive(Debug, Clone)]
pub struct MemberQuery {
    company_id: String,
    department: Option<String>,
    location: Option<String>,
    role: Option<String>,
    search: Option<String>,
    include_pending: bool,
    limit: Option<u32>,
    order_by: MemberOrder,
    order_desc: bool,
}

impl MemberQuery {
    pub fn new(company_id: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            department: None,
            location: None,
            role: None,
            search: None,
            include_pending: true,
            limit: None,
            order_by: MemberOrder::default(),
            order_desc: false,
        }
    }

    pub fn department(mut self, name: &str) -> Self {
        self.department = Some(name.to_string());
        self
    }

    pub fn location(mut self, code: &str) -> Self {
        self.location = Some(code.to_string());
        self
    }

    /// Role filter. Pending invites carry no role, so this excludes them.
    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_lowercase());
        self
    }

    /// Case-insensitive substring match on full name or email.
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_string());
        self
    }

    pub fn include_pending(mut self, val: bool) -> Self {
        self.include_pending = val;
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn order_by(mut self, order: MemberOrder) -> Self {
        self.order_by = order;
        self
    }

    pub fn descending(mut self) -> Self {
        self.order_desc = true;
        self
    }

    /// Build and execute the query, returning roster rows.
    pub async fn rows(self, db: &Database) -> Result<Vec<MemberRow>> {
        let builder = self;
        db.reader()
            .call(move |conn| {
                let (sql, params) = builder.build_sql();
                let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(param_refs.as_slice(), |row| {
                    Ok(MemberRow {
                        id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        email: row.get(3)?,
                        weekly_capacity: row.get(4)?,
                        department: row.get(5)?,
                        location: row.get(6)?,
                        job_title: row.get(7)?,
                        role: row.get(8)?,
                        is_pending: row.get::<_, i32>(9)? != 0,
                    })
                })?;
                rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Build and execute the query, returning a count of matching rows.
    pub async fn count(self, db: &Database) -> Result<u64> {
        let builder = self;
        db.reader()
            .call(move |conn| {
                let (inner_sql, params) = builder.build_sql();
                let sql = format!("SELECT COUNT(*) FROM ({inner_sql})");
                let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();
                let count: i64 = conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?;
                Ok::<u64, rusqlite::Error>(count as u64)
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn to_json(self, db: &Database) -> Result<String> {
        let rows = self.rows(db).await?;
        serde_json::to_string_pretty(&rows).map_err(|e| Error::Other(e.to_string()))
    }

    pub async fn to_csv(self, db: &Database) -> Result<String> {
        let rows = self.rows(db).await?;
        let mut out = String::new();
        out.push_str("id,first_name,last_name,email,weekly_capacity,department,location,job_title,role,is_pending\n");
        for row in &rows {
            out.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                csv_escape(&row.id),
                csv_escape(&row.first_name),
                csv_escape(&row.last_name),
                csv_escape(row.email.as_deref().unwrap_or("")),
                row.weekly_capacity.map_or(String::new(), |c| c.to_string()),
                csv_escape(row.department.as_deref().unwrap_or("")),
                csv_escape(row.location.as_deref().unwrap_or("")),
                csv_escape(row.job_title.as_deref().unwrap_or("")),
                csv_escape(row.role.as_deref().unwrap_or("")),
                row.is_pending,
            ));
        }
        Ok(out)
    }

    fn build_sql(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut wheres = Vec::new();

        let members = "SELECT id, company_id, first_name, last_name, email, weekly_capacity,
                department, location, job_title, role, 0 AS is_pending
            FROM profiles";
        let invites = "SELECT id, company_id, first_name, last_name, email, weekly_capacity,
                department, location, job_title, NULL AS role, 1 AS is_pending
            FROM invites WHERE status = 'pending'";
        let source = if self.include_pending {
            format!("{members} UNION ALL {invites}")
        } else {
            members.to_string()
        };

        // Company scope is always the first parameter
        wheres.push("r.company_id = ?1".to_string());
        params.push(Box::new(self.company_id.clone()));
        let mut param_idx = 2;

        if let Some(ref dept) = self.department {
            wheres.push(format!("r.department = ?{param_idx}"));
            params.push(Box::new(dept.clone()));
            param_idx += 1;
        }

        if let Some(ref loc) = self.location {
            wheres.push(format!("r.location = ?{param_idx}"));
            params.push(Box::new(loc.clone()));
            param_idx += 1;
        }

        if let Some(ref role) = self.role {
            wheres.push(format!("r.role = ?{param_idx}"));
            params.push(Box::new(role.clone()));
            param_idx += 1;
        }

        if let Some(ref text) = self.search {
            wheres.push(format!(
                "(r.first_name || ' ' || r.last_name LIKE ?{param_idx} OR COALESCE(r.email, '') LIKE ?{param_idx})"
            ));
            params.push(Box::new(format!("%{}%", text.trim())));
            param_idx += 1;
        }

        let mut sql = format!(
            "SELECT r.id, r.first_name, r.last_name, r.email, r.weekly_capacity,
                r.department, r.location, r.job_title, r.role, r.is_pending
            FROM ({source}) r WHERE {}",
            wheres.join(" AND ")
        );

        let order_dir = if self.order_desc { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {order_dir}, r.id", self.order_by.sql()));

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT ?{param_idx}"));
            params.push(Box::new(limit));
        }

        (sql, params)
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::fixtures::{member, pending};
    use crate::storage::repository;

    #[test]
    fn test_build_sql_default() {
        let (sql, params) = MemberQuery::new("c1").build_sql();
        assert!(sql.contains("FROM profiles"));
        assert!(sql.contains("UNION ALL"));
        assert!(sql.contains("r.company_id = ?1"));
        assert!(sql.contains("ORDER BY r.first_name, r.last_name ASC"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_build_sql_with_filters() {
        let (sql, params) = MemberQuery::new("c1")
            .department("Design")
            .search("ada")
            .include_pending(false)
            .limit(10)
            .order_by(MemberOrder::Capacity)
            .descending()
            .build_sql();
        assert!(!sql.contains("UNION ALL"));
        assert!(sql.contains("r.department = ?2"));
        assert!(sql.contains("LIKE ?3"));
        assert!(sql.contains("ORDER BY r.weekly_capacity DESC"));
        assert!(sql.contains("LIMIT ?4"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_order_parse() {
        assert_eq!(MemberOrder::parse("Office").unwrap(), MemberOrder::Location);
        assert!(MemberOrder::parse("salary; DROP TABLE profiles").is_err());
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("hello"), "hello");
        assert_eq!(csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn test_rows_union_members_and_invites() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                repository::insert_profile(conn, &member("m1", "Ada", Some(32.0)))?;
                repository::insert_profile(conn, &member("m2", "Bo", None))?;
                repository::insert_invite(conn, &pending("i1", "Cy", None))?;
                let mut other = member("x1", "Zed", None);
                other.company_id = "c2".into();
                repository::insert_profile(conn, &other)?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let rows = MemberQuery::new("c1").rows(&db).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "i1"]);
        assert!(rows[2].is_pending);
        assert!(rows[2].role.is_none());

        assert_eq!(MemberQuery::new("c1").include_pending(false).count(&db).await.unwrap(), 2);
        assert_eq!(MemberQuery::new("c1").location("NYC").count(&db).await.unwrap(), 1);
        assert_eq!(MemberQuery::new("c1").role("member").count(&db).await.unwrap(), 2);

        let found = MemberQuery::new("c1").search("ADA").rows(&db).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "m1");

        let csv = MemberQuery::new("c1").limit(1).to_csv(&db).await.unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.lines().nth(1).unwrap().starts_with("m1,Ada,Test,ada@example.com,32,"));
    }
}
