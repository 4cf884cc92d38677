use rusqlite::params;

/// Config keys seeded on open, with their default values.
pub const DEFAULT_CONFIG: [(&str, &str); 8] = [
    ("company_id", "default"),
    ("default_weekly_hours", "40"),
    ("pending_policy", "include"),
    ("team_rate", "mean"),
    ("insight_limit", "3"),
    ("ai_insights_enabled", "false"),
    ("llm_provider", "bedrock"),
    ("llm_model", "claude-sonnet-4-5"),
];

/// Tables reported by `status`, in display order.
pub const STATUS_TABLES: [&str; 6] = [
    "profiles",
    "invites",
    "projects",
    "project_resource_allocations",
    "office_holidays",
    "office_locations",
];

/// Insert any missing default config keys. Existing values are left alone.
pub fn ensure_default_config(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
    )?;
    for (key, value) in DEFAULT_CONFIG {
        stmt.execute(params![key, value])?;
    }
    Ok(())
}

/// Row counts for each of [`STATUS_TABLES`] scoped to a company.
pub fn table_counts(
    conn: &rusqlite::Connection,
    company_id: &str,
) -> Result<Vec<(&'static str, i64)>, rusqlite::Error> {
    STATUS_TABLES
        .iter()
        .map(|table| {
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE company_id = ?1");
            let n: i64 = conn.query_row(&sql, [company_id], |row| row.get(0))?;
            Ok((*table, n))
        })
        .collect()
}
