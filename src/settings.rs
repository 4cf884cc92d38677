use serde::Serialize;

use crate::error::Result;
use crate::metrics::capacity::company_default_hours;
use crate::metrics::team::TeamRateMethod;
use crate::metrics::utilization::PendingPolicy;
use crate::storage::repository;
use crate::storage::Database;

/// Pipeline knobs read from `app_config` and `office_settings`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub company_id: String,
    pub default_weekly_hours: f64,
    pub pending_policy: PendingPolicy,
    pub team_rate: TeamRateMethod,
    pub insight_limit: usize,
    pub ai_insights_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            company_id: "default".to_string(),
            default_weekly_hours: 40.0,
            pending_policy: PendingPolicy::Include,
            team_rate: TeamRateMethod::Mean,
            insight_limit: 3,
            ai_insights_enabled: false,
        }
    }
}

impl Settings {
    /// Load settings. `company_override` takes precedence over the configured `company_id`.
    pub async fn load(db: &Database, company_override: Option<&str>) -> Result<Self> {
        let company_override = company_override.map(str::to_string);
        let settings = db
            .reader()
            .call(move |conn| {
                let get = |key: &str| repository::get_config(conn, key);
                let company_id = match company_override {
                    Some(c) => c,
                    None => get("company_id")?.unwrap_or_else(|| "default".to_string()),
                };
                let office_hours = repository::get_work_week_hours(conn, &company_id)?;
                let configured_hours = get("default_weekly_hours")?;

                Ok::<Settings, rusqlite::Error>(Settings {
                    default_weekly_hours: company_default_hours(
                        office_hours,
                        configured_hours.as_deref(),
                    ),
                    pending_policy: get("pending_policy")?
                        .as_deref()
                        .map(PendingPolicy::parse)
                        .unwrap_or_default(),
                    team_rate: get("team_rate")?
                        .as_deref()
                        .map(TeamRateMethod::parse)
                        .unwrap_or_default(),
                    insight_limit: get("insight_limit")?
                        .and_then(|s| s.trim().parse::<usize>().ok())
                        .filter(|n| *n > 0)
                        .unwrap_or(3),
                    ai_insights_enabled: get("ai_insights_enabled")?
                        .map(|s| matches!(s.trim(), "true" | "1" | "yes"))
                        .unwrap_or(false),
                    company_id,
                })
            })
            .await?;
        Ok(settings)
    }
}
