use serde::{Deserialize, Serialize};

use crate::date_util::strip_code_fences;
use crate::error::{Error, Result};
use crate::insights::{InsightCategory, InsightItem, InsightMetrics};
use crate::metrics::classify::Severity;
use crate::query::time_range::ResolvedRange;
use crate::storage::Database;

const PROMPT_VERSION: &str = "insights-v1";

/// Payload returned by the insight service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsightResponse {
    pub success: bool,
    #[serde(default)]
    pub insights: Vec<AiInsight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiInsight {
    pub title: String,
    pub description: String,
    pub priority: u8,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub metric: Option<String>,
}

impl AiInsight {
    fn into_item(self) -> InsightItem {
        let category = InsightCategory::parse(&self.category);
        let severity = match self.priority {
            0 | 1 => Severity::Danger,
            2 => Severity::Warning,
            _ => Severity::Info,
        };
        InsightItem {
            title: self.title,
            description: self.description,
            severity,
            category,
            icon: category_icon(category).to_string(),
            metric: self.metric,
            priority: self.priority,
        }
    }
}

fn category_icon(category: InsightCategory) -> &'static str {
    match category {
        InsightCategory::Utilization => "gauge",
        InsightCategory::ProjectLoad => "layers",
        InsightCategory::TeamScaling => "users",
        InsightCategory::Timing => "calendar",
        InsightCategory::CapacityBuffer => "shield",
        InsightCategory::Leave => "sun",
    }
}

/// Parse a service response into ranked items. A response with
/// `success: false` or no insights is an error.
pub fn parse_response(text: &str) -> Result<Vec<InsightItem>> {
    let json_str = strip_code_fences(text);
    let response: AiInsightResponse = serde_json::from_str(json_str)
        .map_err(|e| Error::Llm(format!("Failed to parse LLM response: {e}\nResponse: {text}")))?;
    if !response.success {
        return Err(Error::Llm("insight service reported failure".into()));
    }
    if response.insights.is_empty() {
        return Err(Error::Llm("insight service returned no insights".into()));
    }
    let mut items: Vec<InsightItem> = response
        .insights
        .into_iter()
        .map(AiInsight::into_item)
        .collect();
    items.sort_by_key(|i| i.priority);
    Ok(items)
}

/// Cache key for a window, suffixed with the office when scoped (`month@NYC`).
fn scope_key(range: &ResolvedRange, office: Option<&str>) -> String {
    match office {
        Some(code) => format!("{}@{}", range.range.to_key(), code.trim().to_uppercase()),
        None => range.range.to_key().to_string(),
    }
}

/// Ask the agent for insights on the given metrics. Results are cached per
/// company, range and office for a day unless `force` is set.
pub async fn generate_insights(
    db: &Database,
    agent: &mixtape_core::Agent,
    company_id: &str,
    range: &ResolvedRange,
    office: Option<&str>,
    metrics: &InsightMetrics,
    force: bool,
) -> Result<Vec<InsightItem>> {
    let range_key = range.range.to_key();
    let cache_key = scope_key(range, office);

    if !force {
        if let Some(cached) = get_cached(db, company_id, &cache_key).await? {
            log::debug!("using cached insights for {company_id}/{cache_key}");
            return parse_response(&cached);
        }
    }

    let metrics_json =
        serde_json::to_string_pretty(metrics).map_err(|e| Error::Other(e.to_string()))?;
    let scope = office
        .map(|code| format!(" in the {} office", code.trim().to_uppercase()))
        .unwrap_or_default();
    let prompt = format!(
        r#"You advise a resource manager on team staffing. Using these metrics{scope} for the last {range_key}
({} to {}), produce 3-5 actionable insights.

Metrics:
{metrics_json}

Utilization bands: >120% critical, 90-120% high, 70-90% optimal, 50-70% moderate, <50% low.

Respond with ONLY a JSON object (no markdown, no code fences):
{{
  "success": true,
  "insights": [
    {{
      "title": "Short headline",
      "description": "One or two sentences with a concrete recommendation",
      "priority": 1,
      "category": "utilization | project_load | team_scaling | timing | capacity_buffer | leave",
      "metric": "Optional short figure, or null"
    }}
  ]
}}
Priority 1 is most urgent."#,
        range.start, range.end
    );

    let response = agent.run(&prompt).await.map_err(|e| Error::Llm(e.to_string()))?;
    let text = response.text().trim().to_string();
    let items = parse_response(&text)?;

    store(db, company_id, &cache_key, strip_code_fences(&text)).await?;
    Ok(items)
}

async fn get_cached(db: &Database, company_id: &str, range_key: &str) -> Result<Option<String>> {
    let company_id = company_id.to_string();
    let range_key = range_key.to_string();
    db.reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT payload FROM ai_insight_cache
                 WHERE company_id = ?1 AND range_key = ?2 AND prompt_version = ?3
                   AND generated_at >= datetime('now', '-1 day')",
            )?;
            let result = stmt
                .query_row(rusqlite::params![company_id, range_key, PROMPT_VERSION], |row| {
                    row.get::<_, String>(0)
                })
                .ok();
            Ok::<Option<String>, rusqlite::Error>(result)
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))
}

async fn store(db: &Database, company_id: &str, range_key: &str, payload: &str) -> Result<()> {
    let company_id = company_id.to_string();
    let range_key = range_key.to_string();
    let payload = payload.to_string();
    db.writer()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO ai_insight_cache
                 (company_id, range_key, prompt_version, payload, generated_at)
                 VALUES (?1, ?2, ?3, ?4, datetime('now'))",
                rusqlite::params![company_id, range_key, PROMPT_VERSION, payload],
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .map_err(|e| Error::Database(e.to_string()))
}
