pub mod agents;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::insights::{aggregate_insights_top, InsightItem, InsightMetrics};
use crate::query::time_range::ResolvedRange;
use crate::settings::Settings;
use crate::storage::repository;
use crate::storage::Database;

/// Where a set of insights came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSource {
    Ai,
    Local,
}

impl InsightSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightSource::Ai => "ai",
            InsightSource::Local => "local",
        }
    }
}

/// Insights from the AI service when enabled, otherwise (or on any failure)
/// from the local generators. Never fails; AI errors are logged.
pub async fn insights_with_fallback(
    db: &Database,
    settings: &Settings,
    range: &ResolvedRange,
    office: Option<&str>,
    metrics: &InsightMetrics,
    local_only: bool,
    force: bool,
) -> (Vec<InsightItem>, InsightSource) {
    let local = || {
        (
            aggregate_insights_top(metrics, settings.insight_limit),
            InsightSource::Local,
        )
    };
    if local_only || !settings.ai_insights_enabled {
        return local();
    }

    let result = async {
        let agent = create_agent(db).await?;
        agents::insights::generate_insights(
            db,
            &agent,
            &settings.company_id,
            range,
            office,
            metrics,
            force,
        )
        .await
    }
    .await;

    match result {
        Ok(mut items) => {
            items.truncate(settings.insight_limit);
            (items, InsightSource::Ai)
        }
        Err(e) => {
            log::warn!("AI insights unavailable, using local generators: {e}");
            local()
        }
    }
}

/// Create a mixtape Agent configured from the database's LLM settings.
pub async fn create_agent(db: &Database) -> Result<mixtape_core::Agent> {
    let (provider, model) = db
        .reader()
        .call(|conn| {
            let provider = repository::get_config(conn, "llm_provider")?;
            let model = repository::get_config(conn, "llm_model")?;
            Ok::<(Option<String>, Option<String>), rusqlite::Error>((provider, model))
        })
        .await?;

    let provider = provider.as_deref().unwrap_or("bedrock");
    let model_name = model.as_deref().unwrap_or("claude-sonnet-4-5");

    build_agent(provider, model_name).await
}

async fn build_agent(provider: &str, model_name: &str) -> Result<mixtape_core::Agent> {
    // Each combination needs its own builder call since the model types are different.
    match (provider, model_name) {
        ("bedrock", "claude-haiku-4-5" | "haiku") => mixtape_core::Agent::builder()
            .bedrock(mixtape_core::ClaudeHaiku4_5)
            .build()
            .await
            .map_err(|e| Error::Llm(e.to_string())),
        ("bedrock", _) => {
            // Default bedrock model
            mixtape_core::Agent::builder()
                .bedrock(mixtape_core::ClaudeSonnet4_5)
                .build()
                .await
                .map_err(|e| Error::Llm(e.to_string()))
        }
        ("anthropic", "claude-haiku-4-5" | "haiku") => mixtape_core::Agent::builder()
            .anthropic_from_env(mixtape_core::ClaudeHaiku4_5)
            .build()
            .await
            .map_err(|e| Error::Llm(e.to_string())),
        ("anthropic", _) => mixtape_core::Agent::builder()
            .anthropic_from_env(mixtape_core::ClaudeSonnet4_5)
            .build()
            .await
            .map_err(|e| Error::Llm(e.to_string())),
        (other, _) => Err(Error::Config(format!("unknown llm_provider: {other}"))),
    }
}
