use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use sumika_core::audit::{ActionRecord, PermissionLevel};
use sumika_core::dispatch::{AgentError, AgentTurn, SpecializedAgent};
use sumika_core::domain::renovation::{
    fallback_estimate, QualityTier, RenovationPricer, RenovationRequest, RenovationScope,
};
use sumika_core::domain::transaction::ArtifactGenerator;
use sumika_core::mediation::RouteTarget;

use crate::extract::format_jpy;

const ACTION_NAME: &str = "GENERATE_RENOVATION_QUOTE";

// Quote assumption until the property's real floor area is on file: a
// standard 65m² 2LDK in Tokyo.
const DEFAULT_AREA_SQM: f64 = 65.0;
const DEFAULT_REGION: &str = "tokyo";

const HIGH_END_MARKERS: &[&str] = &["luxury", "high end", "high-end", "best", "ハイグレード", "高級"];

fn infer_scope(normalized: &str) -> RenovationScope {
    if normalized.contains("kitchen") || normalized.contains("キッチン") {
        RenovationScope::Kitchen
    } else if normalized.contains("bath") || normalized.contains("風呂") || normalized.contains("浴室")
    {
        RenovationScope::Bath
    } else if normalized.contains("wallpaper")
        || normalized.contains("floor")
        || normalized.contains("壁紙")
        || normalized.contains("床")
    {
        RenovationScope::WallpaperFlooring
    } else {
        RenovationScope::Full
    }
}

fn infer_quality(normalized: &str) -> QualityTier {
    if HIGH_END_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        QualityTier::HighEnd
    } else {
        QualityTier::Standard
    }
}

/// Renovation pipeline: infer scope and quality from the message, price the
/// work (falling back to the local estimate so the turn never fails), emit a
/// quote artifact and one autonomous audit record, then answer with cost,
/// duration, and the artifact reference.
pub struct RenovationAgent {
    pricer: Arc<dyn RenovationPricer>,
    artifacts: Arc<dyn ArtifactGenerator>,
}

impl RenovationAgent {
    pub fn new(pricer: Arc<dyn RenovationPricer>, artifacts: Arc<dyn ArtifactGenerator>) -> Self {
        Self { pricer, artifacts }
    }
}

#[async_trait]
impl SpecializedAgent for RenovationAgent {
    fn route(&self) -> RouteTarget {
        RouteTarget::Renovation
    }

    async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
        let text = turn.latest_user_message().unwrap_or_default().to_lowercase();
        let request = RenovationRequest {
            total_area_sqm: DEFAULT_AREA_SQM,
            scope: infer_scope(&text),
            quality: infer_quality(&text),
            region: DEFAULT_REGION.to_string(),
        };

        let estimate = match self.pricer.estimate(&request).await {
            Ok(estimate) => estimate,
            Err(service_error) => {
                warn!(
                    event_name = "renovation.pricer_unavailable",
                    error = %service_error,
                    "pricing service call failed; using local fallback estimate"
                );
                fallback_estimate(&request)
            }
        };

        let section = turn.renovation_section()?;
        section.scope = Some(request.scope);
        section.quality = Some(request.quality);
        section.estimate = Some(estimate.clone());

        let inputs = json!({
            "scope": request.scope.as_str(),
            "quality": request.quality.as_str(),
            "total_area_sqm": request.total_area_sqm,
        });

        let artifact = match self
            .artifacts
            .generate("renovation-quote", &json!({"estimate": &estimate, "request": &inputs}))
            .await
        {
            Ok(artifact) => Some(artifact),
            Err(service_error) => {
                warn!(
                    event_name = "renovation.artifact_failed",
                    error = %service_error,
                    "quote artifact generation failed; replying with the estimate only"
                );
                None
            }
        };

        if let Some(artifact) = &artifact {
            let user_id = turn.user_id().to_string();
            turn.record_action(
                ActionRecord::new(user_id, ACTION_NAME, PermissionLevel::Autonomous)
                    .with_inputs(inputs)
                    .with_outputs(json!({
                        "artifact_location": artifact.location,
                        "cost": estimate.estimated_cost,
                    })),
            )
            .await?;
        }

        let mut reply = format!(
            "I have calculated a renovation estimate for a {} grade {} renovation.\n\n**Estimated cost**: {}\n**Duration**: {} weeks",
            request.quality.as_str(),
            request.scope.as_str(),
            format_jpy(estimate.estimated_cost),
            estimate.duration_weeks
        );
        match &artifact {
            Some(artifact) => reply.push_str(&format!(
                "\n\nYou can download the detailed quote here: {}",
                artifact.location
            )),
            None => reply.push_str(
                "\n\nThe printable quote couldn't be generated right now; the figures above are still valid.",
            ),
        }
        turn.reply(reply);
        Ok(())
    }
}
