use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use sumika_core::mediation::{Classification, ClassifierError, MediationClassifier};
use sumika_core::session::Transcript;

use crate::llm::LlmClient;

const SYSTEM_PROMPT: &str = "\
You are the mediation boundary for a Japanese real-estate assistant. \
Classify the user's latest message into exactly one safety category and pick the target agent.

Categories:
- A (Information): public facts, property search, documents, renovation estimates, general questions. Routing: search, transaction, document, renovation, general_chat.
- B (Logistics): scheduling viewings and form logistics. Routing: viewing.
- C (Negotiation/Legal): price negotiation or discounts, contract-term interpretation, legal validity, clause drafting. Routing: handoff. Never answer these autonomously.

Routing hints: search/find/apartment -> search; view/book/see -> viewing; offer/contract/mortgage/loan -> transaction, \
but negotiation-of-terms language -> handoff; renovate/remodel/fix -> renovation; analyze/document/pdf -> document; greeting or unclear -> general_chat.

Reply with a single JSON object: {\"category\": \"A|B|C\", \"routing\": \"search|viewing|transaction|document|renovation|general_chat|handoff\", \"rationale\": \"short explanation\"}. No other text.";

#[derive(Deserialize)]
struct RawClassification {
    category: String,
    routing: String,
    rationale: String,
}

/// Strips markdown code fences some models wrap JSON replies in.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_fence = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_start())
        .unwrap_or(trimmed);
    without_fence.strip_suffix("```").map(str::trim_end).unwrap_or(without_fence)
}

fn parse_classification(raw: &str) -> Result<Classification, ClassifierError> {
    let parsed: RawClassification = serde_json::from_str(extract_json(raw))
        .map_err(|error| ClassifierError::MalformedOutput(error.to_string()))?;

    let category = parsed.category.parse().map_err(ClassifierError::MalformedOutput)?;
    let routing = parsed.routing.parse().map_err(ClassifierError::MalformedOutput)?;

    Ok(Classification { category, routing, rationale: parsed.rationale })
}

/// Model-backed mediation classifier. Every failure mode (transport,
/// timeout, unparseable output) maps into `ClassifierError`, so the
/// dispatcher's fail-closed path engages instead of a silent guess.
pub struct ModelClassifier {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
    max_retries: u32,
}

impl ModelClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration, max_retries: u32) -> Self {
        Self { llm, timeout, max_retries }
    }
}

#[async_trait]
impl MediationClassifier for ModelClassifier {
    async fn classify(&self, transcript: &Transcript) -> Result<Classification, ClassifierError> {
        let Some(latest) = transcript.last_user_message() else {
            return Err(ClassifierError::MalformedOutput("empty transcript".to_string()));
        };

        let mut last_error = ClassifierError::Unavailable("no attempts made".to_string());
        for attempt in 0..=self.max_retries {
            let call = self.llm.complete(SYSTEM_PROMPT, latest);
            match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(raw)) => return parse_classification(&raw),
                Ok(Err(call_error)) => {
                    warn!(
                        event_name = "classifier.call_failed",
                        attempt,
                        error = %call_error,
                        "classifier call failed"
                    );
                    last_error = ClassifierError::Unavailable(call_error.to_string());
                }
                Err(_elapsed) => {
                    warn!(
                        event_name = "classifier.call_timeout",
                        attempt,
                        timeout_secs = self.timeout.as_secs(),
                        "classifier call timed out"
                    );
                    last_error = ClassifierError::Timeout { timeout_secs: self.timeout.as_secs() };
                }
            }
        }
        Err(last_error)
    }
}
