use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use sumika_core::audit::ActionRecord;
use sumika_core::dispatch::{AgentError, AgentTurn, SpecializedAgent};
use sumika_core::domain::transaction::{ArtifactGenerator, ContractStatus, TransactionKind};
use sumika_core::mediation::RouteTarget;

use crate::extract::{first_price, format_jpy};

const ARTIFACT_DEGRADED_MESSAGE: &str =
    "I couldn't generate the paperwork just now. Nothing has been submitted; please try again in a moment.";

const MORTGAGE_AMOUNT_CLARIFICATION: &str =
    "To submit a mortgage pre-approval I need the loan amount. How much would you like to apply for?";

// A drafted offer with no stated figure starts from a placeholder the human
// reviewer adjusts before anything is sent.
const DEFAULT_OFFER_AMOUNT: i64 = 50_000_000;

const MORTGAGE_MARKERS: &[&str] = &["mortgage", "loan", "pre-approval", "preapproval", "住宅ローン"];
const REGISTRATION_MARKERS: &[&str] = &["registration", "register", "title", "登記"];

fn select_kind(text: &str) -> TransactionKind {
    let normalized = text.to_lowercase();
    if MORTGAGE_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        TransactionKind::MortgagePreapproval
    } else if REGISTRATION_MARKERS.iter().any(|marker| normalized.contains(marker)) {
        TransactionKind::TitleRegistration
    } else {
        TransactionKind::DraftOffer
    }
}

/// Internal three-way router over the transaction actions. Every completed
/// action produces a durable artifact and exactly one audit record, written
/// before the reply goes back to the user.
pub struct TransactionAgent {
    artifacts: Arc<dyn ArtifactGenerator>,
}

impl TransactionAgent {
    pub fn new(artifacts: Arc<dyn ArtifactGenerator>) -> Self {
        Self { artifacts }
    }
}

#[async_trait]
impl SpecializedAgent for TransactionAgent {
    fn route(&self) -> RouteTarget {
        RouteTarget::Transaction
    }

    async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
        let text = turn.latest_user_message().unwrap_or_default().to_string();
        let kind = select_kind(&text);
        let amount = first_price(&text);

        if kind == TransactionKind::MortgagePreapproval && amount.is_none() {
            turn.reply(MORTGAGE_AMOUNT_CLARIFICATION);
            return Ok(());
        }

        let amount = amount.unwrap_or(DEFAULT_OFFER_AMOUNT);
        let inputs = json!({
            "kind": kind.artifact_kind(),
            "amount": amount,
        });

        let artifact = match self.artifacts.generate(kind.artifact_kind(), &inputs).await {
            Ok(artifact) => artifact,
            Err(service_error) => {
                warn!(
                    event_name = "transaction.artifact_failed",
                    action_name = kind.action_name(),
                    error = %service_error,
                    "artifact generation failed; no action recorded"
                );
                turn.reply(ARTIFACT_DEGRADED_MESSAGE);
                return Ok(());
            }
        };

        let section = turn.transaction_section()?;
        match kind {
            TransactionKind::DraftOffer => {
                section.offer_amount = Some(amount);
                section.contract_status = Some(ContractStatus::Draft);
            }
            TransactionKind::MortgagePreapproval => {
                section.mortgage_amount = Some(amount);
            }
            TransactionKind::TitleRegistration => {}
        }

        let user_id = turn.user_id().to_string();
        turn.record_action(
            ActionRecord::new(user_id, kind.action_name(), kind.permission_level())
                .with_inputs(inputs)
                .with_outputs(json!({
                    "artifact_id": artifact.artifact_id,
                    "artifact_location": artifact.location,
                    "amount": amount,
                })),
        )
        .await?;

        let reply = match kind {
            TransactionKind::DraftOffer => format!(
                "I've drafted a purchase offer for {}. A licensed agent will review it before anything is sent. You can find the draft here: {} (reference {}).",
                format_jpy(amount),
                artifact.location,
                artifact.artifact_id
            ),
            TransactionKind::MortgagePreapproval => format!(
                "Your mortgage pre-approval application for {} has been prepared and queued for your approval. Application reference: {} ({}).",
                format_jpy(amount),
                artifact.artifact_id,
                artifact.location
            ),
            TransactionKind::TitleRegistration => format!(
                "I've submitted the title registration request. You can track it with reference {} ({}).",
                artifact.artifact_id, artifact.location
            ),
        };
        turn.reply(reply);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use sumika_core::audit::{ActionLog, ExecutionStatus, InMemoryActionLog, PermissionLevel};
    use sumika_core::collaborator::{ServiceError, ServiceKind};
    use sumika_core::dispatch::{AgentRegistry, TurnDispatcher};
    use sumika_core::domain::transaction::{ArtifactGenerator, ArtifactRef, TransactionKind};
    use sumika_core::mediation::KeywordClassifier;
    use sumika_core::session::{Channel, Language, SessionId, SessionState, UserId};

    use super::{select_kind, TransactionAgent, ARTIFACT_DEGRADED_MESSAGE};

    struct StubArtifacts;

    #[async_trait]
    impl ArtifactGenerator for StubArtifacts {
        async fn generate(&self, kind: &str, _payload: &Value) -> Result<ArtifactRef, ServiceError> {
            Ok(ArtifactRef {
                artifact_id: format!("{kind}-0001"),
                location: format!("documents/{kind}-0001.pdf"),
            })
        }
    }

    struct FailingArtifacts;

    #[async_trait]
    impl ArtifactGenerator for FailingArtifacts {
        async fn generate(&self, _kind: &str, _payload: &Value) -> Result<ArtifactRef, ServiceError> {
            Err(ServiceError::Timeout { service: ServiceKind::Pricing, timeout_secs: 5 })
        }
    }

    fn harness(
        artifacts: Arc<dyn ArtifactGenerator>,
    ) -> (TurnDispatcher, Arc<InMemoryActionLog>) {
        let audit = Arc::new(InMemoryActionLog::default());
        let dispatcher = TurnDispatcher::new(
            Arc::new(KeywordClassifier::new()),
            AgentRegistry::new().register(Arc::new(TransactionAgent::new(artifacts))),
            Arc::clone(&audit) as Arc<dyn ActionLog>,
        );
        (dispatcher, audit)
    }

    fn session() -> SessionState {
        SessionState::new(
            SessionId("thread-1".to_string()),
            UserId("user-1".to_string()),
            Channel::Web,
            Language::En,
        )
    }

    #[test]
    fn routes_message_content_to_one_action() {
        assert_eq!(
            select_kind("submit my mortgage application"),
            TransactionKind::MortgagePreapproval
        );
        assert_eq!(select_kind("request title registration"), TransactionKind::TitleRegistration);
        assert_eq!(select_kind("draft an offer for the condo"), TransactionKind::DraftOffer);
        assert_eq!(select_kind("I want to buy it"), TransactionKind::DraftOffer);
    }

    #[tokio::test]
    async fn mortgage_submission_logs_exactly_one_approval_gated_record() {
        let (dispatcher, audit) = harness(Arc::new(StubArtifacts));
        let mut state = session();
        let outcome = dispatcher
            .process_turn(&mut state, "submit my mortgage application for 60,000,000")
            .await;

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_name, "SUBMIT_MORTGAGE_PREAPPROVAL");
        assert_eq!(records[0].permission_level, PermissionLevel::UserApproval);
        assert_eq!(records[0].status, ExecutionStatus::PendingApproval);
        assert_eq!(records[0].inputs["amount"], 60_000_000);
        assert!(outcome.response_text.contains("¥60,000,000"));
        assert!(outcome.response_text.contains("mortgage-preapproval-0001"));
        assert_eq!(state.sections().transaction().mortgage_amount, Some(60_000_000));
    }

    #[tokio::test]
    async fn offer_draft_cites_artifact_and_sets_contract_status() {
        let (dispatcher, audit) = harness(Arc::new(StubArtifacts));
        let mut state = session();
        let outcome = dispatcher
            .process_turn(&mut state, "draft an offer of 55,000,000 for property P-9")
            .await;

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_name, "DRAFT_PURCHASE_OFFER");
        assert!(outcome.response_text.contains("documents/purchase-offer-0001.pdf"));
        assert_eq!(state.sections().transaction().offer_amount, Some(55_000_000));
        assert!(state.sections().transaction().contract_status.is_some());
    }

    #[tokio::test]
    async fn registration_request_is_autonomous_and_completed() {
        let (dispatcher, audit) = harness(Arc::new(StubArtifacts));
        let mut state = session();
        dispatcher.process_turn(&mut state, "request the title registration please").await;

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_name, "REQUEST_TITLE_REGISTRATION");
        assert_eq!(records[0].permission_level, PermissionLevel::Autonomous);
        assert_eq!(records[0].status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn mortgage_without_amount_asks_for_it_and_logs_nothing() {
        let (dispatcher, audit) = harness(Arc::new(StubArtifacts));
        let mut state = session();
        let outcome =
            dispatcher.process_turn(&mut state, "submit my mortgage application").await;

        assert!(outcome.response_text.contains("loan amount"));
        assert!(audit.records().is_empty());
    }

    #[tokio::test]
    async fn artifact_failure_degrades_and_logs_nothing() {
        let (dispatcher, audit) = harness(Arc::new(FailingArtifacts));
        let mut state = session();
        let outcome =
            dispatcher.process_turn(&mut state, "draft an offer for 55,000,000").await;

        assert_eq!(outcome.response_text, ARTIFACT_DEGRADED_MESSAGE);
        assert!(audit.records().is_empty());
    }
}
