use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, warn};

use crate::audit::{ActionLog, ActionRecord};
use crate::mediation::{MediationClassifier, RouteTarget};
use crate::session::{
    DocumentSection, RenovationSection, SearchSection, SessionId, SessionState,
    TransactionSection, ViewingSection,
};

pub const HANDOFF_MESSAGE: &str = "I apologize, but I cannot assist with negotiations, legal advice, or contract term interpretations directly. I have forwarded your request to a licensed human agent who will contact you shortly.";

pub const GENERAL_CHAT_MESSAGE: &str = "I can help you search for properties, book viewings, analyze documents, or estimate renovation costs. What would you like to do?";

pub const CLASSIFIER_DOWN_MESSAGE: &str = "I'm unable to process your request right now. I have forwarded it to a human agent who will follow up with you shortly.";

pub const AGENT_DEGRADED_MESSAGE: &str = "Part of our service is temporarily unavailable, so I could not complete that request. Please try again in a moment.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("the {requested:?} section is not accessible from the {active:?} branch")]
    SectionAccess { active: RouteTarget, requested: RouteTarget },
    #[error("an action was already recorded for this turn: {0}")]
    ActionAlreadyRecorded(String),
}

/// Capability handed to the single agent a turn routes to. It lends out the
/// agent's own session section, an append-only reply channel, and a
/// single-shot action recorder; nothing else about the session is writable.
pub struct AgentTurn<'a> {
    route: RouteTarget,
    session: &'a mut SessionState,
    audit: &'a dyn ActionLog,
}

impl<'a> AgentTurn<'a> {
    pub(crate) fn new(
        route: RouteTarget,
        session: &'a mut SessionState,
        audit: &'a dyn ActionLog,
    ) -> Self {
        Self { route, session, audit }
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id.0
    }

    pub fn latest_user_message(&self) -> Option<&str> {
        self.session.transcript().last_user_message()
    }

    pub fn reply(&mut self, content: impl Into<String>) {
        self.session.transcript_mut().push_assistant(content);
    }

    fn guard(&self, requested: RouteTarget) -> Result<(), AgentError> {
        if self.route == requested {
            Ok(())
        } else {
            Err(AgentError::SectionAccess { active: self.route, requested })
        }
    }

    pub fn search_section(&mut self) -> Result<&mut SearchSection, AgentError> {
        self.guard(RouteTarget::Search)?;
        Ok(&mut self.session.sections_mut().search)
    }

    pub fn viewing_section(&mut self) -> Result<&mut ViewingSection, AgentError> {
        self.guard(RouteTarget::Viewing)?;
        Ok(&mut self.session.sections_mut().viewing)
    }

    pub fn transaction_section(&mut self) -> Result<&mut TransactionSection, AgentError> {
        self.guard(RouteTarget::Transaction)?;
        Ok(&mut self.session.sections_mut().transaction)
    }

    pub fn document_section(&mut self) -> Result<&mut DocumentSection, AgentError> {
        self.guard(RouteTarget::Document)?;
        Ok(&mut self.session.sections_mut().document)
    }

    pub fn renovation_section(&mut self) -> Result<&mut RenovationSection, AgentError> {
        self.guard(RouteTarget::Renovation)?;
        Ok(&mut self.session.sections_mut().renovation)
    }

    /// Records the turn's one consequential action. The ledger write is
    /// awaited before this returns, so the caller's reply cannot reach the
    /// user before the write has been attempted. A write failure is reported
    /// loudly but does not undo the already-performed domain action.
    pub async fn record_action(&mut self, record: ActionRecord) -> Result<(), AgentError> {
        if self.session.action_slot().is_occupied() {
            return Err(AgentError::ActionAlreadyRecorded(record.action_name));
        }
        let action_name = record.action_name.clone();
        let outputs = record.outputs.clone();
        self.session.action_slot_mut().begin(action_name.clone());

        if let Err(write_error) = self.audit.append(record).await {
            error!(
                event_name = "audit.write_failed",
                action_name = %action_name,
                user_id = %self.session.user_id.0,
                error = %write_error,
                "audit log write failed; response proceeds with degraded compliance"
            );
        }

        self.session.action_slot_mut().complete(outputs);
        Ok(())
    }
}

/// A specialized turn handler. Each implementation owns exactly one route
/// and appends at least one assistant message when it handles a turn.
#[async_trait]
pub trait SpecializedAgent: Send + Sync {
    fn route(&self) -> RouteTarget;
    async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError>;
}

/// Route→agent table as data: registering an agent is one entry, and the
/// dispatcher never grows per-agent branching.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<RouteTarget, Arc<dyn SpecializedAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, agent: Arc<dyn SpecializedAgent>) -> Self {
        self.agents.insert(agent.route(), agent);
        self
    }

    pub fn get(&self, route: RouteTarget) -> Option<&Arc<dyn SpecializedAgent>> {
        self.agents.get(&route)
    }

    pub fn routes(&self) -> impl Iterator<Item = RouteTarget> + '_ {
        self.agents.keys().copied()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub response_text: String,
    pub escalation_flag: bool,
}

/// The single-hop turn state machine:
/// `start → classifying → routing → {branch} → done`.
pub struct TurnDispatcher {
    classifier: Arc<dyn MediationClassifier>,
    registry: AgentRegistry,
    audit: Arc<dyn ActionLog>,
}

impl TurnDispatcher {
    pub fn new(
        classifier: Arc<dyn MediationClassifier>,
        registry: AgentRegistry,
        audit: Arc<dyn ActionLog>,
    ) -> Self {
        Self { classifier, registry, audit }
    }

    /// Processes one turn to completion. Exactly one branch executes; every
    /// internal failure resolves to a graceful assistant message, never a
    /// raw fault.
    pub async fn process_turn(&self, session: &mut SessionState, inbound: &str) -> TurnOutcome {
        session.begin_turn(inbound);
        let reply_watermark = session.transcript().len();

        let mut rationale = String::new();
        let mut classifier_down = false;

        match self.classifier.classify(session.transcript()).await {
            Ok(classification) => {
                let routing = classification.enforced_routing();
                if routing != classification.routing {
                    warn!(
                        event_name = "mediation.category_c_override",
                        session_id = %session.session_id.0,
                        proposed = classification.routing.as_str(),
                        "category C forced routing to handoff"
                    );
                }
                rationale = classification.rationale.clone();
                session.record_classification(classification.category, routing);
            }
            Err(classifier_error) => {
                // Fail closed: classification failures terminate on the
                // handoff path, never on an autonomous branch.
                warn!(
                    event_name = "mediation.classifier_failed",
                    session_id = %session.session_id.0,
                    error = %classifier_error,
                    "classifier failed; routing turn to handoff"
                );
                rationale = format!("classification unavailable: {classifier_error}");
                classifier_down = true;
                session.record_fallback_routing(RouteTarget::Handoff);
            }
        }

        let routing = session.take_routing().unwrap_or(RouteTarget::GeneralChat);
        match routing {
            RouteTarget::Handoff => {
                let message =
                    if classifier_down { CLASSIFIER_DOWN_MESSAGE } else { HANDOFF_MESSAGE };
                session.transcript_mut().push_assistant(message);
                session.escalation_flag = true;
                session.escalation_reason = Some(rationale);
            }
            RouteTarget::GeneralChat => {
                session.transcript_mut().push_assistant(GENERAL_CHAT_MESSAGE);
            }
            route => match self.registry.get(route) {
                Some(agent) => {
                    let agent = Arc::clone(agent);
                    let mut turn = AgentTurn::new(route, session, self.audit.as_ref());
                    if let Err(agent_error) = agent.handle(&mut turn).await {
                        error!(
                            event_name = "dispatch.agent_failed",
                            session_id = %session.session_id.0,
                            route = route.as_str(),
                            error = %agent_error,
                            "agent branch failed; degrading to fallback reply"
                        );
                    }
                    if session.transcript().len() == reply_watermark {
                        session.transcript_mut().push_assistant(AGENT_DEGRADED_MESSAGE);
                    }
                }
                None => {
                    warn!(
                        event_name = "dispatch.unrouted_target",
                        session_id = %session.session_id.0,
                        route = route.as_str(),
                        "no agent registered for route; falling back to general chat"
                    );
                    session.transcript_mut().push_assistant(GENERAL_CHAT_MESSAGE);
                }
            },
        }

        let response_text =
            session.transcript().assistant_messages_since(reply_watermark).join("\n\n");
        TurnOutcome {
            session_id: session.session_id.clone(),
            response_text,
            escalation_flag: session.escalation_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::audit::{ActionRecord, InMemoryActionLog, PermissionLevel};
    use crate::mediation::{
        Classification, ClassifierError, MediationClassifier, RiskCategory, RouteTarget,
    };
    use crate::session::{Channel, Language, SessionId, SessionState, Transcript, UserId};

    use super::{
        AgentError, AgentRegistry, AgentTurn, SpecializedAgent, TurnDispatcher,
        CLASSIFIER_DOWN_MESSAGE, GENERAL_CHAT_MESSAGE, HANDOFF_MESSAGE,
    };

    struct FixedClassifier {
        result: Result<Classification, ClassifierError>,
    }

    #[async_trait]
    impl MediationClassifier for FixedClassifier {
        async fn classify(
            &self,
            _transcript: &Transcript,
        ) -> Result<Classification, ClassifierError> {
            self.result.clone()
        }
    }

    struct EchoAgent {
        route: RouteTarget,
    }

    #[async_trait]
    impl SpecializedAgent for EchoAgent {
        fn route(&self) -> RouteTarget {
            self.route
        }

        async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
            let text = turn.latest_user_message().unwrap_or_default().to_string();
            turn.reply(format!("handled: {text}"));
            Ok(())
        }
    }

    struct GreedyAgent;

    #[async_trait]
    impl SpecializedAgent for GreedyAgent {
        fn route(&self) -> RouteTarget {
            RouteTarget::Viewing
        }

        async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
            // Deliberately reaches for another agent's section.
            turn.search_section()?;
            turn.reply("should never get here");
            Ok(())
        }
    }

    struct DoubleActionAgent;

    #[async_trait]
    impl SpecializedAgent for DoubleActionAgent {
        fn route(&self) -> RouteTarget {
            RouteTarget::Transaction
        }

        async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
            let user_id = turn.user_id().to_string();
            turn.record_action(ActionRecord::new(
                user_id.clone(),
                "DRAFT_PURCHASE_OFFER",
                PermissionLevel::UserApproval,
            ))
            .await?;
            turn.reply("first action recorded");
            turn.record_action(ActionRecord::new(
                user_id,
                "SUBMIT_MORTGAGE_PREAPPROVAL",
                PermissionLevel::UserApproval,
            ))
            .await?;
            turn.reply("second action recorded");
            Ok(())
        }
    }

    fn session() -> SessionState {
        SessionState::new(
            SessionId("thread-1".to_string()),
            UserId("user-1".to_string()),
            Channel::Web,
            Language::En,
        )
    }

    fn dispatcher_with(
        result: Result<Classification, ClassifierError>,
        registry: AgentRegistry,
        audit: Arc<InMemoryActionLog>,
    ) -> TurnDispatcher {
        TurnDispatcher::new(Arc::new(FixedClassifier { result }), registry, audit)
    }

    fn classified(category: RiskCategory, routing: RouteTarget) -> Classification {
        Classification { category, routing, rationale: "test classification".to_string() }
    }

    #[tokio::test]
    async fn routes_to_exactly_one_registered_agent() {
        let registry = AgentRegistry::new()
            .register(Arc::new(EchoAgent { route: RouteTarget::Search }))
            .register(Arc::new(EchoAgent { route: RouteTarget::Viewing }));
        let dispatcher = dispatcher_with(
            Ok(classified(RiskCategory::Information, RouteTarget::Search)),
            registry,
            Arc::new(InMemoryActionLog::default()),
        );

        let mut state = session();
        let outcome = dispatcher.process_turn(&mut state, "find me a flat").await;

        assert_eq!(outcome.response_text, "handled: find me a flat");
        assert!(!outcome.escalation_flag);
        // inbound + exactly one agent reply
        assert_eq!(state.transcript().len(), 2);
    }

    #[tokio::test]
    async fn category_c_terminates_on_handoff_even_when_routing_disagrees() {
        let registry =
            AgentRegistry::new().register(Arc::new(EchoAgent { route: RouteTarget::Transaction }));
        let dispatcher = dispatcher_with(
            // A misbehaving classifier proposes an autonomous route for C.
            Ok(classified(RiskCategory::NegotiationLegal, RouteTarget::Transaction)),
            registry,
            Arc::new(InMemoryActionLog::default()),
        );

        let mut state = session();
        let outcome = dispatcher.process_turn(&mut state, "waive the penalty clause").await;

        assert_eq!(outcome.response_text, HANDOFF_MESSAGE);
        assert!(outcome.escalation_flag);
        assert_eq!(state.escalation_reason.as_deref(), Some("test classification"));
    }

    #[tokio::test]
    async fn classifier_failure_fails_closed_to_handoff_not_general_chat() {
        // The reference behavior this replaces routed classifier failures to
        // the autonomous general-chat branch; here the turn must terminate
        // without any autonomous action.
        let registry =
            AgentRegistry::new().register(Arc::new(EchoAgent { route: RouteTarget::Search }));
        let dispatcher = dispatcher_with(
            Err(ClassifierError::Timeout { timeout_secs: 10 }),
            registry,
            Arc::new(InMemoryActionLog::default()),
        );

        let mut state = session();
        let outcome = dispatcher.process_turn(&mut state, "find me a flat").await;

        assert_eq!(outcome.response_text, CLASSIFIER_DOWN_MESSAGE);
        assert_ne!(outcome.response_text, GENERAL_CHAT_MESSAGE);
        assert!(outcome.escalation_flag);
        assert!(state
            .escalation_reason
            .as_deref()
            .is_some_and(|reason| reason.contains("classification unavailable")));
    }

    #[tokio::test]
    async fn unrouted_target_falls_back_to_general_chat() {
        let dispatcher = dispatcher_with(
            Ok(classified(RiskCategory::Information, RouteTarget::Renovation)),
            AgentRegistry::new(),
            Arc::new(InMemoryActionLog::default()),
        );

        let mut state = session();
        let outcome = dispatcher.process_turn(&mut state, "renovate everything").await;
        assert_eq!(outcome.response_text, GENERAL_CHAT_MESSAGE);
    }

    #[tokio::test]
    async fn cross_section_access_degrades_instead_of_faulting() {
        let registry = AgentRegistry::new().register(Arc::new(GreedyAgent));
        let dispatcher = dispatcher_with(
            Ok(classified(RiskCategory::Logistics, RouteTarget::Viewing)),
            registry,
            Arc::new(InMemoryActionLog::default()),
        );

        let mut state = session();
        let outcome = dispatcher.process_turn(&mut state, "book a viewing").await;

        assert_eq!(outcome.response_text, super::AGENT_DEGRADED_MESSAGE);
        assert_eq!(state.transcript().len(), 2);
    }

    #[tokio::test]
    async fn second_action_in_one_turn_is_rejected_and_not_logged() {
        let audit = Arc::new(InMemoryActionLog::default());
        let registry = AgentRegistry::new().register(Arc::new(DoubleActionAgent));
        let dispatcher = dispatcher_with(
            Ok(classified(RiskCategory::Information, RouteTarget::Transaction)),
            registry,
            Arc::clone(&audit),
        );

        let mut state = session();
        dispatcher.process_turn(&mut state, "draft an offer and a mortgage").await;

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_name, "DRAFT_PURCHASE_OFFER");
        assert_eq!(state.action_slot().pending_action(), Some("DRAFT_PURCHASE_OFFER"));
    }

    #[tokio::test]
    async fn identical_inputs_produce_identical_outcomes() {
        let build = || {
            dispatcher_with(
                Ok(classified(RiskCategory::Information, RouteTarget::Search)),
                AgentRegistry::new().register(Arc::new(EchoAgent { route: RouteTarget::Search })),
                Arc::new(InMemoryActionLog::default()),
            )
        };

        let mut first_state = session();
        let mut second_state = session();
        let first = build().process_turn(&mut first_state, "find me a 2LDK").await;
        let second = build().process_turn(&mut second_state, "find me a 2LDK").await;

        assert_eq!(first.response_text, second.response_text);
        assert_eq!(first.escalation_flag, second.escalation_flag);
    }

    #[tokio::test]
    async fn prior_history_is_never_rewritten() {
        let registry =
            AgentRegistry::new().register(Arc::new(EchoAgent { route: RouteTarget::Search }));
        let dispatcher = dispatcher_with(
            Ok(classified(RiskCategory::Information, RouteTarget::Search)),
            registry,
            Arc::new(InMemoryActionLog::default()),
        );

        let mut state = session();
        dispatcher.process_turn(&mut state, "first turn").await;
        let snapshot: Vec<String> =
            state.transcript().entries().iter().map(|m| m.content.clone()).collect();

        dispatcher.process_turn(&mut state, "second turn").await;
        let replayed: Vec<String> = state
            .transcript()
            .entries()
            .iter()
            .take(snapshot.len())
            .map(|m| m.content.clone())
            .collect();

        assert_eq!(snapshot, replayed);
        assert_eq!(state.transcript().len(), snapshot.len() + 2);
    }
}
