use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::document::DocumentAnalysis;
use crate::domain::property::{PropertyId, SearchFilters};
use crate::domain::renovation::{QualityTier, RenovationEstimate, RenovationScope};
use crate::domain::transaction::ContractStatus;
use crate::domain::viewing::{TourRef, ViewingSlot};
use crate::mediation::{RiskCategory, RouteTarget};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Mobile,
    Line,
    Voice,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
            Self::Line => "line",
            Self::Voice => "voice",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "mobile" => Ok(Self::Mobile),
            "line" => Ok(Self::Line),
            "voice" => Ok(Self::Voice),
            other => Err(format!("unsupported channel `{other}` (expected web|mobile|line|voice)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), sent_at: Utc::now() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Ordered, append-only message history. The backing vector is private and
/// only appenders are exposed, so no component can rewrite or drop an entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<Message>,
}

impl Transcript {
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries.push(Message::assistant(content));
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.entries.push(Message::system(content));
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }

    pub fn assistant_messages_since(&self, index: usize) -> Vec<&str> {
        self.entries
            .iter()
            .skip(index)
            .filter(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
            .collect()
    }
}

/// Single per-turn slot for the action an agent is about to take / has
/// taken. Cleared at the start of every turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSlot {
    pending_action: Option<String>,
    action_result: Option<Value>,
}

impl ActionSlot {
    pub fn pending_action(&self) -> Option<&str> {
        self.pending_action.as_deref()
    }

    pub fn action_result(&self) -> Option<&Value> {
        self.action_result.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.pending_action.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.pending_action = None;
        self.action_result = None;
    }

    pub(crate) fn begin(&mut self, action_name: impl Into<String>) {
        self.pending_action = Some(action_name.into());
    }

    pub(crate) fn complete(&mut self, outputs: Value) {
        self.action_result = Some(outputs);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSection {
    pub filters: SearchFilters,
    pub shortlist: Vec<PropertyId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewingSection {
    pub property_id: Option<PropertyId>,
    pub proposed_slots: Vec<ViewingSlot>,
    pub tour: Option<TourRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSection {
    pub offer_amount: Option<i64>,
    pub mortgage_amount: Option<i64>,
    pub contract_status: Option<ContractStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub document_url: Option<String>,
    pub analysis: Option<DocumentAnalysis>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenovationSection {
    pub scope: Option<RenovationScope>,
    pub quality: Option<QualityTier>,
    pub estimate: Option<RenovationEstimate>,
}

/// Per-agent extension fields, namespaced so each agent owns exactly one
/// section. Mutable access goes through the dispatch capability, which only
/// lends out the section belonging to the executing branch; everything else
/// is read-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSet {
    pub(crate) search: SearchSection,
    pub(crate) viewing: ViewingSection,
    pub(crate) transaction: TransactionSection,
    pub(crate) document: DocumentSection,
    pub(crate) renovation: RenovationSection,
}

impl SectionSet {
    pub fn search(&self) -> &SearchSection {
        &self.search
    }

    pub fn viewing(&self) -> &ViewingSection {
        &self.viewing
    }

    pub fn transaction(&self) -> &TransactionSection {
        &self.transaction
    }

    pub fn document(&self) -> &DocumentSection {
        &self.document
    }

    pub fn renovation(&self) -> &RenovationSection {
        &self.renovation
    }
}

/// The state record threaded through one conversational turn, rebuilt from
/// the persisted snapshot (or empty) at turn start and written back at turn
/// end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub channel: Channel,
    pub language: Language,
    transcript: Transcript,
    classified_category: Option<RiskCategory>,
    routing_decision: Option<RouteTarget>,
    action_slot: ActionSlot,
    sections: SectionSet,
    pub turn_count: u32,
    pub escalation_flag: bool,
    pub escalation_reason: Option<String>,
}

impl SessionState {
    pub fn new(session_id: SessionId, user_id: UserId, channel: Channel, language: Language) -> Self {
        Self {
            session_id,
            user_id,
            channel,
            language,
            transcript: Transcript::default(),
            classified_category: None,
            routing_decision: None,
            action_slot: ActionSlot::default(),
            sections: SectionSet::default(),
            turn_count: 0,
            escalation_flag: false,
            escalation_reason: None,
        }
    }

    /// Clears per-turn scratch state and appends the inbound message.
    pub fn begin_turn(&mut self, inbound_message: &str) {
        self.action_slot.clear();
        self.classified_category = None;
        self.routing_decision = None;
        self.transcript.push_user(inbound_message);
        self.turn_count += 1;
    }

    pub fn record_classification(&mut self, category: RiskCategory, routing: RouteTarget) {
        self.classified_category = Some(category);
        self.routing_decision = Some(routing);
    }

    /// Fail-closed path: a routing decision without a category, used when
    /// classification itself could not be produced.
    pub fn record_fallback_routing(&mut self, routing: RouteTarget) {
        self.routing_decision = Some(routing);
    }

    /// Consumes the turn's routing decision. Exactly one decision is
    /// produced and consumed per turn; a second call yields `None`.
    pub fn take_routing(&mut self) -> Option<RouteTarget> {
        self.routing_decision.take()
    }

    pub fn classified_category(&self) -> Option<RiskCategory> {
        self.classified_category
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn sections(&self) -> &SectionSet {
        &self.sections
    }

    pub(crate) fn sections_mut(&mut self) -> &mut SectionSet {
        &mut self.sections
    }

    pub fn action_slot(&self) -> &ActionSlot {
        &self.action_slot
    }

    pub(crate) fn action_slot_mut(&mut self) -> &mut ActionSlot {
        &mut self.action_slot
    }
}

#[cfg(test)]
mod tests {
    use crate::mediation::{RiskCategory, RouteTarget};

    use super::{Channel, Language, SessionId, SessionState, Transcript, UserId};

    fn session() -> SessionState {
        SessionState::new(
            SessionId("thread-1".to_string()),
            UserId("user-1".to_string()),
            Channel::Web,
            Language::En,
        )
    }

    #[test]
    fn begin_turn_clears_scratch_and_appends_inbound() {
        let mut state = session();
        state.record_classification(RiskCategory::Information, RouteTarget::Search);
        state.action_slot_mut().begin("DRAFT_PURCHASE_OFFER");

        state.begin_turn("hello");

        assert_eq!(state.turn_count, 1);
        assert!(state.classified_category().is_none());
        assert!(!state.action_slot().is_occupied());
        assert_eq!(state.transcript().last_user_message(), Some("hello"));
    }

    #[test]
    fn routing_decision_is_consumed_exactly_once() {
        let mut state = session();
        state.begin_turn("find a flat");
        state.record_classification(RiskCategory::Information, RouteTarget::Search);

        assert_eq!(state.take_routing(), Some(RouteTarget::Search));
        assert_eq!(state.take_routing(), None);
    }

    #[test]
    fn transcript_is_append_only_and_ordered() {
        let mut transcript = Transcript::default();
        transcript.push_user("first");
        transcript.push_assistant("second");
        transcript.push_user("third");

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last_user_message(), Some("third"));
        assert_eq!(transcript.entries()[0].content, "first");
        assert_eq!(transcript.assistant_messages_since(0), vec!["second"]);
    }

    #[test]
    fn channel_parses_known_values_only() {
        assert_eq!("line".parse::<Channel>(), Ok(Channel::Line));
        assert!("carrier-pigeon".parse::<Channel>().is_err());
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let mut state = session();
        state.begin_turn("find me a 2LDK");
        state.record_classification(RiskCategory::Information, RouteTarget::Search);

        let encoded = serde_json::to_string(&state).expect("state serializes");
        let decoded: SessionState = serde_json::from_str(&encoded).expect("state deserializes");
        assert_eq!(decoded, state);
    }
}
