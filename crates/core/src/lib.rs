pub mod audit;
pub mod collaborator;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod mediation;
pub mod session;

pub use audit::{
    ActionLog, ActionLogError, ActionRecord, ExecutionStatus, InMemoryActionLog, PermissionLevel,
};
pub use collaborator::{
    CollaboratorClient, ServiceError, ServiceKind, ServiceMethod, ServiceRequest,
};
pub use dispatch::{
    AgentError, AgentRegistry, AgentTurn, SpecializedAgent, TurnDispatcher, TurnOutcome,
};
pub use domain::document::{DocumentAnalysis, DocumentAnalyzer, DocumentType, RiskFlag, RiskSeverity};
pub use domain::property::{Property, PropertyId, PropertyStore, SearchFilters};
pub use domain::renovation::{
    QualityTier, RenovationEstimate, RenovationPricer, RenovationRequest, RenovationScope,
};
pub use domain::transaction::{ArtifactGenerator, ArtifactRef, ContractStatus, TransactionKind};
pub use domain::viewing::{FixedSlotDirectory, SlotDirectory, TourGenerator, TourRef, ViewingSlot};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use mediation::{
    Classification, ClassifierError, KeywordClassifier, MediationClassifier, RiskCategory,
    RouteTarget,
};
pub use session::{
    ActionSlot, Channel, Language, Message, Role, SessionId, SessionState, Transcript, UserId,
};
