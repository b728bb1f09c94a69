use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audit::PermissionLevel;
use crate::collaborator::ServiceError;

/// The three mutually exclusive transaction actions. Offer drafting and
/// mortgage submission commit the user and therefore require approval;
/// a registration request is informational and runs autonomously.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    DraftOffer,
    MortgagePreapproval,
    TitleRegistration,
}

impl TransactionKind {
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::DraftOffer => "DRAFT_PURCHASE_OFFER",
            Self::MortgagePreapproval => "SUBMIT_MORTGAGE_PREAPPROVAL",
            Self::TitleRegistration => "REQUEST_TITLE_REGISTRATION",
        }
    }

    pub fn permission_level(&self) -> PermissionLevel {
        match self {
            Self::DraftOffer | Self::MortgagePreapproval => PermissionLevel::UserApproval,
            Self::TitleRegistration => PermissionLevel::Autonomous,
        }
    }

    pub fn artifact_kind(&self) -> &'static str {
        match self {
            Self::DraftOffer => "purchase-offer",
            Self::MortgagePreapproval => "mortgage-preapproval",
            Self::TitleRegistration => "registration-request",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Validated,
    Submitted,
}

/// Reference to a durable artifact produced by the document-generation
/// collaborator (offer letters, applications, quotes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub artifact_id: String,
    pub location: String,
}

#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, kind: &str, payload: &Value) -> Result<ArtifactRef, ServiceError>;
}

#[cfg(test)]
mod tests {
    use crate::audit::PermissionLevel;

    use super::TransactionKind;

    #[test]
    fn commitment_actions_require_user_approval() {
        assert_eq!(TransactionKind::DraftOffer.permission_level(), PermissionLevel::UserApproval);
        assert_eq!(
            TransactionKind::MortgagePreapproval.permission_level(),
            PermissionLevel::UserApproval
        );
        assert_eq!(
            TransactionKind::TitleRegistration.permission_level(),
            PermissionLevel::Autonomous
        );
    }

    #[test]
    fn action_names_are_stable_ledger_identifiers() {
        assert_eq!(TransactionKind::DraftOffer.action_name(), "DRAFT_PURCHASE_OFFER");
        assert_eq!(TransactionKind::MortgagePreapproval.action_name(), "SUBMIT_MORTGAGE_PREAPPROVAL");
        assert_eq!(TransactionKind::TitleRegistration.action_name(), "REQUEST_TITLE_REGISTRATION");
    }
}
