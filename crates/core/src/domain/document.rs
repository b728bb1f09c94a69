use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborator::ServiceError;

/// Closed taxonomy of the document kinds the analysis back-end reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    RegistryTranscript,
    ImportantMatterStatement,
    SaleContract,
    BuildingInspection,
    Other,
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RegistryTranscript => "property registry transcript",
            Self::ImportantMatterStatement => "important matter statement",
            Self::SaleContract => "sale contract",
            Self::BuildingInspection => "building inspection report",
            Self::Other => "general document",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub category: String,
    pub severity: RiskSeverity,
    pub excerpt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub document_type: DocumentType,
    pub risk_flags: Vec<RiskFlag>,
    pub key_facts: BTreeMap<String, String>,
    pub page_count: u32,
}

impl DocumentAnalysis {
    pub fn risk_count(&self) -> usize {
        self.risk_flags.len()
    }

    pub fn highest_severity(&self) -> Option<RiskSeverity> {
        self.risk_flags.iter().map(|flag| flag.severity).max()
    }
}

/// OCR/extraction back-end boundary. Internals (text extraction, risk
/// pattern matching) stay on the collaborator side.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, document_url: &str) -> Result<DocumentAnalysis, ServiceError>;
}
