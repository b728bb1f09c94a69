use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use sumika_core::collaborator::{
    CollaboratorClient, ServiceError, ServiceKind, ServiceRequest, DOCUMENT_ANALYSIS_TIMEOUT,
};
use sumika_core::domain::document::{DocumentAnalysis, DocumentAnalyzer};

/// Typed wrapper over the document-intelligence back-end's `/analyze`
/// endpoint. Analysis is slow for scanned contracts, hence the long budget.
pub struct DocumentApi {
    client: Arc<dyn CollaboratorClient>,
}

impl DocumentApi {
    pub fn new(client: Arc<dyn CollaboratorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentAnalyzer for DocumentApi {
    async fn analyze(&self, document_url: &str) -> Result<DocumentAnalysis, ServiceError> {
        let response = self
            .client
            .call(ServiceRequest::post(
                ServiceKind::DocumentAnalysis,
                "/analyze",
                json!({"file_url": document_url}),
                DOCUMENT_ANALYSIS_TIMEOUT,
            ))
            .await?;

        serde_json::from_value(response).map_err(|error| ServiceError::MalformedResponse {
            service: ServiceKind::DocumentAnalysis,
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use sumika_core::collaborator::{CollaboratorClient, ServiceError, ServiceRequest};
    use sumika_core::domain::document::{DocumentAnalyzer, DocumentType, RiskSeverity};

    use super::DocumentApi;

    struct CannedClient;

    #[async_trait]
    impl CollaboratorClient for CannedClient {
        async fn call(&self, request: ServiceRequest) -> Result<Value, ServiceError> {
            assert_eq!(request.payload["file_url"], "https://files.example/contract.pdf");
            Ok(json!({
                "document_type": "sale_contract",
                "risk_flags": [
                    {"category": "legal_encumbrance", "severity": "critical", "excerpt": "差押の登記があります"}
                ],
                "key_facts": {"seller": "Example Estate K.K."},
                "page_count": 14,
            }))
        }
    }

    #[tokio::test]
    async fn decodes_analysis_including_risk_severities() {
        let api = DocumentApi::new(Arc::new(CannedClient));
        let analysis =
            api.analyze("https://files.example/contract.pdf").await.expect("decodes");

        assert_eq!(analysis.document_type, DocumentType::SaleContract);
        assert_eq!(analysis.risk_count(), 1);
        assert_eq!(analysis.highest_severity(), Some(RiskSeverity::Critical));
        assert_eq!(analysis.page_count, 14);
    }
}
