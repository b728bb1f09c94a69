use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sumika_core::dispatch::{AgentError, AgentTurn, SpecializedAgent};
use sumika_core::domain::document::{DocumentAnalysis, DocumentAnalyzer, RiskSeverity};
use sumika_core::mediation::RouteTarget;

use crate::extract::first_url;

const URL_CLARIFICATION_MESSAGE: &str = "Please provide a document URL to analyze.";

const ANALYSIS_DEGRADED_MESSAGE: &str =
    "Document analysis is temporarily unavailable. Please try again in a moment.";

fn severity_note(severity: RiskSeverity) -> &'static str {
    match severity {
        RiskSeverity::Low => "nothing that looks serious",
        RiskSeverity::Medium => "worth double-checking with your agent",
        RiskSeverity::High => "please review these carefully before proceeding",
        RiskSeverity::Critical => "these need professional attention before you proceed",
    }
}

fn summarize(analysis: &DocumentAnalysis) -> String {
    let mut summary = format!(
        "I've analyzed the document ({} pages). It appears to be a {}.",
        analysis.page_count,
        analysis.document_type.label()
    );
    match analysis.risk_count() {
        0 => summary.push_str(" I didn't detect any risk flags."),
        count => {
            let categories = analysis
                .risk_flags
                .iter()
                .map(|flag| flag.category.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            summary.push_str(&format!(" I detected {count} risk flag(s): {categories}."));
            if let Some(severity) = analysis.highest_severity() {
                summary.push_str(&format!(" Overall: {}.", severity_note(severity)));
            }
        }
    }
    summary
}

/// Document pipeline: pull the referenced URL out of the message, hand it to
/// the analysis back-end, and summarize type and risk findings. Without a
/// URL the agent asks for one instead of calling the collaborator.
pub struct DocumentAgent {
    analyzer: Arc<dyn DocumentAnalyzer>,
}

impl DocumentAgent {
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl SpecializedAgent for DocumentAgent {
    fn route(&self) -> RouteTarget {
        RouteTarget::Document
    }

    async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
        let text = turn.latest_user_message().unwrap_or_default().to_string();

        let Some(document_url) = first_url(&text) else {
            turn.reply(URL_CLARIFICATION_MESSAGE);
            return Ok(());
        };

        let analysis = match self.analyzer.analyze(&document_url).await {
            Ok(analysis) => analysis,
            Err(service_error) => {
                warn!(
                    event_name = "document.analysis_failed",
                    error = %service_error,
                    "document analysis call failed; degrading reply"
                );
                turn.reply(ANALYSIS_DEGRADED_MESSAGE);
                return Ok(());
            }
        };

        let reply = summarize(&analysis);
        let section = turn.document_section()?;
        section.document_url = Some(document_url);
        section.analysis = Some(analysis);

        turn.reply(reply);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;

    use sumika_core::audit::InMemoryActionLog;
    use sumika_core::collaborator::{ServiceError, ServiceKind};
    use sumika_core::dispatch::{AgentRegistry, TurnDispatcher};
    use sumika_core::domain::document::{
        DocumentAnalysis, DocumentAnalyzer, DocumentType, RiskFlag, RiskSeverity,
    };
    use sumika_core::mediation::KeywordClassifier;
    use sumika_core::session::{Channel, Language, SessionId, SessionState, UserId};

    use super::{DocumentAgent, ANALYSIS_DEGRADED_MESSAGE, URL_CLARIFICATION_MESSAGE};

    struct StubAnalyzer {
        result: Result<DocumentAnalysis, ServiceError>,
    }

    #[async_trait]
    impl DocumentAnalyzer for StubAnalyzer {
        async fn analyze(&self, _document_url: &str) -> Result<DocumentAnalysis, ServiceError> {
            self.result.clone()
        }
    }

    fn contract_analysis() -> DocumentAnalysis {
        DocumentAnalysis {
            document_type: DocumentType::SaleContract,
            risk_flags: vec![
                RiskFlag {
                    category: "earthquake_resistance".to_string(),
                    severity: RiskSeverity::High,
                    excerpt: Some("built to the pre-1981 standard".to_string()),
                },
                RiskFlag {
                    category: "land_rights".to_string(),
                    severity: RiskSeverity::Medium,
                    excerpt: None,
                },
            ],
            key_facts: BTreeMap::from([(
                "seller".to_string(),
                "Example Estate K.K.".to_string(),
            )]),
            page_count: 14,
        }
    }

    fn dispatcher(analyzer: StubAnalyzer) -> TurnDispatcher {
        TurnDispatcher::new(
            Arc::new(KeywordClassifier::new()),
            AgentRegistry::new().register(Arc::new(DocumentAgent::new(Arc::new(analyzer)))),
            Arc::new(InMemoryActionLog::default()),
        )
    }

    fn session() -> SessionState {
        SessionState::new(
            SessionId("thread-1".to_string()),
            UserId("user-1".to_string()),
            Channel::Web,
            Language::En,
        )
    }

    #[tokio::test]
    async fn summarizes_type_and_risk_count() {
        let mut state = session();
        let outcome = dispatcher(StubAnalyzer { result: Ok(contract_analysis()) })
            .process_turn(
                &mut state,
                "analyze this document https://files.example/contract.pdf",
            )
            .await;

        assert!(outcome.response_text.contains("sale contract"));
        assert!(outcome.response_text.contains("2 risk flag(s)"));
        assert!(outcome.response_text.contains("earthquake_resistance"));
        assert!(state.sections().document().analysis.is_some());
        assert_eq!(
            state.sections().document().document_url.as_deref(),
            Some("https://files.example/contract.pdf")
        );
    }

    #[tokio::test]
    async fn missing_url_asks_for_one_without_calling_the_collaborator() {
        let mut state = session();
        let outcome = dispatcher(StubAnalyzer {
            result: Err(ServiceError::Transport {
                service: ServiceKind::DocumentAnalysis,
                message: "must not be called".to_string(),
            }),
        })
        .process_turn(&mut state, "analyze my document please")
        .await;

        // A degraded message here would mean the analyzer was invoked.
        assert_eq!(outcome.response_text, URL_CLARIFICATION_MESSAGE);
    }

    #[tokio::test]
    async fn analyzer_failure_degrades() {
        let mut state = session();
        let outcome = dispatcher(StubAnalyzer {
            result: Err(ServiceError::Timeout {
                service: ServiceKind::DocumentAnalysis,
                timeout_secs: 30,
            }),
        })
        .process_turn(&mut state, "analyze https://files.example/contract.pdf")
        .await;

        assert_eq!(outcome.response_text, ANALYSIS_DEGRADED_MESSAGE);
    }
}
