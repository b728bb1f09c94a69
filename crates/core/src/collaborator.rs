use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Per-call budgets for the external back-ends. Calls past these deadlines
/// are abandoned and surfaced as `ServiceError::Timeout`.
pub const PRICING_TIMEOUT: Duration = Duration::from_secs(5);
pub const PROPERTY_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DOCUMENT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);
pub const TOUR_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Pricing,
    DocumentAnalysis,
    TourEngine,
    PropertySearch,
    Scheduling,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::DocumentAnalysis => "document_analysis",
            Self::TourEngine => "tour_engine",
            Self::PropertySearch => "property_search",
            Self::Scheduling => "scheduling",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMethod {
    Get,
    Post,
}

/// One outbound collaborator call: which back-end, which endpoint, what
/// payload, and how long the caller is willing to wait.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRequest {
    pub service: ServiceKind,
    pub endpoint: String,
    pub method: ServiceMethod,
    pub payload: Value,
    pub timeout: Duration,
}

impl ServiceRequest {
    pub fn post(
        service: ServiceKind,
        endpoint: impl Into<String>,
        payload: Value,
        timeout: Duration,
    ) -> Self {
        Self { service, endpoint: endpoint.into(), method: ServiceMethod::Post, payload, timeout }
    }

    pub fn get(service: ServiceKind, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            service,
            endpoint: endpoint.into(),
            method: ServiceMethod::Get,
            payload: Value::Null,
            timeout,
        }
    }
}

/// Structured failure value returned to the calling agent. Collaborator
/// faults never escape an agent as a panic or an aborted turn; the agent
/// inspects this value and degrades its reply instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("call to {service:?} timed out after {timeout_secs}s")]
    Timeout { service: ServiceKind, timeout_secs: u64 },
    #[error("transport failure calling {service:?}: {message}")]
    Transport { service: ServiceKind, message: String },
    #[error("{service:?} returned status {status}: {message}")]
    Status { service: ServiceKind, status: u16, message: String },
    #[error("malformed response from {service:?}: {message}")]
    MalformedResponse { service: ServiceKind, message: String },
}

impl ServiceError {
    pub fn service(&self) -> ServiceKind {
        match self {
            Self::Timeout { service, .. }
            | Self::Transport { service, .. }
            | Self::Status { service, .. }
            | Self::MalformedResponse { service, .. } => *service,
        }
    }
}

/// The single uniform call capability shared by every agent. Implemented
/// once over HTTP in `sumika-services`; tests substitute canned responses.
#[async_trait]
pub trait CollaboratorClient: Send + Sync {
    async fn call(&self, request: ServiceRequest) -> Result<Value, ServiceError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{ServiceError, ServiceKind, ServiceMethod, ServiceRequest};

    #[test]
    fn post_request_carries_payload_and_timeout() {
        let request = ServiceRequest::post(
            ServiceKind::Pricing,
            "/renovate",
            json!({"scope": "kitchen"}),
            Duration::from_secs(5),
        );

        assert_eq!(request.method, ServiceMethod::Post);
        assert_eq!(request.endpoint, "/renovate");
        assert_eq!(request.timeout, Duration::from_secs(5));
        assert_eq!(request.payload["scope"], "kitchen");
    }

    #[test]
    fn error_reports_originating_service() {
        let error = ServiceError::Timeout { service: ServiceKind::DocumentAnalysis, timeout_secs: 30 };
        assert_eq!(error.service(), ServiceKind::DocumentAnalysis);
        assert!(error.to_string().contains("timed out after 30s"));
    }
}
