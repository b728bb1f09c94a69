use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use sumika_core::collaborator::{
    CollaboratorClient, ServiceError, ServiceKind, ServiceMethod, ServiceRequest,
};
use sumika_core::config::ServicesConfig;

/// Base URLs for the HTTP-reachable collaborators.
#[derive(Clone, Debug)]
pub struct ServiceEndpoints {
    pub pricing: String,
    pub document: String,
    pub tour: String,
}

impl From<&ServicesConfig> for ServiceEndpoints {
    fn from(config: &ServicesConfig) -> Self {
        Self {
            pricing: config.pricing_url.clone(),
            document: config.document_url.clone(),
            tour: config.tour_url.clone(),
        }
    }
}

impl ServiceEndpoints {
    fn base_url(&self, service: ServiceKind) -> Result<&str, ServiceError> {
        match service {
            ServiceKind::Pricing => Ok(&self.pricing),
            ServiceKind::DocumentAnalysis => Ok(&self.document),
            ServiceKind::TourEngine => Ok(&self.tour),
            ServiceKind::PropertySearch | ServiceKind::Scheduling => Err(ServiceError::Transport {
                service,
                message: "no HTTP endpoint configured for this collaborator".to_string(),
            }),
        }
    }
}

/// The one HTTP implementation of the collaborator call contract. Every
/// typed wrapper goes through here, so timeout and error mapping exist in
/// exactly one place.
#[derive(Clone)]
pub struct HttpCollaboratorClient {
    client: Client,
    endpoints: ServiceEndpoints,
}

impl HttpCollaboratorClient {
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        Self { client: Client::new(), endpoints }
    }
}

#[async_trait]
impl CollaboratorClient for HttpCollaboratorClient {
    async fn call(&self, request: ServiceRequest) -> Result<Value, ServiceError> {
        let service = request.service;
        let base = self.endpoints.base_url(service)?;
        let url = format!("{}{}", base.trim_end_matches('/'), request.endpoint);

        let builder = match request.method {
            ServiceMethod::Get => self.client.get(&url),
            ServiceMethod::Post => self.client.post(&url).json(&request.payload),
        };

        let response = builder.timeout(request.timeout).send().await.map_err(|error| {
            if error.is_timeout() {
                ServiceError::Timeout { service, timeout_secs: request.timeout.as_secs() }
            } else {
                ServiceError::Transport { service, message: error.to_string() }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status { service, status: status.as_u16(), message: body });
        }

        response.json::<Value>().await.map_err(|error| ServiceError::MalformedResponse {
            service,
            message: error.to_string(),
        })
    }
}
