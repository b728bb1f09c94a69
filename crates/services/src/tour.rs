use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use sumika_core::collaborator::{
    CollaboratorClient, ServiceError, ServiceKind, ServiceRequest, TOUR_GENERATION_TIMEOUT,
};
use sumika_core::domain::property::PropertyId;
use sumika_core::domain::viewing::{TourGenerator, TourRef};

/// Typed wrapper over the 3-D engine's `/generate` endpoint. Generation can
/// take the better part of a minute; the caller treats a timeout as "no tour"
/// rather than a failed turn.
pub struct TourApi {
    client: Arc<dyn CollaboratorClient>,
}

impl TourApi {
    pub fn new(client: Arc<dyn CollaboratorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TourGenerator for TourApi {
    async fn generate_tour(&self, property_id: &PropertyId) -> Result<TourRef, ServiceError> {
        let response = self
            .client
            .call(ServiceRequest::post(
                ServiceKind::TourEngine,
                "/generate",
                json!({"property_id": property_id.0}),
                TOUR_GENERATION_TIMEOUT,
            ))
            .await?;

        serde_json::from_value(response).map_err(|error| ServiceError::MalformedResponse {
            service: ServiceKind::TourEngine,
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
    use sumika_core::domain::property::PropertyId;
    use sumika_core::domain::viewing::TourGenerator;

    use super::TourApi;

    struct CannedClient;

    #[async_trait]
    impl CollaboratorClient for CannedClient {
        async fn call(&self, request: ServiceRequest) -> Result<Value, ServiceError> {
            assert_eq!(request.payload["property_id"], "prop-1");
            assert_eq!(request.timeout.as_secs(), 60);
            Ok(json!({"tour_id": "tour-9", "url": "https://tours.example/tour-9"}))
        }
    }

    #[tokio::test]
    async fn decodes_tour_reference() {
        let api = TourApi::new(Arc::new(CannedClient));
        let tour = api.generate_tour(&PropertyId("prop-1".to_string())).await.expect("decodes");
        assert_eq!(tour.tour_id, "tour-9");
        assert_eq!(tour.url, "https://tours.example/tour-9");
    }
}
