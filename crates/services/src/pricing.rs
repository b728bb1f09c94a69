use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use sumika_core::collaborator::{
    CollaboratorClient, ServiceError, ServiceKind, ServiceRequest, PRICING_TIMEOUT,
};
use sumika_core::domain::renovation::{RenovationEstimate, RenovationPricer, RenovationRequest};

/// Typed wrapper over the pricing back-end's `/renovate` endpoint.
pub struct PricingApi {
    client: Arc<dyn CollaboratorClient>,
}

impl PricingApi {
    pub fn new(client: Arc<dyn CollaboratorClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RenovationPricer for PricingApi {
    async fn estimate(
        &self,
        request: &RenovationRequest,
    ) -> Result<RenovationEstimate, ServiceError> {
        let payload = json!({
            "total_area_sqm": request.total_area_sqm,
            "scope": request.scope.as_str(),
            "quality": request.quality.as_str(),
            "region": request.region,
        });

        let response = self
            .client
            .call(ServiceRequest::post(ServiceKind::Pricing, "/renovate", payload, PRICING_TIMEOUT))
            .await?;

        serde_json::from_value(response).map_err(|error| ServiceError::MalformedResponse {
            service: ServiceKind::Pricing,
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
    use sumika_core::domain::renovation::{
        QualityTier, RenovationPricer, RenovationRequest, RenovationScope,
    };

    use super::PricingApi;

    struct CannedClient {
        response: Value,
    }

    #[async_trait]
    impl CollaboratorClient for CannedClient {
        async fn call(&self, request: ServiceRequest) -> Result<Value, ServiceError> {
            assert_eq!(request.endpoint, "/renovate");
            assert_eq!(request.payload["scope"], "kitchen");
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn decodes_estimate_from_service_response() {
        let api = PricingApi::new(Arc::new(CannedClient {
            response: json!({
                "estimated_cost": 800_000,
                "breakdown": {"unit_price": 800_000},
                "duration_weeks": 1,
            }),
        }));

        let estimate = api
            .estimate(&RenovationRequest {
                total_area_sqm: 65.0,
                scope: RenovationScope::Kitchen,
                quality: QualityTier::Standard,
                region: "tokyo".to_string(),
            })
            .await
            .expect("canned response decodes");

        assert_eq!(estimate.estimated_cost, 800_000);
        assert_eq!(estimate.duration_weeks, 1);
    }

    #[tokio::test]
    async fn malformed_response_is_a_structured_error() {
        let api = PricingApi::new(Arc::new(CannedClient { response: json!({"nope": true}) }));
        let error = api
            .estimate(&RenovationRequest {
                total_area_sqm: 65.0,
                scope: RenovationScope::Kitchen,
                quality: QualityTier::Standard,
                region: "tokyo".to_string(),
            })
            .await
            .expect_err("missing fields cannot decode");
        assert!(matches!(error, ServiceError::MalformedResponse { .. }));
    }
}
