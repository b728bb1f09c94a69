use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborator::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub ward: String,
    pub address: String,
    pub listing_price: i64,
    pub total_area_sqm: f64,
    pub floor_plan: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Criteria extracted from a search request. Prices are integer JPY.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub ward: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_area_sqm: Option<f64>,
    pub floor_plan: Option<String>,
    pub limit: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            ward: None,
            min_price: None,
            max_price: None,
            min_area_sqm: None,
            floor_plan: None,
            limit: 5,
        }
    }
}

impl SearchFilters {
    pub fn is_unconstrained(&self) -> bool {
        self.ward.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_area_sqm.is_none()
            && self.floor_plan.is_none()
    }
}

/// The listing back-end. Results come back ranked; the agent renders them
/// as-is and never re-orders.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn search(&self, filters: &SearchFilters) -> Result<Vec<Property>, ServiceError>;
}
