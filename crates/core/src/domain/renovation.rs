use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborator::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenovationScope {
    Full,
    Kitchen,
    Bath,
    WallpaperFlooring,
}

impl RenovationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Kitchen => "kitchen",
            Self::Bath => "bath",
            Self::WallpaperFlooring => "wallpaper+flooring",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Standard,
    HighEnd,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::HighEnd => "high_end",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Standard => 1.0,
            Self::HighEnd => 1.6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenovationRequest {
    pub total_area_sqm: f64,
    pub scope: RenovationScope,
    pub quality: QualityTier,
    pub region: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenovationEstimate {
    pub estimated_cost: i64,
    pub breakdown: BTreeMap<String, i64>,
    pub duration_weeks: u32,
}

/// Pricing back-end boundary for renovation quotes.
#[async_trait]
pub trait RenovationPricer: Send + Sync {
    async fn estimate(&self, request: &RenovationRequest) -> Result<RenovationEstimate, ServiceError>;
}

// Rough market unit costs in JPY, matching the pricing service's own table so
// a degraded estimate stays in the same ballpark as the live one.
const FULL_COST_PER_SQM: f64 = 150_000.0;
const KITCHEN_UNIT_COST: f64 = 800_000.0;
const BATH_UNIT_COST: f64 = 1_000_000.0;
const WALLPAPER_COST_PER_SQM: f64 = 1_500.0;
const FLOORING_COST_PER_SQM: f64 = 8_000.0;

fn region_multiplier(region: &str) -> f64 {
    match region.to_ascii_lowercase().as_str() {
        "osaka" => 0.75,
        "nagoya" => 0.6,
        _ => 1.0,
    }
}

/// Deterministic local estimate used when the pricing collaborator is
/// unreachable, so a renovation turn never fails outright.
pub fn fallback_estimate(request: &RenovationRequest) -> RenovationEstimate {
    let multiplier = region_multiplier(&request.region) * request.quality.multiplier();
    let mut breakdown = BTreeMap::new();

    let (total, duration_weeks) = match request.scope {
        RenovationScope::Full => {
            let total = FULL_COST_PER_SQM * request.total_area_sqm * multiplier;
            breakdown.insert("construction".to_string(), (total * 0.7) as i64);
            breakdown.insert("materials".to_string(), (total * 0.3) as i64);
            (total, 8)
        }
        RenovationScope::Kitchen => {
            let total = KITCHEN_UNIT_COST * multiplier;
            breakdown.insert("unit_price".to_string(), total as i64);
            (total, 1)
        }
        RenovationScope::Bath => {
            let total = BATH_UNIT_COST * multiplier;
            breakdown.insert("unit_price".to_string(), total as i64);
            (total, 2)
        }
        RenovationScope::WallpaperFlooring => {
            // Wall surface approximated as three times the floor area.
            let base = WALLPAPER_COST_PER_SQM * request.total_area_sqm * 3.0
                + FLOORING_COST_PER_SQM * request.total_area_sqm;
            let total = base * multiplier;
            breakdown.insert("materials".to_string(), (total * 0.4) as i64);
            breakdown.insert("labor".to_string(), (total * 0.6) as i64);
            (total, 2)
        }
    };

    RenovationEstimate { estimated_cost: total as i64, breakdown, duration_weeks }
}
