use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sumika_core::dispatch::{AgentError, AgentTurn, SpecializedAgent};
use sumika_core::domain::property::{Property, PropertyStore, SearchFilters};
use sumika_core::mediation::RouteTarget;

use crate::extract::{first_price, format_jpy};

const NO_RESULTS_MESSAGE: &str =
    "I couldn't find any properties matching your criteria. Could you try broadening your search?";

const SEARCH_DEGRADED_MESSAGE: &str =
    "Property search is temporarily unavailable. Please try again in a moment.";

// Marker → canonical ward name, English and Japanese spellings.
const WARDS: &[(&str, &str)] = &[
    ("shibuya", "Shibuya"),
    ("渋谷", "Shibuya"),
    ("minato", "Minato"),
    ("港区", "Minato"),
    ("shinjuku", "Shinjuku"),
    ("新宿", "Shinjuku"),
    ("meguro", "Meguro"),
    ("目黒", "Meguro"),
    ("setagaya", "Setagaya"),
    ("世田谷", "Setagaya"),
    ("shinagawa", "Shinagawa"),
    ("品川", "Shinagawa"),
    ("bunkyo", "Bunkyo"),
    ("文京", "Bunkyo"),
    ("koto", "Koto"),
    ("江東", "Koto"),
];

const UPPER_BOUND_MARKERS: &[&str] =
    &["under", "below", "max", "at most", "less than", "within", "以下", "まで"];
const LOWER_BOUND_MARKERS: &[&str] = &["over", "above", "at least", "more than", "from", "以上"];

/// Extracts listing filters from a free-text request.
pub fn extract_filters(text: &str) -> SearchFilters {
    let normalized = text.to_lowercase();
    let mut filters = SearchFilters::default();

    filters.ward = WARDS
        .iter()
        .find(|(marker, _)| normalized.contains(marker))
        .map(|(_, canonical)| canonical.to_string());

    if let Some(price) = first_price(&normalized) {
        if UPPER_BOUND_MARKERS.iter().any(|marker| normalized.contains(marker)) {
            filters.max_price = Some(price);
        } else if LOWER_BOUND_MARKERS.iter().any(|marker| normalized.contains(marker)) {
            filters.min_price = Some(price);
        } else {
            // Default reading: a stated amount is a budget ceiling.
            filters.max_price = Some(price);
        }
    }

    filters.floor_plan = normalized
        .split(|character: char| !character.is_alphanumeric())
        .find(|token| {
            token.len() >= 2
                && token.ends_with("ldk")
                && token.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .map(str::to_uppercase);

    filters.min_area_sqm = extract_min_area(&normalized);

    filters
}

fn extract_min_area(normalized: &str) -> Option<f64> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    for window in tokens.windows(2) {
        let [value, unit] = window else { continue };
        if matches!(*unit, "sqm" | "m2" | "㎡" | "平米") {
            if let Ok(area) = value.parse::<f64>() {
                return Some(area);
            }
        }
    }
    None
}

fn render_results(results: &[Property]) -> String {
    let bullet_points = results
        .iter()
        .map(|property| format!("- {} ({})", property.title, format_jpy(property.listing_price)))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "I found {} properties for you:\n{}\n\nWould you like to see details or book a viewing for any of these?",
        results.len(),
        bullet_points
    )
}

/// Search pipeline: extract filters → query the property store → render a
/// ranked list. Filters and the shortlist persist in the search section.
pub struct SearchAgent {
    store: Arc<dyn PropertyStore>,
}

impl SearchAgent {
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SpecializedAgent for SearchAgent {
    fn route(&self) -> RouteTarget {
        RouteTarget::Search
    }

    async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
        let text = turn.latest_user_message().unwrap_or_default().to_string();
        let filters = extract_filters(&text);

        let results = match self.store.search(&filters).await {
            Ok(results) => results,
            Err(service_error) => {
                warn!(
                    event_name = "search.store_unavailable",
                    error = %service_error,
                    "property store call failed; degrading reply"
                );
                turn.reply(SEARCH_DEGRADED_MESSAGE);
                return Ok(());
            }
        };

        let section = turn.search_section()?;
        section.filters = filters;
        section.shortlist = results.iter().map(|property| property.id.clone()).collect();

        if results.is_empty() {
            turn.reply(NO_RESULTS_MESSAGE);
        } else {
            turn.reply(render_results(&results));
        }
        Ok(())
    }
}
