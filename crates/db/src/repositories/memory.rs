use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sumika_core::collaborator::ServiceError;
use sumika_core::domain::property::{Property, PropertyStore, SearchFilters};
use sumika_core::session::{SessionId, SessionState};

use crate::repositories::{RepositoryError, SessionStore};

/// In-memory property store for tests and offline development.
#[derive(Clone, Default)]
pub struct InMemoryPropertyStore {
    listings: Arc<Mutex<Vec<Property>>>,
}

impl InMemoryPropertyStore {
    pub fn with_listings(listings: Vec<Property>) -> Self {
        Self { listings: Arc::new(Mutex::new(listings)) }
    }

    pub fn insert(&self, property: Property) {
        match self.listings.lock() {
            Ok(mut listings) => listings.push(property),
            Err(poisoned) => poisoned.into_inner().push(property),
        }
    }
}

fn matches(filters: &SearchFilters, property: &Property) -> bool {
    filters.ward.as_deref().map_or(true, |ward| property.ward == ward)
        && filters.min_price.map_or(true, |floor| property.listing_price >= floor)
        && filters.max_price.map_or(true, |cap| property.listing_price <= cap)
        && filters.min_area_sqm.map_or(true, |area| property.total_area_sqm >= area)
        && filters
            .floor_plan
            .as_deref()
            .map_or(true, |plan| property.floor_plan.as_deref() == Some(plan))
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn search(&self, filters: &SearchFilters) -> Result<Vec<Property>, ServiceError> {
        let listings = match self.listings.lock() {
            Ok(listings) => listings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        let mut results: Vec<Property> =
            listings.into_iter().filter(|property| matches(filters, property)).collect();
        results.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        results.truncate(filters.limit as usize);
        Ok(results)
    }
}

/// In-memory session store for tests and offline development.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionState>>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionState>, RepositoryError> {
        let sessions = match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(sessions.get(&session_id.0).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<(), RepositoryError> {
        let mut sessions = match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.insert(state.session_id.0.clone(), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use sumika_core::domain::property::{Property, PropertyId, PropertyStore, SearchFilters};
    use sumika_core::session::{Channel, Language, SessionId, SessionState, UserId};

    use crate::repositories::SessionStore;

    use super::{InMemoryPropertyStore, InMemorySessionStore};

    fn listing(id: &str, ward: &str, price: i64) -> Property {
        Property {
            id: PropertyId(id.to_string()),
            title: format!("Listing {id}"),
            ward: ward.to_string(),
            address: format!("Tokyo, {ward}"),
            listing_price: price,
            total_area_sqm: 60.0,
            floor_plan: Some("2LDK".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn filters_and_caps_results() {
        let store = InMemoryPropertyStore::with_listings(vec![
            listing("p1", "Shibuya", 70_000_000),
            listing("p2", "Shibuya", 95_000_000),
            listing("p3", "Minato", 60_000_000),
        ]);

        let results = store
            .search(&SearchFilters {
                ward: Some("Shibuya".to_string()),
                max_price: Some(80_000_000),
                ..Default::default()
            })
            .await
            .expect("search succeeds");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, PropertyId("p1".to_string()));
    }

    #[tokio::test]
    async fn session_store_round_trips() {
        let store = InMemorySessionStore::default();
        let state = SessionState::new(
            SessionId("thread-1".to_string()),
            UserId("user-1".to_string()),
            Channel::Web,
            Language::En,
        );

        store.save(&state).await.expect("save");
        let loaded =
            store.load(&SessionId("thread-1".to_string())).await.expect("load").expect("present");
        assert_eq!(loaded, state);
    }
}
