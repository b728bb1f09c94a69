use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use sumika_core::collaborator::{ServiceError, ServiceKind};
use sumika_core::domain::property::{Property, PropertyId, PropertyStore, SearchFilters};

use crate::DbPool;

/// SQLite-backed property store. Newest listings rank first; the agent
/// renders results in the order returned here.
#[derive(Clone)]
pub struct SqlPropertyRepository {
    pool: DbPool,
}

impl SqlPropertyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Property, ServiceError> {
    let created_at_raw: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| ServiceError::MalformedResponse {
            service: ServiceKind::PropertySearch,
            message: format!("bad created_at `{created_at_raw}`: {error}"),
        })?;

    Ok(Property {
        id: PropertyId(row.get("id")),
        title: row.get("title"),
        ward: row.get("ward"),
        address: row.get("address"),
        listing_price: row.get("listing_price"),
        total_area_sqm: row.get("total_area_sqm"),
        floor_plan: row.get("floor_plan"),
        created_at,
    })
}

#[async_trait]
impl PropertyStore for SqlPropertyRepository {
    async fn search(&self, filters: &SearchFilters) -> Result<Vec<Property>, ServiceError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, title, ward, address, listing_price, total_area_sqm, floor_plan, created_at \
             FROM properties WHERE 1=1",
        );

        if let Some(ward) = &filters.ward {
            builder.push(" AND ward = ").push_bind(ward);
        }
        if let Some(min_price) = filters.min_price {
            builder.push(" AND listing_price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filters.max_price {
            builder.push(" AND listing_price <= ").push_bind(max_price);
        }
        if let Some(min_area_sqm) = filters.min_area_sqm {
            builder.push(" AND total_area_sqm >= ").push_bind(min_area_sqm);
        }
        if let Some(floor_plan) = &filters.floor_plan {
            builder.push(" AND floor_plan = ").push_bind(floor_plan);
        }
        builder.push(" ORDER BY created_at DESC LIMIT ").push_bind(i64::from(filters.limit));

        let rows = builder.build().fetch_all(&self.pool).await.map_err(|error| {
            ServiceError::Transport {
                service: ServiceKind::PropertySearch,
                message: error.to_string(),
            }
        })?;

        rows.iter().map(decode_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use sumika_core::domain::property::{PropertyStore, SearchFilters};

    use crate::fixtures::seed_properties;
    use crate::{connect_with_settings, migrations};

    use super::SqlPropertyRepository;

    async fn seeded_repository() -> SqlPropertyRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        seed_properties(&pool).await.expect("seed");
        SqlPropertyRepository::new(pool)
    }

    #[tokio::test]
    async fn filters_by_ward_and_price_cap() {
        let repository = seeded_repository().await;
        let filters = SearchFilters {
            ward: Some("Shibuya".to_string()),
            max_price: Some(80_000_000),
            ..Default::default()
        };

        let results = repository.search(&filters).await.expect("search succeeds");
        assert!(!results.is_empty());
        for property in &results {
            assert_eq!(property.ward, "Shibuya");
            assert!(property.listing_price <= 80_000_000);
        }
    }

    #[tokio::test]
    async fn unconstrained_search_is_capped() {
        let repository = seeded_repository().await;
        let results =
            repository.search(&SearchFilters::default()).await.expect("search succeeds");
        assert!(results.len() <= 5);
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn disjoint_filters_return_empty() {
        let repository = seeded_repository().await;
        let filters = SearchFilters {
            ward: Some("Shibuya".to_string()),
            max_price: Some(1_000),
            ..Default::default()
        };
        let results = repository.search(&filters).await.expect("search succeeds");
        assert!(results.is_empty());
    }
}
