use chrono::{Duration, Utc};
use sqlx::Row;

use crate::repositories::RepositoryError;
use crate::DbPool;

/// Seeds a small set of Tokyo listings for development and tests. No-op if
/// the properties table already has rows. Returns the number of rows
/// inserted.
pub async fn seed_properties(pool: &DbPool) -> Result<u64, RepositoryError> {
    let existing =
        sqlx::query("SELECT COUNT(*) AS count FROM properties").fetch_one(pool).await?;
    if existing.get::<i64, _>("count") > 0 {
        return Ok(0);
    }

    let now = Utc::now();
    let listings: &[(&str, &str, &str, &str, i64, f64, &str)] = &[
        (
            "prop-shibuya-001",
            "Luxury Condo in Shibuya",
            "Shibuya",
            "2-10-1 Dogenzaka, Shibuya-ku, Tokyo",
            85_000_000,
            72.5,
            "2LDK",
        ),
        (
            "prop-shibuya-002",
            "Cozy Apartment near Shibuya Station",
            "Shibuya",
            "1-5-8 Udagawacho, Shibuya-ku, Tokyo",
            45_000_000,
            48.0,
            "1LDK",
        ),
        (
            "prop-shibuya-003",
            "Renovated 2LDK on the Yamanote Line",
            "Shibuya",
            "3-21-4 Ebisu, Shibuya-ku, Tokyo",
            78_000_000,
            64.0,
            "2LDK",
        ),
        (
            "prop-minato-001",
            "Minato Residence with Tower View",
            "Minato",
            "4-2-2 Roppongi, Minato-ku, Tokyo",
            120_000_000,
            88.0,
            "3LDK",
        ),
        (
            "prop-setagaya-001",
            "Family Home in Setagaya",
            "Setagaya",
            "5-11-9 Kyodo, Setagaya-ku, Tokyo",
            62_000_000,
            75.0,
            "3LDK",
        ),
    ];

    let mut inserted = 0;
    for (offset, (id, title, ward, address, price, area, floor_plan)) in
        listings.iter().enumerate()
    {
        // Stagger timestamps so ORDER BY created_at DESC is deterministic.
        let created_at = now - Duration::minutes(offset as i64);
        let result = sqlx::query(
            r#"
            INSERT INTO properties
                (id, title, ward, address, listing_price, total_area_sqm, floor_plan, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(ward)
        .bind(address)
        .bind(price)
        .bind(area)
        .bind(floor_plan)
        .bind(created_at.to_rfc3339())
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}
