use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use sumika_db::DbPool;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    service: &'static str,
    database: bool,
}

async fn health(State(pool): State<DbPool>) -> (StatusCode, Json<HealthBody>) {
    let database = sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok();
    let (status_code, status) =
        if database { (StatusCode::OK, "ok") } else { (StatusCode::SERVICE_UNAVAILABLE, "degraded") };
    (status_code, Json(HealthBody { status, service: "sumika-orchestrator", database }))
}

pub fn router(pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(pool)
}
