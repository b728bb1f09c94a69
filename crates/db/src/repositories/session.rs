use async_trait::async_trait;
use sqlx::Row;

use sumika_core::session::{SessionId, SessionState};

use crate::repositories::{RepositoryError, SessionStore};
use crate::DbPool;

/// Snapshot persistence: one JSON document per session, replaced atomically
/// with a single upsert at turn end.
#[derive(Clone)]
pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionState>, RepositoryError> {
        let row = sqlx::query("SELECT snapshot FROM session_snapshots WHERE session_id = ?1")
            .bind(&session_id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let snapshot: String = row.get("snapshot");
                let state = serde_json::from_str(&snapshot)
                    .map_err(|error| RepositoryError::Decode(error.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, state: &SessionState) -> Result<(), RepositoryError> {
        let snapshot = serde_json::to_string(state)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO session_snapshots (session_id, user_id, snapshot, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT (session_id) DO UPDATE
                SET snapshot = excluded.snapshot, updated_at = excluded.updated_at
            "#,
        )
        .bind(&state.session_id.0)
        .bind(&state.user_id.0)
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sumika_core::mediation::{RiskCategory, RouteTarget};
    use sumika_core::session::{Channel, Language, SessionId, SessionState, UserId};

    use crate::repositories::SessionStore;
    use crate::{connect_with_settings, migrations};

    use super::SqlSessionStore;

    async fn store() -> SqlSessionStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlSessionStore::new(pool)
    }

    fn state() -> SessionState {
        let mut state = SessionState::new(
            SessionId("thread-9".to_string()),
            UserId("user-9".to_string()),
            Channel::Line,
            Language::Ja,
        );
        state.begin_turn("物件を探して");
        state.record_classification(RiskCategory::Information, RouteTarget::Search);
        state
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let store = store().await;
        let original = state();

        store.save(&original).await.expect("save");
        let loaded = store
            .load(&SessionId("thread-9".to_string()))
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn save_replaces_the_previous_snapshot() {
        let store = store().await;
        let mut evolving = state();
        store.save(&evolving).await.expect("first save");

        evolving.begin_turn("もう一度");
        store.save(&evolving).await.expect("second save");

        let loaded = store
            .load(&SessionId("thread-9".to_string()))
            .await
            .expect("load")
            .expect("present");
        assert_eq!(loaded.turn_count, 2);
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let store = store().await;
        let loaded = store.load(&SessionId("missing".to_string())).await.expect("load");
        assert!(loaded.is_none());
    }
}
