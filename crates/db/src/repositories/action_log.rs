use async_trait::async_trait;

use sumika_core::audit::{ActionLog, ActionLogError, ActionRecord};

use crate::DbPool;

/// SQLite adapter for the audit ledger write contract. Append-only: there
/// is deliberately no update or delete path through this repository.
#[derive(Clone)]
pub struct SqlActionLogRepository {
    pool: DbPool,
}

impl SqlActionLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActionLog for SqlActionLogRepository {
    async fn append(&self, record: ActionRecord) -> Result<(), ActionLogError> {
        sqlx::query(
            r#"
            INSERT INTO action_logs
                (id, user_id, action_name, action_inputs, action_outputs,
                 permission_level, execution_status, executed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.user_id)
        .bind(&record.action_name)
        .bind(record.inputs.to_string())
        .bind(record.outputs.to_string())
        .bind(record.permission_level.as_str())
        .bind(record.status.as_str())
        .bind(record.executed_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| ActionLogError::Write(error.to_string()))?;
        Ok(())
    }
}
