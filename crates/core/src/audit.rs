use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Autonomous,
    UserApproval,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autonomous => "autonomous",
            Self::UserApproval => "user_approval",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    PendingApproval,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One consequential action taken by a specialized agent. Entries are
/// created once and never mutated afterward; the ledger is append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub action_name: String,
    pub inputs: Value,
    pub outputs: Value,
    pub permission_level: PermissionLevel,
    pub status: ExecutionStatus,
    pub executed_at: DateTime<Utc>,
}

impl ActionRecord {
    /// Autonomous actions are complete the moment they are logged;
    /// approval-gated actions start out pending a human decision.
    pub fn new(
        user_id: impl Into<String>,
        action_name: impl Into<String>,
        permission_level: PermissionLevel,
    ) -> Self {
        let status = match permission_level {
            PermissionLevel::Autonomous => ExecutionStatus::Completed,
            PermissionLevel::UserApproval => ExecutionStatus::PendingApproval,
        };
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            action_name: action_name.into(),
            inputs: Value::Null,
            outputs: Value::Null,
            permission_level,
            status,
            executed_at: Utc::now(),
        }
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Value) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Error)]
pub enum ActionLogError {
    #[error("audit write failed: {0}")]
    Write(String),
}

/// Write side of the audit ledger. The core never reads entries back;
/// ownership passes to the logging collaborator on append.
#[async_trait]
pub trait ActionLog: Send + Sync {
    async fn append(&self, record: ActionRecord) -> Result<(), ActionLogError>;
}

#[derive(Clone, Default)]
pub struct InMemoryActionLog {
    records: Arc<Mutex<Vec<ActionRecord>>>,
}

impl InMemoryActionLog {
    pub fn records(&self) -> Vec<ActionRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ActionLog for InMemoryActionLog {
    async fn append(&self, record: ActionRecord) -> Result<(), ActionLogError> {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ActionLog, ActionRecord, ExecutionStatus, InMemoryActionLog, PermissionLevel};

    #[tokio::test]
    async fn in_memory_log_records_appends() {
        let log = InMemoryActionLog::default();
        log.append(
            ActionRecord::new("user-1", "SUBMIT_MORTGAGE_PREAPPROVAL", PermissionLevel::UserApproval)
                .with_inputs(json!({"amount": 60_000_000}))
                .with_outputs(json!({"application_id": "MG-1"})),
        )
        .await
        .expect("in-memory append never fails");

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_name, "SUBMIT_MORTGAGE_PREAPPROVAL");
        assert_eq!(records[0].permission_level, PermissionLevel::UserApproval);
        assert_eq!(records[0].status, ExecutionStatus::PendingApproval);
        assert_eq!(records[0].inputs["amount"], 60_000_000);
    }

    #[test]
    fn autonomous_actions_default_to_completed() {
        let record =
            ActionRecord::new("user-1", "GENERATE_RENOVATION_QUOTE", PermissionLevel::Autonomous);
        assert_eq!(record.status, ExecutionStatus::Completed);
    }
}
