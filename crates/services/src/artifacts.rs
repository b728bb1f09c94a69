use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use sumika_core::collaborator::ServiceError;
use sumika_core::domain::transaction::{ArtifactGenerator, ArtifactRef};

/// Produces durable artifact references under a documents prefix. Rendering
/// of the actual PDF happens downstream in the document pipeline; the
/// reference returned here is what the audit record and the user-facing
/// reply cite.
pub struct LocalArtifactGenerator {
    base_path: String,
}

impl LocalArtifactGenerator {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self { base_path: base_path.into() }
    }
}

impl Default for LocalArtifactGenerator {
    fn default() -> Self {
        Self::new("documents")
    }
}

#[async_trait]
impl ArtifactGenerator for LocalArtifactGenerator {
    async fn generate(&self, kind: &str, _payload: &Value) -> Result<ArtifactRef, ServiceError> {
        let artifact_id = format!("{kind}-{}", Uuid::new_v4());
        let location = format!("{}/{artifact_id}.pdf", self.base_path.trim_end_matches('/'));
        Ok(ArtifactRef { artifact_id, location })
    }
}
