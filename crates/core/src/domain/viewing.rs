use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborator::ServiceError;
use crate::domain::property::PropertyId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewingSlot {
    pub slot_id: String,
    pub label: String,
}

impl ViewingSlot {
    pub fn new(slot_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { slot_id: slot_id.into(), label: label.into() }
    }
}

/// Slot lookup is read-only; booking happens in a later turn, so no
/// consequential action is recorded here.
#[async_trait]
pub trait SlotDirectory: Send + Sync {
    async fn available_slots(
        &self,
        property_id: Option<&PropertyId>,
    ) -> Result<Vec<ViewingSlot>, ServiceError>;
}

/// Deterministic directory used until a real scheduling back-end exists.
#[derive(Clone, Debug, Default)]
pub struct FixedSlotDirectory;

#[async_trait]
impl SlotDirectory for FixedSlotDirectory {
    async fn available_slots(
        &self,
        _property_id: Option<&PropertyId>,
    ) -> Result<Vec<ViewingSlot>, ServiceError> {
        Ok(vec![
            ViewingSlot::new("slot-1", "Tomorrow 10:00 AM"),
            ViewingSlot::new("slot-2", "Tomorrow 2:00 PM"),
            ViewingSlot::new("slot-3", "Saturday 11:00 AM"),
        ])
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TourRef {
    pub tour_id: String,
    pub url: String,
}

/// 3-D walkthrough generation. Slow (up to a minute); callers must budget
/// the full `TOUR_GENERATION_TIMEOUT` and degrade when it is exceeded.
#[async_trait]
pub trait TourGenerator: Send + Sync {
    async fn generate_tour(&self, property_id: &PropertyId) -> Result<TourRef, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::{FixedSlotDirectory, SlotDirectory};

    #[tokio::test]
    async fn fixed_directory_always_offers_three_slots() {
        let directory = FixedSlotDirectory;
        let slots = directory.available_slots(None).await.expect("fixed directory never fails");
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].label, "Tomorrow 10:00 AM");
    }
}
