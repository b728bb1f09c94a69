use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use sumika_core::dispatch::{AgentError, AgentTurn, SpecializedAgent};
use sumika_core::domain::property::PropertyId;
use sumika_core::domain::viewing::{SlotDirectory, TourGenerator};
use sumika_core::mediation::RouteTarget;

const SLOTS_DEGRADED_MESSAGE: &str =
    "I couldn't reach the viewing calendar just now. Please try again in a moment.";

const TOUR_MARKERS: &[&str] = &["vr", "virtual", "3d", "walkthrough"];

fn referenced_property(text: &str) -> Option<PropertyId> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.windows(2).find_map(|window| {
        let [keyword, reference] = window else { return None };
        if keyword.eq_ignore_ascii_case("property") {
            let cleaned: String = reference
                .chars()
                .filter(|character| character.is_alphanumeric() || *character == '-')
                .collect();
            (!cleaned.is_empty()).then(|| PropertyId(cleaned))
        } else {
            None
        }
    })
}

fn wants_virtual_tour(text: &str) -> bool {
    let normalized = text.to_lowercase();
    TOUR_MARKERS.iter().any(|marker| {
        normalized.split(|c: char| !c.is_alphanumeric()).any(|token| token == *marker)
    })
}

/// Viewing pipeline: look up open slots for the referenced property and ask
/// the user to choose one. Read-only: booking is a follow-up turn, so no
/// consequential action is recorded here. A virtual-tour request adds a
/// generated walkthrough link when the tour engine is available.
pub struct ViewingAgent {
    slots: Arc<dyn SlotDirectory>,
    tours: Option<Arc<dyn TourGenerator>>,
}

impl ViewingAgent {
    pub fn new(slots: Arc<dyn SlotDirectory>) -> Self {
        Self { slots, tours: None }
    }

    pub fn with_tour_generator(mut self, tours: Arc<dyn TourGenerator>) -> Self {
        self.tours = Some(tours);
        self
    }
}

#[async_trait]
impl SpecializedAgent for ViewingAgent {
    fn route(&self) -> RouteTarget {
        RouteTarget::Viewing
    }

    async fn handle(&self, turn: &mut AgentTurn<'_>) -> Result<(), AgentError> {
        let text = turn.latest_user_message().unwrap_or_default().to_string();
        let property_id = referenced_property(&text);

        let slots = match self.slots.available_slots(property_id.as_ref()).await {
            Ok(slots) => slots,
            Err(service_error) => {
                warn!(
                    event_name = "viewing.slot_lookup_failed",
                    error = %service_error,
                    "slot directory call failed; degrading reply"
                );
                turn.reply(SLOTS_DEGRADED_MESSAGE);
                return Ok(());
            }
        };

        let tour_requested = wants_virtual_tour(&text);
        let mut tour = None;
        if tour_requested {
            if let Some(tours) = &self.tours {
                let target =
                    property_id.clone().unwrap_or_else(|| PropertyId("unspecified".to_string()));
                match tours.generate_tour(&target).await {
                    Ok(generated) => tour = Some(generated),
                    Err(service_error) => {
                        warn!(
                            event_name = "viewing.tour_generation_failed",
                            error = %service_error,
                            "tour generation failed; continuing without a tour link"
                        );
                    }
                }
            }
        }

        let section = turn.viewing_section()?;
        section.property_id = property_id;
        section.proposed_slots = slots.clone();
        section.tour = tour.clone();

        let slot_list =
            slots.iter().map(|slot| slot.label.as_str()).collect::<Vec<_>>().join(", ");
        let mut reply =
            format!("I have the following slots available: {slot_list}. Which one works for you?");
        if tour_requested {
            match &tour {
                Some(tour) => reply
                    .push_str(&format!("\n\nIn the meantime, here is a 3D walkthrough: {}", tour.url)),
                None => reply.push_str(
                    "\n\nThe 3D walkthrough service isn't available right now, but an in-person viewing can be arranged above.",
                ),
            }
        }
        turn.reply(reply);
        Ok(())
    }
}
