use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Default slot count for a service created without an explicit capacity.
/// Historically inferred from the name: Netflix plans sell five profiles,
/// everything else four.
pub fn capacity_for(service_name: &str) -> i32 {
    if service_name.to_lowercase().contains("netflix") {
        5
    } else {
        4
    }
}

/// A streaming product sold per profile slot. `slot_capacity` is the number
/// of profiles an account of this service can hold; new accounts copy it
/// into their counters at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub link: String,
    pub slot_capacity: i32,
    /// Default monthly price for profiles on this service.
    pub price: f64,
    pub provider_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewService {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link: String,
    /// Omitted means "use the name-based default".
    #[validate(range(min = 1, max = 20))]
    pub slot_capacity: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price: f64,
    pub provider_id: Uuid,
}

impl Service {
    pub fn new(draft: NewService) -> Self {
        let slot_capacity = draft.slot_capacity.unwrap_or_else(|| capacity_for(&draft.name));
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            image_url: draft.image_url,
            link: draft.link,
            slot_capacity,
            price: draft.price,
            provider_id: draft.provider_id,
            created_at: Utc::now(),
        }
    }

    /// Full-replace edit. A draft without a capacity keeps the current one
    /// rather than re-deriving it from the (possibly renamed) service name.
    pub fn apply(&mut self, draft: NewService) {
        self.slot_capacity = draft.slot_capacity.unwrap_or(self.slot_capacity);
        self.name = draft.name;
        self.description = draft.description;
        self.image_url = draft.image_url;
        self.link = draft.link;
        self.price = draft.price;
        self.provider_id = draft.provider_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netflix_plans_default_to_five_slots() {
        assert_eq!(capacity_for("Netflix Premium"), 5);
        assert_eq!(capacity_for("NETFLIX 4K"), 5);
    }

    #[test]
    fn other_services_default_to_four_slots() {
        assert_eq!(capacity_for("HBO Max"), 4);
        assert_eq!(capacity_for("Disney+"), 4);
        assert_eq!(capacity_for(""), 4);
    }

    fn draft(name: &str, slot_capacity: Option<i32>) -> NewService {
        NewService {
            name: name.to_string(),
            description: String::new(),
            image_url: String::new(),
            link: String::new(),
            slot_capacity,
            price: 12.0,
            provider_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn explicit_capacity_wins_over_name_default() {
        let service = Service::new(draft("Netflix Estándar", Some(2)));
        assert_eq!(service.slot_capacity, 2);
    }

    #[test]
    fn missing_capacity_falls_back_to_name_default() {
        assert_eq!(Service::new(draft("Netflix Premium", None)).slot_capacity, 5);
        assert_eq!(Service::new(draft("Paramount+", None)).slot_capacity, 4);
    }

    #[test]
    fn apply_without_capacity_keeps_the_stored_one() {
        let mut service = Service::new(draft("Netflix Premium", None));
        service.apply(draft("Max", None));
        assert_eq!(service.slot_capacity, 5);
        assert_eq!(service.name, "Max");
    }
}
