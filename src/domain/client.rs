use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a client, also accepted as the full-replace update body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewClient {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "phone must not be empty"))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl Client {
    pub fn new(draft: NewClient) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            created_at: Utc::now(),
        }
    }

    /// Applies a full-replace edit, keeping identity and registration date.
    pub fn apply(&mut self, draft: NewClient) {
        self.name = draft.name;
        self.email = draft.email;
        self.phone = draft.phone;
        self.address = draft.address;
    }
}
