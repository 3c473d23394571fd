use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Upstream supplier the accounts are bought from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ProviderStatus,
    /// Names of the services this provider supplies, free-form.
    pub services: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProvider {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "phone must not be empty"))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub status: ProviderStatus,
    #[serde(default)]
    pub services: Vec<String>,
}

impl Provider {
    pub fn new(draft: NewProvider) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            status: draft.status,
            services: draft.services,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, draft: NewProvider) {
        self.name = draft.name;
        self.email = draft.email;
        self.phone = draft.phone;
        self.address = draft.address;
        self.status = draft.status;
        self.services = draft.services;
    }
}
