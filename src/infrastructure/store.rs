use crate::domain::{Account, Client, Profile, Provider, Service};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write found the record changed since it was read.
    /// Callers re-read and retry; they never see this after success.
    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: &Client) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Client, StoreError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<Client>, StoreError>;
    async fn update(&self, client: &Client) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn create(&self, provider: &Provider) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Provider, StoreError>;
    async fn list(&self) -> Result<Vec<Provider>, StoreError>;
    async fn update(&self, provider: &Provider) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn create(&self, service: &Service) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Service, StoreError>;
    async fn list(&self) -> Result<Vec<Service>, StoreError>;
    async fn update(&self, service: &Service) -> Result<(), StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create(&self, account: &Account) -> Result<(), StoreError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Account, StoreError>;
    async fn list(&self) -> Result<Vec<Account>, StoreError>;
    /// Writes the detail columns and bumps `version`; slot counters are
    /// untouched. Counter moves go through the compound profile writes.
    async fn update_details(&self, account: &Account) -> Result<(), StoreError>;
    /// Removes the account and, through the schema, its profiles.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
    async fn count_by_service(&self, service_id: Uuid) -> Result<i64, StoreError>;
    /// Total free slots across every account.
    async fn sum_free_slots(&self) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Profile, StoreError>;
    async fn list(&self) -> Result<Vec<Profile>, StoreError>;
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Profile>, StoreError>;
    /// Writes the editable detail columns (name, PIN, phone, price flags).
    async fn update_details(&self, profile: &Profile) -> Result<(), StoreError>;
    /// Replaces the lease window. Slot counters stay where they are.
    async fn renew(
        &self,
        id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Inserts `profile` and writes `account`'s slot counters as one
    /// all-or-nothing transaction. `account` carries the adjusted counters
    /// but the version it was read at; if the stored version has moved on,
    /// nothing is written and the call fails with [`StoreError::Conflict`].
    async fn insert_with_account(
        &self,
        profile: &Profile,
        account: &Account,
    ) -> Result<(), StoreError>;

    /// Deletes the profile and writes `account`'s slot counters as one
    /// all-or-nothing transaction, under the same version condition as
    /// [`insert_with_account`](Self::insert_with_account).
    async fn delete_with_account(
        &self,
        profile_id: Uuid,
        account: &Account,
    ) -> Result<(), StoreError>;
}
