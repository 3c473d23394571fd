use crate::domain::{renewal_window, Account, AccountPatch, NewAccount, NewProfile, Profile};
use crate::infrastructure::{AccountRepository, ProfileRepository, ServiceRepository, StoreError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts a mutating slot operation makes before giving up. Each attempt
/// re-reads the account, so a retry only loses to another writer that landed
/// in between.
const MAX_TX_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no free profile slot on this account (capacity {limit})")]
    CapacityExceeded { limit: i32 },

    #[error("write conflict persisted after {attempts} attempts")]
    TransactionConflict { attempts: u32 },

    #[error("invalid input: {0}")]
    Validation(String),
}

/// Owns every write that can move an account's slot counters, keeping
/// `free + occupied == capacity` true under concurrent use. Reads an
/// account, adjusts the counters in memory and commits through the store's
/// version-checked compound writes, retrying a bounded number of times.
pub struct SlotLedgerService<A, P, S>
where
    A: AccountRepository,
    P: ProfileRepository,
    S: ServiceRepository,
{
    account_repo: Arc<A>,
    profile_repo: Arc<P>,
    service_repo: Arc<S>,
}

impl<A, P, S> SlotLedgerService<A, P, S>
where
    A: AccountRepository,
    P: ProfileRepository,
    S: ServiceRepository,
{
    pub fn new(account_repo: Arc<A>, profile_repo: Arc<P>, service_repo: Arc<S>) -> Self {
        Self {
            account_repo,
            profile_repo,
            service_repo,
        }
    }

    /// Creates an account for an existing service. The slot counters start
    /// at the service's capacity, all free.
    pub async fn create_account(&self, draft: NewAccount) -> Result<Account, LedgerError> {
        draft
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let service = self.service_repo.get_by_id(draft.service_id).await?;
        let account = Account::new(draft, service.id, service.name.clone(), service.slot_capacity);
        self.account_repo.create(&account).await?;

        info!(
            "Created account {} on {} with {} slots",
            account.id, service.name, service.slot_capacity
        );
        Ok(account)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Account, LedgerError> {
        Ok(self.account_repo.get_by_id(id).await?)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.account_repo.list().await?)
    }

    /// Edits detail fields only; counters cannot be patched from outside.
    pub async fn update_account(&self, id: Uuid, patch: AccountPatch) -> Result<Account, LedgerError> {
        let mut account = self.account_repo.get_by_id(id).await?;
        account.apply(patch);
        self.account_repo.update_details(&account).await?;
        Ok(account)
    }

    /// Removes the account together with every profile sold on it.
    pub async fn delete_account(&self, id: Uuid) -> Result<(), LedgerError> {
        self.account_repo.delete(id).await?;
        info!("Deleted account {} and its profiles", id);
        Ok(())
    }

    /// Free slots summed across the whole inventory.
    pub async fn available_slots(&self) -> Result<i64, LedgerError> {
        Ok(self.account_repo.sum_free_slots().await?)
    }

    pub async fn count_accounts(&self) -> Result<i64, LedgerError> {
        Ok(self.account_repo.count().await?)
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<Profile, LedgerError> {
        Ok(self.profile_repo.get_by_id(id).await?)
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, LedgerError> {
        Ok(self.profile_repo.list().await?)
    }

    pub async fn profiles_for_account(&self, account_id: Uuid) -> Result<Vec<Profile>, LedgerError> {
        Ok(self.profile_repo.list_by_account(account_id).await?)
    }

    /// Sells one slot: inserts the profile and moves a slot from free to
    /// occupied in the same conditional write. Fails with
    /// [`LedgerError::CapacityExceeded`] before touching the store when the
    /// account is full.
    pub async fn create_profile(
        &self,
        account_id: Uuid,
        draft: NewProfile,
    ) -> Result<Profile, LedgerError> {
        draft
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        for attempt in 1..=MAX_TX_ATTEMPTS {
            let account = self.account_repo.get_by_id(account_id).await?;
            let service = self.service_repo.get_by_id(account.service_id).await?;

            let updated = match account.take_slot() {
                Some(next) => next,
                None => {
                    return Err(LedgerError::CapacityExceeded {
                        limit: service.slot_capacity,
                    })
                }
            };

            let profile = draft.clone().into_profile(account_id, service.price);
            match self.profile_repo.insert_with_account(&profile, &updated).await {
                Ok(()) => {
                    info!(
                        "Created profile {} on account {} ({} slots left)",
                        profile.id, account_id, updated.free_slots
                    );
                    return Ok(profile);
                }
                Err(StoreError::Conflict(reason)) => {
                    warn!(
                        "Profile create on account {} lost attempt {}: {}",
                        account_id, attempt, reason
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::TransactionConflict {
            attempts: MAX_TX_ATTEMPTS,
        })
    }

    /// Frees one slot: deletes the profile and hands its slot back in the
    /// same conditional write. The free counter is capped at the service's
    /// current capacity, so accounts with drifted counters converge instead
    /// of inflating.
    pub async fn delete_profile(&self, profile_id: Uuid) -> Result<(), LedgerError> {
        for attempt in 1..=MAX_TX_ATTEMPTS {
            let profile = self.profile_repo.get_by_id(profile_id).await?;
            let account = self.account_repo.get_by_id(profile.account_id).await?;
            let service = self.service_repo.get_by_id(account.service_id).await?;

            let updated = account.release_slot(service.slot_capacity);
            match self
                .profile_repo
                .delete_with_account(profile_id, &updated)
                .await
            {
                Ok(()) => {
                    info!(
                        "Deleted profile {} from account {} ({} slots free)",
                        profile_id, account.id, updated.free_slots
                    );
                    return Ok(());
                }
                Err(StoreError::Conflict(reason)) => {
                    warn!(
                        "Profile delete on account {} lost attempt {}: {}",
                        account.id, attempt, reason
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::TransactionConflict {
            attempts: MAX_TX_ATTEMPTS,
        })
    }

    /// Starts a fresh lease today for the given number of 30-day months.
    /// Renewal never moves slot counters; the slot stays occupied.
    pub async fn renew_profile(
        &self,
        profile_id: Uuid,
        duration_months: i32,
    ) -> Result<Profile, LedgerError> {
        if duration_months < 1 {
            return Err(LedgerError::Validation(
                "renewal duration must be at least one month".to_string(),
            ));
        }

        let mut profile = self.profile_repo.get_by_id(profile_id).await?;
        let (start_date, end_date) = renewal_window(Utc::now(), duration_months);
        self.profile_repo.renew(profile_id, start_date, end_date).await?;

        profile.start_date = start_date;
        profile.end_date = end_date;
        info!(
            "Renewed profile {} for {} month(s), ends {}",
            profile_id, duration_months, end_date
        );
        Ok(profile)
    }

    /// Edits the display fields of a profile. `pin` replaces the stored PIN;
    /// `None` or an empty string clears it.
    pub async fn update_profile(
        &self,
        profile_id: Uuid,
        profile_name: String,
        pin: Option<String>,
    ) -> Result<Profile, LedgerError> {
        if profile_name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "profile name must not be empty".to_string(),
            ));
        }

        let mut profile = self.profile_repo.get_by_id(profile_id).await?;
        profile.profile_name = profile_name;
        profile.pin = pin.filter(|pin| !pin.is_empty());
        self.profile_repo.update_details(&profile).await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Service;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use mockall::Sequence;

    mock! {
        Accounts {}

        #[async_trait]
        impl AccountRepository for Accounts {
            async fn create(&self, account: &Account) -> Result<(), StoreError>;
            async fn get_by_id(&self, id: Uuid) -> Result<Account, StoreError>;
            async fn list(&self) -> Result<Vec<Account>, StoreError>;
            async fn update_details(&self, account: &Account) -> Result<(), StoreError>;
            async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
            async fn count(&self) -> Result<i64, StoreError>;
            async fn count_by_service(&self, service_id: Uuid) -> Result<i64, StoreError>;
            async fn sum_free_slots(&self) -> Result<i64, StoreError>;
        }
    }

    mock! {
        Profiles {}

        #[async_trait]
        impl ProfileRepository for Profiles {
            async fn get_by_id(&self, id: Uuid) -> Result<Profile, StoreError>;
            async fn list(&self) -> Result<Vec<Profile>, StoreError>;
            async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Profile>, StoreError>;
            async fn update_details(&self, profile: &Profile) -> Result<(), StoreError>;
            async fn renew(
                &self,
                id: Uuid,
                start_date: DateTime<Utc>,
                end_date: DateTime<Utc>,
            ) -> Result<(), StoreError>;
            async fn insert_with_account(
                &self,
                profile: &Profile,
                account: &Account,
            ) -> Result<(), StoreError>;
            async fn delete_with_account(
                &self,
                profile_id: Uuid,
                account: &Account,
            ) -> Result<(), StoreError>;
        }
    }

    mock! {
        Services {}

        #[async_trait]
        impl ServiceRepository for Services {
            async fn create(&self, service: &Service) -> Result<(), StoreError>;
            async fn get_by_id(&self, id: Uuid) -> Result<Service, StoreError>;
            async fn list(&self) -> Result<Vec<Service>, StoreError>;
            async fn update(&self, service: &Service) -> Result<(), StoreError>;
            async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
            async fn count(&self) -> Result<i64, StoreError>;
        }
    }

    fn account_fixture(id: Uuid, service_id: Uuid, free: i32, occupied: i32) -> Account {
        Account {
            id,
            login: "owner@mail.com".to_string(),
            service_id,
            service_name: "Netflix Premium".to_string(),
            billing_date: Utc::now(),
            note: String::new(),
            email_password: String::new(),
            account_password: String::new(),
            free_slots: free,
            occupied_slots: occupied,
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn service_fixture(id: Uuid, capacity: i32) -> Service {
        Service {
            id,
            name: "Netflix Premium".to_string(),
            description: String::new(),
            image_url: String::new(),
            link: String::new(),
            slot_capacity: capacity,
            price: 4.0,
            provider_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    fn profile_draft() -> NewProfile {
        NewProfile {
            client_id: Uuid::new_v4(),
            client_name: "Ana Paredes".to_string(),
            profile_name: "ANA".to_string(),
            pin: Some("1234".to_string()),
            phone: "0991234567".to_string(),
            start_date: None,
            duration_months: None,
            generates_payment: true,
            price: None,
        }
    }

    fn profile_fixture(id: Uuid, account_id: Uuid) -> Profile {
        let mut profile = profile_draft().into_profile(account_id, 4.0);
        profile.id = id;
        profile
    }

    #[tokio::test]
    async fn create_profile_retries_a_lost_write_and_succeeds() {
        let account_id = Uuid::new_v4();
        let service_id = Uuid::new_v4();

        let mut accounts = MockAccounts::new();
        accounts
            .expect_get_by_id()
            .times(2)
            .returning(move |_| Ok(account_fixture(account_id, service_id, 2, 3)));

        let mut services = MockServices::new();
        services
            .expect_get_by_id()
            .times(2)
            .returning(move |_| Ok(service_fixture(service_id, 5)));

        let mut profiles = MockProfiles::new();
        let mut seq = Sequence::new();
        profiles
            .expect_insert_with_account()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StoreError::Conflict("version moved".to_string())));
        profiles
            .expect_insert_with_account()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, account| account.free_slots == 1 && account.occupied_slots == 4)
            .returning(|_, _| Ok(()));

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        let profile = ledger.create_profile(account_id, profile_draft()).await.unwrap();
        assert_eq!(profile.account_id, account_id);
        // Price defaulted from the service.
        assert_eq!(profile.price, 4.0);
    }

    #[tokio::test]
    async fn create_profile_gives_up_after_bounded_attempts() {
        let account_id = Uuid::new_v4();
        let service_id = Uuid::new_v4();

        let mut accounts = MockAccounts::new();
        accounts
            .expect_get_by_id()
            .times(3)
            .returning(move |_| Ok(account_fixture(account_id, service_id, 2, 3)));

        let mut services = MockServices::new();
        services
            .expect_get_by_id()
            .times(3)
            .returning(move |_| Ok(service_fixture(service_id, 5)));

        let mut profiles = MockProfiles::new();
        profiles
            .expect_insert_with_account()
            .times(3)
            .returning(|_, _| Err(StoreError::Conflict("version moved".to_string())));

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        let err = ledger.create_profile(account_id, profile_draft()).await.unwrap_err();
        assert!(matches!(err, LedgerError::TransactionConflict { attempts: 3 }));
    }

    #[tokio::test]
    async fn create_profile_on_a_full_account_writes_nothing() {
        let account_id = Uuid::new_v4();
        let service_id = Uuid::new_v4();

        let mut accounts = MockAccounts::new();
        accounts
            .expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(account_fixture(account_id, service_id, 0, 5)));

        let mut services = MockServices::new();
        services
            .expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(service_fixture(service_id, 5)));

        // No insert expectation: any store write would fail the test.
        let profiles = MockProfiles::new();

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        let err = ledger.create_profile(account_id, profile_draft()).await.unwrap_err();
        assert!(matches!(err, LedgerError::CapacityExceeded { limit: 5 }));
    }

    #[tokio::test]
    async fn create_profile_rejects_an_invalid_draft_before_any_read() {
        let accounts = MockAccounts::new();
        let services = MockServices::new();
        let profiles = MockProfiles::new();

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        let mut draft = profile_draft();
        draft.profile_name = String::new();
        let err = ledger.create_profile(Uuid::new_v4(), draft).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_profile_releases_the_slot_against_true_capacity() {
        let account_id = Uuid::new_v4();
        let service_id = Uuid::new_v4();
        let profile_id = Uuid::new_v4();

        let mut profiles = MockProfiles::new();
        profiles
            .expect_get_by_id()
            .times(1)
            .returning(move |id| Ok(profile_fixture(id, account_id)));
        profiles
            .expect_delete_with_account()
            .times(1)
            // A four-slot account at 4 free / 0 occupied must stay at 4,
            // not drift to 5.
            .withf(|_, account| account.free_slots == 4 && account.occupied_slots == 0)
            .returning(|_, _| Ok(()));

        let mut accounts = MockAccounts::new();
        accounts
            .expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(account_fixture(account_id, service_id, 4, 0)));

        let mut services = MockServices::new();
        services
            .expect_get_by_id()
            .times(1)
            .returning(move |_| Ok(service_fixture(service_id, 4)));

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        ledger.delete_profile(profile_id).await.unwrap();
    }

    #[tokio::test]
    async fn renew_rejects_non_positive_durations_without_touching_the_store() {
        let accounts = MockAccounts::new();
        let services = MockServices::new();
        let profiles = MockProfiles::new();

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        for months in [0, -1] {
            let err = ledger.renew_profile(Uuid::new_v4(), months).await.unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn renew_moves_the_window_but_not_the_counters() {
        let account_id = Uuid::new_v4();
        let profile_id = Uuid::new_v4();

        let mut profiles = MockProfiles::new();
        profiles
            .expect_get_by_id()
            .times(1)
            .returning(move |id| Ok(profile_fixture(id, account_id)));
        profiles
            .expect_renew()
            .times(1)
            .withf(|_, start, end| *end - *start == chrono::Duration::days(90))
            .returning(|_, _, _| Ok(()));

        // Accounts and services must not even be read.
        let accounts = MockAccounts::new();
        let services = MockServices::new();

        let ledger =
            SlotLedgerService::new(Arc::new(accounts), Arc::new(profiles), Arc::new(services));

        let renewed = ledger.renew_profile(profile_id, 3).await.unwrap();
        assert_eq!(renewed.end_date - renewed.start_date, chrono::Duration::days(90));
    }
}
