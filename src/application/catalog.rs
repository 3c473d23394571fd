use crate::domain::{Client, NewClient, NewProvider, NewService, Provider, Service};
use crate::infrastructure::{
    AccountRepository, ClientRepository, ProviderRepository, ServiceRepository, StoreError,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("service {service_id} still has {accounts} account(s)")]
    ServiceInUse { service_id: Uuid, accounts: i64 },
}

/// Headline numbers for the landing dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total_clients: i64,
    pub total_accounts: i64,
    pub total_services: i64,
    /// Free slots summed across every account: sellable inventory.
    pub available_slots: i64,
}

/// Directory maintenance around the ledger: clients, providers and the
/// service catalog. Nothing in here moves slot counters.
pub struct CatalogService<C, V, S, A>
where
    C: ClientRepository,
    V: ProviderRepository,
    S: ServiceRepository,
    A: AccountRepository,
{
    client_repo: Arc<C>,
    provider_repo: Arc<V>,
    service_repo: Arc<S>,
    account_repo: Arc<A>,
}

impl<C, V, S, A> CatalogService<C, V, S, A>
where
    C: ClientRepository,
    V: ProviderRepository,
    S: ServiceRepository,
    A: AccountRepository,
{
    pub fn new(
        client_repo: Arc<C>,
        provider_repo: Arc<V>,
        service_repo: Arc<S>,
        account_repo: Arc<A>,
    ) -> Self {
        Self {
            client_repo,
            provider_repo,
            service_repo,
            account_repo,
        }
    }

    pub async fn create_client(&self, draft: NewClient) -> Result<Client, CatalogError> {
        draft
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let client = Client::new(draft);
        self.client_repo.create(&client).await?;
        info!("Created client {} ({})", client.id, client.name);
        Ok(client)
    }

    pub async fn get_client(&self, id: Uuid) -> Result<Client, CatalogError> {
        Ok(self.client_repo.get_by_id(id).await?)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, CatalogError> {
        Ok(self.client_repo.list().await?)
    }

    pub async fn update_client(&self, id: Uuid, draft: NewClient) -> Result<Client, CatalogError> {
        draft
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let mut client = self.client_repo.get_by_id(id).await?;
        client.apply(draft);
        self.client_repo.update(&client).await?;
        Ok(client)
    }

    pub async fn delete_client(&self, id: Uuid) -> Result<(), CatalogError> {
        self.client_repo.delete(id).await?;
        info!("Deleted client {}", id);
        Ok(())
    }

    pub async fn create_provider(&self, draft: NewProvider) -> Result<Provider, CatalogError> {
        draft
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let provider = Provider::new(draft);
        self.provider_repo.create(&provider).await?;
        info!("Created provider {} ({})", provider.id, provider.name);
        Ok(provider)
    }

    pub async fn get_provider(&self, id: Uuid) -> Result<Provider, CatalogError> {
        Ok(self.provider_repo.get_by_id(id).await?)
    }

    pub async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError> {
        Ok(self.provider_repo.list().await?)
    }

    pub async fn update_provider(
        &self,
        id: Uuid,
        draft: NewProvider,
    ) -> Result<Provider, CatalogError> {
        draft
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let mut provider = self.provider_repo.get_by_id(id).await?;
        provider.apply(draft);
        self.provider_repo.update(&provider).await?;
        Ok(provider)
    }

    pub async fn delete_provider(&self, id: Uuid) -> Result<(), CatalogError> {
        self.provider_repo.delete(id).await?;
        info!("Deleted provider {}", id);
        Ok(())
    }

    /// Creates a service. Capacity defaults from the name when not given,
    /// so a "Netflix ..." service arrives with five slots and anything else
    /// with four.
    pub async fn create_service(&self, draft: NewService) -> Result<Service, CatalogError> {
        draft
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let service = Service::new(draft);
        self.service_repo.create(&service).await?;
        info!(
            "Created service {} ({}, {} slots)",
            service.id, service.name, service.slot_capacity
        );
        Ok(service)
    }

    pub async fn get_service(&self, id: Uuid) -> Result<Service, CatalogError> {
        Ok(self.service_repo.get_by_id(id).await?)
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, CatalogError> {
        Ok(self.service_repo.list().await?)
    }

    pub async fn update_service(
        &self,
        id: Uuid,
        draft: NewService,
    ) -> Result<Service, CatalogError> {
        draft
            .validate()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        let mut service = self.service_repo.get_by_id(id).await?;
        service.apply(draft);
        self.service_repo.update(&service).await?;
        Ok(service)
    }

    /// Refuses to delete a service that still has accounts; capacity
    /// lookups for those accounts would dangle otherwise.
    pub async fn delete_service(&self, id: Uuid) -> Result<(), CatalogError> {
        let accounts = self.account_repo.count_by_service(id).await?;
        if accounts > 0 {
            return Err(CatalogError::ServiceInUse {
                service_id: id,
                accounts,
            });
        }

        self.service_repo.delete(id).await?;
        info!("Deleted service {}", id);
        Ok(())
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, CatalogError> {
        Ok(DashboardSummary {
            total_clients: self.client_repo.count().await?,
            total_accounts: self.account_repo.count().await?,
            total_services: self.service_repo.count().await?,
            available_slots: self.account_repo.sum_free_slots().await?,
        })
    }
}
