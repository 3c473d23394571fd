use crate::application::{CatalogService, SlotLedgerService};
use crate::infrastructure::{
    AppConfig, PostgresAccountRepository, PostgresClientRepository, PostgresProfileRepository,
    PostgresProviderRepository, PostgresServiceRepository,
};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

pub type SlotLedgerServiceType = SlotLedgerService<
    PostgresAccountRepository,
    PostgresProfileRepository,
    PostgresServiceRepository,
>;

pub type CatalogServiceType = CatalogService<
    PostgresClientRepository,
    PostgresProviderRepository,
    PostgresServiceRepository,
    PostgresAccountRepository,
>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub ledger: Arc<SlotLedgerServiceType>,
    pub catalog: Arc<CatalogServiceType>,
}

/// Build full state from config + an existing pool.
///
/// Intended for embedding into a larger service that already manages a `PgPool`.
pub async fn build_state_with_pool(
    config: AppConfig,
    pool: PgPool,
    run_migrations: bool,
) -> anyhow::Result<AppState> {
    if run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
    }

    let client_repo = Arc::new(PostgresClientRepository::new(pool.clone()));
    let provider_repo = Arc::new(PostgresProviderRepository::new(pool.clone()));
    let service_repo = Arc::new(PostgresServiceRepository::new(pool.clone()));
    let account_repo = Arc::new(PostgresAccountRepository::new(pool.clone()));
    let profile_repo = Arc::new(PostgresProfileRepository::new(pool.clone()));

    let ledger = Arc::new(SlotLedgerService::new(
        account_repo.clone(),
        profile_repo.clone(),
        service_repo.clone(),
    ));

    let catalog = Arc::new(CatalogService::new(
        client_repo,
        provider_repo,
        service_repo,
        account_repo,
    ));

    Ok(AppState {
        pool,
        config,
        ledger,
        catalog,
    })
}

/// Build state for the standalone server.
///
/// Creates the `PgPool`, runs migrations, and wires repositories/services.
pub async fn build_state_from_env(config: AppConfig) -> anyhow::Result<AppState> {
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("connect database")?;
    build_state_with_pool(config, pool, true).await
}
