use super::state::AppState;
use crate::application::{messaging, CatalogError, LedgerError};
use crate::domain::{
    Account, AccountPatch, NewAccount, NewClient, NewProfile, NewProvider, NewService, Profile,
    ProfileStatus, ProviderStatus,
};
use crate::infrastructure::StoreError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(dashboard))
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/:id",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/providers", get(list_providers).post(create_provider))
        .route(
            "/providers/:id",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .route("/services", get(list_services).post(create_service))
        .route(
            "/services/:id",
            get(get_service).put(update_service).delete(delete_service),
        )
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route(
            "/accounts/:id/profiles",
            get(list_account_profiles).post(create_profile),
        )
        .route("/profiles", get(list_profiles))
        .route(
            "/profiles/:id",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/profiles/:id/renew", post(renew_profile))
        .route("/profiles/:id/whatsapp", get(whatsapp_link))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps ledger failures onto HTTP statuses. Capacity and conflict failures
/// are both 409: the request was well-formed but the account's state refused
/// it. Internals are logged, not echoed.
fn ledger_error(context: &str, err: LedgerError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        LedgerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        LedgerError::CapacityExceeded { .. } | LedgerError::TransactionConflict { .. } => {
            StatusCode::CONFLICT
        }
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "{}", context);
        return (status, Json(serde_json::json!({ "error": context })));
    }
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

fn catalog_error(context: &str, err: CatalogError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        CatalogError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::ServiceInUse { .. } => StatusCode::CONFLICT,
        CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "{}", context);
        return (status, Json(serde_json::json!({ "error": context })));
    }
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MessageKind {
    Welcome,
    Reminder,
}

fn parse_message_kind(kind: &str) -> Option<MessageKind> {
    match kind {
        "welcome" => Some(MessageKind::Welcome),
        "reminder" => Some(MessageKind::Reminder),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_kind_accepts_known_kinds() {
        assert_eq!(parse_message_kind("welcome"), Some(MessageKind::Welcome));
        assert_eq!(parse_message_kind("reminder"), Some(MessageKind::Reminder));
        assert_eq!(parse_message_kind("invoice"), None);
    }

    #[test]
    fn ledger_errors_map_to_conflict_and_not_found() {
        let (status, _) = ledger_error("ctx", LedgerError::CapacityExceeded { limit: 5 });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = ledger_error("ctx", LedgerError::TransactionConflict { attempts: 3 });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = ledger_error(
            "ctx",
            LedgerError::Store(StoreError::NotFound("account x".to_string())),
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = ledger_error("ctx", LedgerError::Validation("bad".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn catalog_in_use_maps_to_conflict() {
        let err = CatalogError::ServiceInUse {
            service_id: Uuid::new_v4(),
            accounts: 2,
        };
        let (status, _) = catalog_error("ctx", err);
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        dashboard,
        list_clients,
        create_client,
        get_client,
        update_client,
        delete_client,
        list_providers,
        create_provider,
        get_provider,
        update_provider,
        delete_provider,
        list_services,
        create_service,
        get_service,
        update_service,
        delete_service,
        list_accounts,
        create_account,
        get_account,
        update_account,
        delete_account,
        list_account_profiles,
        create_profile,
        list_profiles,
        get_profile,
        update_profile,
        delete_profile,
        renew_profile,
        whatsapp_link,
    ),
    components(
        schemas(
            CreateClientRequest,
            CreateProviderRequest,
            CreateServiceRequest,
            CreateAccountRequest,
            UpdateAccountRequest,
            CreateProfileRequest,
            UpdateProfileRequest,
            RenewProfileRequest,
            AccountResponse,
            ProfileResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Dashboard", description = "Aggregated business numbers"),
        (name = "Clients", description = "Client directory"),
        (name = "Providers", description = "Upstream provider directory"),
        (name = "Services", description = "Service catalog and slot capacities"),
        (name = "Accounts", description = "Purchased accounts and their slot counters"),
        (name = "Profiles", description = "Profile slot sales, renewals and messaging"),
    ),
    info(
        title = "Subsdesk API",
        version = "0.1.0",
        description = "Back office for reselling streaming subscriptions by profile slot",
        license(name = "MIT")
    )
)]
struct ApiDoc;

/// Health check response
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Verifies database connectivity and returns service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed: DB connectivity issue");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    error: Some("Database connectivity failed".to_string()),
                }),
            )
        }
    }
}

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Totals for the landing page", body = Object),
        (status = 500, description = "Failed to load dashboard", body = Object)
    )
)]
async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.dashboard_summary().await {
        Ok(summary) => (StatusCode::OK, Json(serde_json::json!(summary))),
        Err(e) => catalog_error("Failed to load dashboard", e),
    }
}

/// Create client request, also the full-replace update body.
#[derive(Deserialize, ToSchema)]
struct CreateClientRequest {
    #[schema(example = "Ana Paredes")]
    name: String,
    #[schema(example = "ana@mail.com")]
    email: String,
    #[schema(example = "0991234567")]
    phone: String,
    #[serde(default)]
    address: String,
}

impl From<CreateClientRequest> for NewClient {
    fn from(req: CreateClientRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
        }
    }
}

#[utoipa::path(
    get,
    path = "/clients",
    tag = "Clients",
    responses(
        (status = 200, description = "All clients, newest first", body = Object),
        (status = 500, description = "Failed to list clients", body = Object)
    )
)]
async fn list_clients(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list_clients().await {
        Ok(clients) => (StatusCode::OK, Json(serde_json::json!(clients))),
        Err(e) => catalog_error("Failed to list clients", e),
    }
}

#[utoipa::path(
    post,
    path = "/clients",
    tag = "Clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Object),
        (status = 400, description = "Invalid client data", body = Object),
        (status = 500, description = "Failed to create client", body = Object)
    )
)]
async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<CreateClientRequest>,
) -> impl IntoResponse {
    match state.catalog.create_client(req.into()).await {
        Ok(client) => (StatusCode::CREATED, Json(serde_json::json!(client))),
        Err(e) => catalog_error("Failed to create client", e),
    }
}

#[utoipa::path(
    get,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client found", body = Object),
        (status = 404, description = "Client not found", body = Object)
    )
)]
async fn get_client(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.catalog.get_client(id).await {
        Ok(client) => (StatusCode::OK, Json(serde_json::json!(client))),
        Err(e) => catalog_error("Failed to get client", e),
    }
}

#[utoipa::path(
    put,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = CreateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = Object),
        (status = 400, description = "Invalid client data", body = Object),
        (status = 404, description = "Client not found", body = Object)
    )
)]
async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateClientRequest>,
) -> impl IntoResponse {
    match state.catalog.update_client(id, req.into()).await {
        Ok(client) => (StatusCode::OK, Json(serde_json::json!(client))),
        Err(e) => catalog_error("Failed to update client", e),
    }
}

#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client deleted", body = Object),
        (status = 404, description = "Client not found", body = Object)
    )
)]
async fn delete_client(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.catalog.delete_client(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "deleted" }))),
        Err(e) => catalog_error("Failed to delete client", e),
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateProviderRequest {
    #[schema(example = "StreamSupply")]
    name: String,
    #[schema(example = "ventas@streamsupply.com")]
    email: String,
    #[schema(example = "0998765432")]
    phone: String,
    #[serde(default)]
    address: String,
    #[schema(example = "active")]
    status: String,
    #[serde(default)]
    services: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/providers",
    tag = "Providers",
    responses(
        (status = 200, description = "All providers, newest first", body = Object),
        (status = 500, description = "Failed to list providers", body = Object)
    )
)]
async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list_providers().await {
        Ok(providers) => (StatusCode::OK, Json(serde_json::json!(providers))),
        Err(e) => catalog_error("Failed to list providers", e),
    }
}

#[utoipa::path(
    post,
    path = "/providers",
    tag = "Providers",
    request_body = CreateProviderRequest,
    responses(
        (status = 201, description = "Provider created", body = Object),
        (status = 400, description = "Invalid provider data", body = Object),
        (status = 500, description = "Failed to create provider", body = Object)
    )
)]
async fn create_provider(
    State(state): State<AppState>,
    Json(req): Json<CreateProviderRequest>,
) -> impl IntoResponse {
    let status = match ProviderStatus::from_str(&req.status) {
        Ok(s) => s,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid provider status",
                    "allowed": ["active", "inactive"]
                })),
            );
        }
    };

    let draft = NewProvider {
        name: req.name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        status,
        services: req.services,
    };

    match state.catalog.create_provider(draft).await {
        Ok(provider) => (StatusCode::CREATED, Json(serde_json::json!(provider))),
        Err(e) => catalog_error("Failed to create provider", e),
    }
}

#[utoipa::path(
    get,
    path = "/providers/{id}",
    tag = "Providers",
    params(("id" = Uuid, Path, description = "Provider ID")),
    responses(
        (status = 200, description = "Provider found", body = Object),
        (status = 404, description = "Provider not found", body = Object)
    )
)]
async fn get_provider(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.catalog.get_provider(id).await {
        Ok(provider) => (StatusCode::OK, Json(serde_json::json!(provider))),
        Err(e) => catalog_error("Failed to get provider", e),
    }
}

#[utoipa::path(
    put,
    path = "/providers/{id}",
    tag = "Providers",
    params(("id" = Uuid, Path, description = "Provider ID")),
    request_body = CreateProviderRequest,
    responses(
        (status = 200, description = "Provider updated", body = Object),
        (status = 400, description = "Invalid provider data", body = Object),
        (status = 404, description = "Provider not found", body = Object)
    )
)]
async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateProviderRequest>,
) -> impl IntoResponse {
    let status = match ProviderStatus::from_str(&req.status) {
        Ok(s) => s,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid provider status",
                    "allowed": ["active", "inactive"]
                })),
            );
        }
    };

    let draft = NewProvider {
        name: req.name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        status,
        services: req.services,
    };

    match state.catalog.update_provider(id, draft).await {
        Ok(provider) => (StatusCode::OK, Json(serde_json::json!(provider))),
        Err(e) => catalog_error("Failed to update provider", e),
    }
}

#[utoipa::path(
    delete,
    path = "/providers/{id}",
    tag = "Providers",
    params(("id" = Uuid, Path, description = "Provider ID")),
    responses(
        (status = 200, description = "Provider deleted", body = Object),
        (status = 404, description = "Provider not found", body = Object)
    )
)]
async fn delete_provider(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.catalog.delete_provider(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "deleted" }))),
        Err(e) => catalog_error("Failed to delete provider", e),
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateServiceRequest {
    #[schema(example = "Netflix Premium")]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    link: String,
    /// Profile slots per account; omitted means the name-based default.
    #[schema(example = 5)]
    slot_capacity: Option<i32>,
    #[schema(example = 4.0)]
    price: f64,
    provider_id: Uuid,
}

impl From<CreateServiceRequest> for NewService {
    fn from(req: CreateServiceRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            image_url: req.image_url,
            link: req.link,
            slot_capacity: req.slot_capacity,
            price: req.price,
            provider_id: req.provider_id,
        }
    }
}

#[utoipa::path(
    get,
    path = "/services",
    tag = "Services",
    responses(
        (status = 200, description = "All services, newest first", body = Object),
        (status = 500, description = "Failed to list services", body = Object)
    )
)]
async fn list_services(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.list_services().await {
        Ok(services) => (StatusCode::OK, Json(serde_json::json!(services))),
        Err(e) => catalog_error("Failed to list services", e),
    }
}

#[utoipa::path(
    post,
    path = "/services",
    tag = "Services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = Object),
        (status = 400, description = "Invalid service data", body = Object),
        (status = 500, description = "Failed to create service", body = Object)
    )
)]
async fn create_service(
    State(state): State<AppState>,
    Json(req): Json<CreateServiceRequest>,
) -> impl IntoResponse {
    match state.catalog.create_service(req.into()).await {
        Ok(service) => (StatusCode::CREATED, Json(serde_json::json!(service))),
        Err(e) => catalog_error("Failed to create service", e),
    }
}

#[utoipa::path(
    get,
    path = "/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Service found", body = Object),
        (status = 404, description = "Service not found", body = Object)
    )
)]
async fn get_service(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.catalog.get_service(id).await {
        Ok(service) => (StatusCode::OK, Json(serde_json::json!(service))),
        Err(e) => catalog_error("Failed to get service", e),
    }
}

#[utoipa::path(
    put,
    path = "/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service ID")),
    request_body = CreateServiceRequest,
    responses(
        (status = 200, description = "Service updated", body = Object),
        (status = 400, description = "Invalid service data", body = Object),
        (status = 404, description = "Service not found", body = Object)
    )
)]
async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateServiceRequest>,
) -> impl IntoResponse {
    match state.catalog.update_service(id, req.into()).await {
        Ok(service) => (StatusCode::OK, Json(serde_json::json!(service))),
        Err(e) => catalog_error("Failed to update service", e),
    }
}

#[utoipa::path(
    delete,
    path = "/services/{id}",
    tag = "Services",
    params(("id" = Uuid, Path, description = "Service ID")),
    responses(
        (status = 200, description = "Service deleted", body = Object),
        (status = 404, description = "Service not found", body = Object),
        (status = 409, description = "Service still has accounts", body = Object)
    )
)]
async fn delete_service(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.catalog.delete_service(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "deleted" }))),
        Err(e) => catalog_error("Failed to delete service", e),
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateAccountRequest {
    #[schema(example = "cuenta01@mail.com")]
    login: String,
    service_id: Uuid,
    billing_date: DateTime<Utc>,
    #[serde(default)]
    note: String,
    #[serde(default)]
    email_password: String,
    #[serde(default)]
    account_password: String,
}

impl From<CreateAccountRequest> for NewAccount {
    fn from(req: CreateAccountRequest) -> Self {
        Self {
            login: req.login,
            service_id: req.service_id,
            billing_date: req.billing_date,
            note: req.note,
            email_password: req.email_password,
            account_password: req.account_password,
        }
    }
}

/// Detail-field patch. Slot counters are absent on purpose: they only move
/// through profile creation and deletion.
#[derive(Deserialize, ToSchema)]
struct UpdateAccountRequest {
    login: Option<String>,
    billing_date: Option<DateTime<Utc>>,
    note: Option<String>,
    email_password: Option<String>,
    account_password: Option<String>,
}

impl From<UpdateAccountRequest> for AccountPatch {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            login: req.login,
            billing_date: req.billing_date,
            note: req.note,
            email_password: req.email_password,
            account_password: req.account_password,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct AccountResponse {
    id: Uuid,
    login: String,
    service_id: Uuid,
    service_name: String,
    billing_date: DateTime<Utc>,
    note: String,
    email_password: String,
    account_password: String,
    free_slots: i32,
    occupied_slots: i32,
    total_slots: i32,
    created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        let total_slots = account.total_slots();
        Self {
            id: account.id,
            login: account.login,
            service_id: account.service_id,
            service_name: account.service_name,
            billing_date: account.billing_date,
            note: account.note,
            email_password: account.email_password,
            account_password: account.account_password,
            free_slots: account.free_slots,
            occupied_slots: account.occupied_slots,
            total_slots,
            created_at: account.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/accounts",
    tag = "Accounts",
    responses(
        (status = 200, description = "All accounts, newest first", body = [AccountResponse]),
        (status = 500, description = "Failed to list accounts", body = Object)
    )
)]
async fn list_accounts(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.list_accounts().await {
        Ok(accounts) => {
            let accounts: Vec<AccountResponse> = accounts.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(serde_json::json!(accounts)))
        }
        Err(e) => ledger_error("Failed to list accounts", e),
    }
}

#[utoipa::path(
    post,
    path = "/accounts",
    tag = "Accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created with all slots free", body = AccountResponse),
        (status = 400, description = "Invalid account data", body = Object),
        (status = 404, description = "Service not found", body = Object),
        (status = 500, description = "Failed to create account", body = Object)
    )
)]
async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> impl IntoResponse {
    match state.ledger.create_account(req.into()).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(serde_json::json!(AccountResponse::from(account))),
        ),
        Err(e) => ledger_error("Failed to create account", e),
    }
}

#[utoipa::path(
    get,
    path = "/accounts/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = AccountResponse),
        (status = 404, description = "Account not found", body = Object)
    )
)]
async fn get_account(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.ledger.get_account(id).await {
        Ok(account) => (
            StatusCode::OK,
            Json(serde_json::json!(AccountResponse::from(account))),
        ),
        Err(e) => ledger_error("Failed to get account", e),
    }
}

#[utoipa::path(
    put,
    path = "/accounts/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountResponse),
        (status = 404, description = "Account not found", body = Object)
    )
)]
async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> impl IntoResponse {
    match state.ledger.update_account(id, req.into()).await {
        Ok(account) => (
            StatusCode::OK,
            Json(serde_json::json!(AccountResponse::from(account))),
        ),
        Err(e) => ledger_error("Failed to update account", e),
    }
}

#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account and its profiles deleted", body = Object),
        (status = 404, description = "Account not found", body = Object)
    )
)]
async fn delete_account(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.ledger.delete_account(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "deleted" }))),
        Err(e) => ledger_error("Failed to delete account", e),
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateProfileRequest {
    client_id: Uuid,
    #[schema(example = "Ana Paredes")]
    client_name: String,
    #[schema(example = "ANA")]
    profile_name: String,
    pin: Option<String>,
    #[schema(example = "0991234567")]
    phone: String,
    /// Defaults to now.
    start_date: Option<DateTime<Utc>>,
    /// Defaults to one 30-day month.
    duration_months: Option<i32>,
    /// Defaults to true; courtesy profiles set it to false.
    generates_payment: Option<bool>,
    /// Defaults to the service's monthly price.
    price: Option<f64>,
}

impl From<CreateProfileRequest> for NewProfile {
    fn from(req: CreateProfileRequest) -> Self {
        Self {
            client_id: req.client_id,
            client_name: req.client_name,
            profile_name: req.profile_name,
            pin: req.pin,
            phone: req.phone,
            start_date: req.start_date,
            duration_months: req.duration_months,
            generates_payment: req.generates_payment.unwrap_or(true),
            price: req.price,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct UpdateProfileRequest {
    profile_name: String,
    /// Replaces the stored PIN; empty or missing clears it.
    pin: Option<String>,
}

#[derive(Deserialize, ToSchema)]
struct RenewProfileRequest {
    /// Number of 30-day months the new lease runs for.
    #[schema(example = 1)]
    duration_months: i32,
}

#[derive(Serialize, ToSchema)]
struct ProfileResponse {
    id: Uuid,
    account_id: Uuid,
    client_id: Uuid,
    client_name: String,
    profile_name: String,
    pin: Option<String>,
    phone: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    generates_payment: bool,
    price: f64,
    /// Derived from the end date at response time; never stored.
    status: String,
    created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let status = profile.status_at(Utc::now()).to_string();
        Self {
            id: profile.id,
            account_id: profile.account_id,
            client_id: profile.client_id,
            client_name: profile.client_name,
            profile_name: profile.profile_name,
            pin: profile.pin,
            phone: profile.phone,
            start_date: profile.start_date,
            end_date: profile.end_date,
            generates_payment: profile.generates_payment,
            price: profile.price,
            status,
            created_at: profile.created_at,
        }
    }
}

#[derive(Deserialize, Debug, IntoParams, ToSchema)]
struct ProfileFilterParams {
    /// Keep only profiles whose derived status matches: active, expiring or expired.
    status: Option<String>,
}

fn filter_by_status(profiles: Vec<Profile>, status: Option<ProfileStatus>) -> Vec<ProfileResponse> {
    let now = Utc::now();
    profiles
        .into_iter()
        .filter(|profile| status.map_or(true, |wanted| profile.status_at(now) == wanted))
        .map(ProfileResponse::from)
        .collect()
}

#[utoipa::path(
    get,
    path = "/accounts/{id}/profiles",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Account ID"), ProfileFilterParams),
    responses(
        (status = 200, description = "Profiles on the account, newest first", body = [ProfileResponse]),
        (status = 400, description = "Invalid status filter", body = Object),
        (status = 500, description = "Failed to list profiles", body = Object)
    )
)]
async fn list_account_profiles(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(params): Query<ProfileFilterParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref().map(ProfileStatus::from_str).transpose() {
        Ok(s) => s,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid status filter",
                    "allowed": ["active", "expiring", "expired"]
                })),
            );
        }
    };

    match state.ledger.profiles_for_account(account_id).await {
        Ok(profiles) => (
            StatusCode::OK,
            Json(serde_json::json!(filter_by_status(profiles, status))),
        ),
        Err(e) => ledger_error("Failed to list profiles", e),
    }
}

#[utoipa::path(
    post,
    path = "/accounts/{id}/profiles",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created and one slot occupied", body = ProfileResponse),
        (status = 400, description = "Invalid profile data", body = Object),
        (status = 404, description = "Account not found", body = Object),
        (status = 409, description = "No free slot, or the write kept conflicting", body = Object),
        (status = 500, description = "Failed to create profile", body = Object)
    )
)]
async fn create_profile(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(req): Json<CreateProfileRequest>,
) -> impl IntoResponse {
    match state.ledger.create_profile(account_id, req.into()).await {
        Ok(profile) => (
            StatusCode::CREATED,
            Json(serde_json::json!(ProfileResponse::from(profile))),
        ),
        Err(e) => ledger_error("Failed to create profile", e),
    }
}

#[utoipa::path(
    get,
    path = "/profiles",
    tag = "Profiles",
    params(ProfileFilterParams),
    responses(
        (status = 200, description = "Every sold profile, newest first", body = [ProfileResponse]),
        (status = 400, description = "Invalid status filter", body = Object),
        (status = 500, description = "Failed to list profiles", body = Object)
    )
)]
async fn list_profiles(
    State(state): State<AppState>,
    Query(params): Query<ProfileFilterParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref().map(ProfileStatus::from_str).transpose() {
        Ok(s) => s,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid status filter",
                    "allowed": ["active", "expiring", "expired"]
                })),
            );
        }
    };

    match state.ledger.list_profiles().await {
        Ok(profiles) => (
            StatusCode::OK,
            Json(serde_json::json!(filter_by_status(profiles, status))),
        ),
        Err(e) => ledger_error("Failed to list profiles", e),
    }
}

#[utoipa::path(
    get,
    path = "/profiles/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile found", body = ProfileResponse),
        (status = 404, description = "Profile not found", body = Object)
    )
)]
async fn get_profile(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.ledger.get_profile(id).await {
        Ok(profile) => (
            StatusCode::OK,
            Json(serde_json::json!(ProfileResponse::from(profile))),
        ),
        Err(e) => ledger_error("Failed to get profile", e),
    }
}

#[utoipa::path(
    put,
    path = "/profiles/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Invalid profile data", body = Object),
        (status = 404, description = "Profile not found", body = Object)
    )
)]
async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    match state.ledger.update_profile(id, req.profile_name, req.pin).await {
        Ok(profile) => (
            StatusCode::OK,
            Json(serde_json::json!(ProfileResponse::from(profile))),
        ),
        Err(e) => ledger_error("Failed to update profile", e),
    }
}

#[utoipa::path(
    delete,
    path = "/profiles/{id}",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile deleted and its slot freed", body = Object),
        (status = 404, description = "Profile not found", body = Object),
        (status = 409, description = "The write kept conflicting", body = Object)
    )
)]
async fn delete_profile(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.ledger.delete_profile(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "deleted" }))),
        Err(e) => ledger_error("Failed to delete profile", e),
    }
}

#[utoipa::path(
    post,
    path = "/profiles/{id}/renew",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = RenewProfileRequest,
    responses(
        (status = 200, description = "Lease restarted today", body = ProfileResponse),
        (status = 400, description = "Invalid duration", body = Object),
        (status = 404, description = "Profile not found", body = Object)
    )
)]
async fn renew_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenewProfileRequest>,
) -> impl IntoResponse {
    match state.ledger.renew_profile(id, req.duration_months).await {
        Ok(profile) => (
            StatusCode::OK,
            Json(serde_json::json!(ProfileResponse::from(profile))),
        ),
        Err(e) => ledger_error("Failed to renew profile", e),
    }
}

#[derive(Deserialize, Debug, IntoParams, ToSchema)]
struct WhatsappParams {
    /// Message template: "welcome" (default) or "reminder".
    kind: Option<String>,
}

#[utoipa::path(
    get,
    path = "/profiles/{id}/whatsapp",
    tag = "Profiles",
    params(("id" = Uuid, Path, description = "Profile ID"), WhatsappParams),
    responses(
        (status = 200, description = "Prefilled wa.me link for the profile's phone", body = Object),
        (status = 400, description = "Unknown message kind", body = Object),
        (status = 404, description = "Profile not found", body = Object)
    )
)]
async fn whatsapp_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<WhatsappParams>,
) -> impl IntoResponse {
    let kind = match parse_message_kind(params.kind.as_deref().unwrap_or("welcome")) {
        Some(k) => k,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Unknown message kind",
                    "allowed": ["welcome", "reminder"]
                })),
            );
        }
    };

    let profile = match state.ledger.get_profile(id).await {
        Ok(p) => p,
        Err(e) => return ledger_error("Failed to get profile", e),
    };
    let account = match state.ledger.get_account(profile.account_id).await {
        Ok(a) => a,
        Err(e) => return ledger_error("Failed to get account", e),
    };

    let body = match kind {
        MessageKind::Welcome => messaging::welcome_message(&profile, &account),
        MessageKind::Reminder => messaging::renewal_reminder(&profile, &account),
    };
    let to = format!(
        "{}{}",
        state.config.whatsapp_country_code,
        messaging::normalize_phone(&profile.phone)
    );
    let link = messaging::wa_link(&state.config.whatsapp_country_code, &profile.phone, &body);

    (
        StatusCode::OK,
        Json(serde_json::json!({ "to": to, "link": link, "body": body })),
    )
}
