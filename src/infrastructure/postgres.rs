use crate::domain::{Account, Client, Profile, Provider, ProviderStatus, Service};
use crate::infrastructure::store::{
    AccountRepository, ClientRepository, ProfileRepository, ProviderRepository, ServiceRepository,
    StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

fn not_found(entity: &str, id: Uuid) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| match e {
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("{} {}", entity, id)),
        other => StoreError::Database(other),
    }
}

fn row_to_client(row: &PgRow) -> Result<Client, StoreError> {
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_provider(row: &PgRow) -> Result<Provider, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Provider {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        status: ProviderStatus::from_str(&status)
            .map_err(|_| StoreError::InvalidData(format!("unknown provider status: {}", status)))?,
        services: row.try_get("services")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_service(row: &PgRow) -> Result<Service, StoreError> {
    Ok(Service {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        link: row.try_get("link")?,
        slot_capacity: row.try_get("slot_capacity")?,
        price: row.try_get("price")?,
        provider_id: row.try_get("provider_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_account(row: &PgRow) -> Result<Account, StoreError> {
    Ok(Account {
        id: row.try_get("id")?,
        login: row.try_get("login")?,
        service_id: row.try_get("service_id")?,
        service_name: row.try_get("service_name")?,
        billing_date: row.try_get("billing_date")?,
        note: row.try_get("note")?,
        email_password: row.try_get("email_password")?,
        account_password: row.try_get("account_password")?,
        free_slots: row.try_get("free_slots")?,
        occupied_slots: row.try_get("occupied_slots")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_profile(row: &PgRow) -> Result<Profile, StoreError> {
    Ok(Profile {
        id: row.try_get("id")?,
        account_id: row.try_get("account_id")?,
        client_id: row.try_get("client_id")?,
        client_name: row.try_get("client_name")?,
        profile_name: row.try_get("profile_name")?,
        pin: row.try_get("pin")?,
        phone: row.try_get("phone")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        generates_payment: row.try_get("generates_payment")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
    })
}

pub struct PostgresClientRepository {
    pool: PgPool,
}

impl PostgresClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
    async fn create(&self, client: &Client) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, phone, address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Client, StoreError> {
        let row = sqlx::query("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("client", id))?;

        row_to_client(&row)
    }

    async fn list(&self) -> Result<Vec<Client>, StoreError> {
        let rows = sqlx::query("SELECT * FROM clients ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_client).collect()
    }

    async fn update(&self, client: &Client) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = $1, email = $2, phone = $3, address = $4
            WHERE id = $5
            "#,
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("client {}", client.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("client {}", id)));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub struct PostgresProviderRepository {
    pool: PgPool,
}

impl PostgresProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderRepository for PostgresProviderRepository {
    async fn create(&self, provider: &Provider) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO providers (id, name, email, phone, address, status, services, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(provider.id)
        .bind(&provider.name)
        .bind(&provider.email)
        .bind(&provider.phone)
        .bind(&provider.address)
        .bind(provider.status.to_string())
        .bind(&provider.services)
        .bind(provider.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Provider, StoreError> {
        let row = sqlx::query("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("provider", id))?;

        row_to_provider(&row)
    }

    async fn list(&self) -> Result<Vec<Provider>, StoreError> {
        let rows = sqlx::query("SELECT * FROM providers ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_provider).collect()
    }

    async fn update(&self, provider: &Provider) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE providers
            SET name = $1, email = $2, phone = $3, address = $4, status = $5, services = $6
            WHERE id = $7
            "#,
        )
        .bind(&provider.name)
        .bind(&provider.email)
        .bind(&provider.phone)
        .bind(&provider.address)
        .bind(provider.status.to_string())
        .bind(&provider.services)
        .bind(provider.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("provider {}", provider.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM providers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("provider {}", id)));
        }
        Ok(())
    }
}

pub struct PostgresServiceRepository {
    pool: PgPool,
}

impl PostgresServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PostgresServiceRepository {
    async fn create(&self, service: &Service) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO services
                (id, name, description, image_url, link, slot_capacity, price, provider_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(&service.image_url)
        .bind(&service.link)
        .bind(service.slot_capacity)
        .bind(service.price)
        .bind(service.provider_id)
        .bind(service.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Service, StoreError> {
        let row = sqlx::query("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("service", id))?;

        row_to_service(&row)
    }

    async fn list(&self) -> Result<Vec<Service>, StoreError> {
        let rows = sqlx::query("SELECT * FROM services ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_service).collect()
    }

    async fn update(&self, service: &Service) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE services
            SET name = $1, description = $2, image_url = $3, link = $4,
                slot_capacity = $5, price = $6, provider_id = $7
            WHERE id = $8
            "#,
        )
        .bind(&service.name)
        .bind(&service.description)
        .bind(&service.image_url)
        .bind(&service.link)
        .bind(service.slot_capacity)
        .bind(service.price)
        .bind(service.provider_id)
        .bind(service.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("service {}", service.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("service {}", id)));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, login, service_id, service_name, billing_date, note,
                 email_password, account_password, free_slots, occupied_slots,
                 version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(account.id)
        .bind(&account.login)
        .bind(account.service_id)
        .bind(&account.service_name)
        .bind(account.billing_date)
        .bind(&account.note)
        .bind(&account.email_password)
        .bind(&account.account_password)
        .bind(account.free_slots)
        .bind(account.occupied_slots)
        .bind(account.version)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Account, StoreError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("account", id))?;

        row_to_account(&row)
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_account).collect()
    }

    async fn update_details(&self, account: &Account) -> Result<(), StoreError> {
        // Counters stay out of this statement on purpose; the version bump
        // still invalidates any in-flight conditional write.
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET login = $1, billing_date = $2, note = $3,
                email_password = $4, account_password = $5,
                version = version + 1
            WHERE id = $6
            "#,
        )
        .bind(&account.login)
        .bind(account.billing_date)
        .bind(&account.note)
        .bind(&account.email_password)
        .bind(&account.account_password)
        .bind(account.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("account {}", account.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        // Profiles ride along via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("account {}", id)));
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_service(&self, service_id: Uuid) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE service_id = $1")
            .bind(service_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn sum_free_slots(&self) -> Result<i64, StoreError> {
        let sum: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(free_slots), 0) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(sum)
    }
}

pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Conditionally writes the slot counters inside `tx`. Zero rows means
    /// the version moved (or the account vanished) since the caller's read.
    async fn write_counters(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        account: &Account,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET free_slots = $1, occupied_slots = $2, version = version + 1
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(account.free_slots)
        .bind(account.occupied_slots)
        .bind(account.id)
        .bind(account.version)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Profile, StoreError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found("profile", id))?;

        row_to_profile(&row)
    }

    async fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query("SELECT * FROM profiles ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_profile).collect()
    }

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Profile>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM profiles WHERE account_id = $1 ORDER BY created_at DESC")
                .bind(account_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(row_to_profile).collect()
    }

    async fn update_details(&self, profile: &Profile) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET profile_name = $1, pin = $2, phone = $3,
                generates_payment = $4, price = $5
            WHERE id = $6
            "#,
        )
        .bind(&profile.profile_name)
        .bind(&profile.pin)
        .bind(&profile.phone)
        .bind(profile.generates_payment)
        .bind(profile.price)
        .bind(profile.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {}", profile.id)));
        }
        Ok(())
    }

    async fn renew(
        &self,
        id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE profiles SET start_date = $1, end_date = $2 WHERE id = $3")
            .bind(start_date)
            .bind(end_date)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {}", id)));
        }
        Ok(())
    }

    async fn insert_with_account(
        &self,
        profile: &Profile,
        account: &Account,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if !Self::write_counters(&mut tx, account).await? {
            tx.rollback().await?;
            return Err(StoreError::Conflict(format!(
                "account {} changed since it was read",
                account.id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, account_id, client_id, client_name, profile_name, pin, phone,
                 start_date, end_date, generates_payment, price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(profile.id)
        .bind(profile.account_id)
        .bind(profile.client_id)
        .bind(&profile.client_name)
        .bind(&profile.profile_name)
        .bind(&profile.pin)
        .bind(&profile.phone)
        .bind(profile.start_date)
        .bind(profile.end_date)
        .bind(profile.generates_payment)
        .bind(profile.price)
        .bind(profile.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_with_account(
        &self,
        profile_id: Uuid,
        account: &Account,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if !Self::write_counters(&mut tx, account).await? {
            tx.rollback().await?;
            return Err(StoreError::Conflict(format!(
                "account {} changed since it was read",
                account.id
            )));
        }

        let deleted = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound(format!("profile {}", profile_id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
