use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::db::models::{Account, Profile, Role, TokenPair};
use crate::db::repository::UserRepository;
use crate::error::{AppError, DatabaseError};

const ACCOUNT_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, role, profile, tokens, created_at, updated_at";

/// Postgres-backed store. Profile and tokens live as JSONB documents on the
/// `users` row, so each account stays a single record.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    profile: Json<Profile>,
    tokens: Json<Vec<TokenPair>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DatabaseError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(DatabaseError::QueryError)?;
        Ok(Account {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password: row.password_hash,
            role,
            profile: row.profile.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            tokens: row.tokens.0,
        })
    }
}

impl PgUserRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Applies the bundled migrations in `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_one_by(&self, filter: &str, value: &str) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE {}", ACCOUNT_COLUMNS, filter);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Account::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, account: &Account) -> Result<Account, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO users ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS, ACCOUNT_COLUMNS
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.password)
            .bind(account.role.as_str())
            .bind(Json(account.profile.clone()))
            .bind(Json(account.tokens.clone()))
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        row.try_into()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        self.fetch_one_by("email = $1", email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS);
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Account::try_from).transpose()
    }

    async fn update_user_tokens(&self, id: Uuid, tokens: &[TokenPair]) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET tokens = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(Json(tokens.to_vec()))
            .bind(Utc::now())
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn delete_user_tokens(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET tokens = '[]'::jsonb, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<Account>, DatabaseError> {
        self.fetch_one_by(
            "tokens @> jsonb_build_array(jsonb_build_object('accessToken', $1::text)) \
             OR tokens @> jsonb_build_array(jsonb_build_object('refreshToken', $1::text))",
            token,
        )
        .await
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> Result<Option<Account>, DatabaseError> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .bind(role.as_str())
            .bind(Utc::now())
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Account::try_from).transpose()
    }
}
