use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::StoreError;
use crate::users::repo_types::{Role, User, UserOrder, UserUpdate};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn list(&self, order: UserOrder) -> Result<Vec<User>, StoreError>;

    /// True when another account already uses `email`.
    async fn email_taken(&self, email: &str, excluding: Option<i32>) -> Result<bool, StoreError>;

    /// Fails with `ConstraintViolation` when the email is already present.
    async fn create(&self, email: &str, password_hash: &str, role: Role)
        -> Result<User, StoreError>;

    /// Insert unless the email exists. Returns the new row, or `None` if it was already there.
    async fn create_if_absent(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>, StoreError>;

    /// Applies all fields atomically. Returns false when no user has `id`.
    async fn update(&self, id: i32, update: &UserUpdate) -> Result<bool, StoreError>;
}

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at";

#[async_trait]
impl UserRepo for PgUserRepo {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let started = Instant::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, found = user.is_some(), "users by email");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let started = Instant::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, found = user.is_some(), "users by id");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list(&self, order: UserOrder) -> Result<Vec<User>, StoreError> {
        let started = Instant::now();
        let order_by = match order {
            UserOrder::EmailAsc => "email ASC",
            UserOrder::NewestFirst => "created_at DESC, id DESC",
        };
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY {order_by}"
        ))
        .fetch_all(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = rows.len(), "users listed");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn email_taken(&self, email: &str, excluding: Option<i32>) -> Result<bool, StoreError> {
        let started = Instant::now();
        let row = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT id
            FROM users
            WHERE email = $1 AND ($2::INTEGER IS NULL OR id <> $2)
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(excluding)
        .fetch_optional(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, taken = row.is_some(), "email uniqueness");
        Ok(row.is_some())
    }

    #[instrument(skip(self, password_hash))]
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, StoreError> {
        let started = Instant::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, user_id = user.id, "user inserted");
        Ok(user)
    }

    #[instrument(skip(self, password_hash))]
    async fn create_if_absent(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>, StoreError> {
        let started = Instant::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_optional(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, inserted = user.is_some(), "user insert if absent");
        Ok(user)
    }

    #[instrument(skip(self, update), fields(password_changed = update.password_hash.is_some()))]
    async fn update(&self, id: i32, update: &UserUpdate) -> Result<bool, StoreError> {
        let started = Instant::now();
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query("UPDATE users SET email = $1, role = $2 WHERE id = $3")
            .bind(&update.email)
            .bind(update.role.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            tx.rollback().await?;
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = 0, "user update");
            return Ok(false);
        }

        if let Some(hash) = &update.password_hash {
            sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
                .bind(hash)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = updated, "user update");
        Ok(true)
    }
}
