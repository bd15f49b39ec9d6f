use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::StoreError;
use crate::donations::repo_types::{Donation, NewDonation};

#[async_trait]
pub trait DonationRepo: Send + Sync {
    /// Most recent `donated_on` first.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Donation>, StoreError>;

    /// Fails with `ConstraintViolation` if the amount is not positive or the user is unknown.
    async fn create(&self, donation: &NewDonation) -> Result<(), StoreError>;
}

pub struct PgDonationRepo {
    db: PgPool,
}

impl PgDonationRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DonationRepo for PgDonationRepo {
    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Donation>, StoreError> {
        let started = Instant::now();
        let rows = sqlx::query_as::<_, Donation>(
            r#"
            SELECT id, user_id, amount, currency, donated_on, note, created_at
            FROM donations
            WHERE user_id = $1
            ORDER BY donated_on DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = rows.len(), "donations listed");
        Ok(rows)
    }

    #[instrument(skip(self, donation), fields(user_id = donation.user_id))]
    async fn create(&self, donation: &NewDonation) -> Result<(), StoreError> {
        let started = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO donations (user_id, amount, currency, donated_on, note)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(donation.user_id)
        .bind(donation.amount)
        .bind(&donation.currency)
        .bind(donation.donated_on)
        .bind(donation.note.as_deref())
        .execute(&self.db)
        .await?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, rows = result.rows_affected(), "donation inserted");
        Ok(())
    }
}
