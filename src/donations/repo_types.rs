use rust_decimal::Decimal;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// Donation record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Donation {
    pub id: i32,
    pub user_id: i32,
    pub amount: Decimal,        // NUMERIC(10, 2), always > 0
    pub currency: String,       // ISO-style 3-letter code
    pub donated_on: Date,
    pub note: Option<String>,
    pub created_at: OffsetDateTime,
}

/// A validated donation ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDonation {
    pub user_id: i32,
    pub amount: Decimal,
    pub currency: String,
    pub donated_on: Date,
    pub note: Option<String>,
}
