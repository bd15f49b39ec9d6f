use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use time::{macros::format_description, Date};

use crate::donations::dto::DonationForm;
use crate::donations::repo_types::NewDonation;

pub const DEFAULT_CURRENCY: &str = "EUR";

/// Largest amount that fits NUMERIC(10, 2).
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2); // 99999999.99

/// Field-level problems with a submitted donation. `Display` is the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DonationError {
    #[error("Please select a user for this donation")]
    MissingDonor,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Please select a date")]
    MissingDate,
    #[error("Please select a valid date")]
    InvalidDate,
    #[error("Please enter a valid 3-letter currency code")]
    InvalidCurrency,
}

/// Positive amount rounded to cents, or `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let amount = Decimal::from_str(raw)
        .ok()?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (amount > Decimal::ZERO && amount <= MAX_AMOUNT).then_some(amount)
}

pub fn parse_date(raw: &str) -> Result<Date, DonationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DonationError::MissingDate);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|_| DonationError::InvalidDate)
}

pub fn parse_currency(raw: &str) -> Result<String, DonationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_CURRENCY.to_string());
    }
    if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(raw.to_ascii_uppercase())
    } else {
        Err(DonationError::InvalidCurrency)
    }
}

/// Donor id picked in the admin dropdown, if it parses.
pub fn parse_donor(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|id| *id > 0)
}

/// Checks amount, then date, then currency, reporting the first problem.
pub fn validate_donation(form: &DonationForm, user_id: i32) -> Result<NewDonation, DonationError> {
    let amount = parse_amount(&form.amount).ok_or(DonationError::InvalidAmount)?;
    let donated_on = parse_date(&form.donated_on)?;
    let currency = parse_currency(&form.currency)?;
    let note = Some(form.note.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Ok(NewDonation {
        user_id,
        amount,
        currency,
        donated_on,
        note,
    })
}
