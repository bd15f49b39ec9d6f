use serde::Serialize;
use time::{format_description::FormatItem, macros::format_description};

use crate::auth::session::SessionData;
use crate::donations::repo_types::Donation;
use crate::users::User;

const DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATE_TIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Header bar for logged-in pages.
#[derive(Debug, Clone, Serialize)]
pub struct Nav {
    pub email: String,
    pub is_admin: bool,
}

impl From<&SessionData> for Nav {
    fn from(s: &SessionData) -> Self {
        Self {
            email: s.email.clone(),
            is_admin: s.role.is_admin(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            role: u.role.to_string(),
            created_at: u.created_at.format(DATE_TIME).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DonationRow {
    pub id: i32,
    pub amount: String,
    pub currency: String,
    pub donated_on: String,
    pub note: Option<String>,
}

impl From<&Donation> for DonationRow {
    fn from(d: &Donation) -> Self {
        Self {
            id: d.id,
            amount: format!("{:.2}", d.amount),
            currency: d.currency.clone(),
            donated_on: d.donated_on.format(DATE).unwrap_or_default(),
            note: d.note.clone(),
        }
    }
}

pub fn donation_rows(donations: &[Donation]) -> Vec<DonationRow> {
    donations.iter().map(DonationRow::from).collect()
}

/// Raw values of a donation form, echoed back after a validation failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DonationValues {
    pub user_id: String,
    pub amount: String,
    pub currency: String,
    pub donated_on: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserOption {
    pub id: i32,
    pub email: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginPage {
    pub error: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPage {
    pub nav: Nav,
    pub user: UserRow,
    pub donations: Vec<DonationRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DonationFormPage {
    pub nav: Nav,
    /// Present only for admins, who pick the donor.
    pub users: Option<Vec<UserOption>>,
    pub error: Option<String>,
    pub values: DonationValues,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminUsersPage {
    pub nav: Nav,
    pub users: Vec<UserRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserPage {
    pub nav: Nav,
    pub error: Option<String>,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetailPage {
    pub nav: Nav,
    pub viewed: UserRow,
    pub donations: Vec<DonationRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditUserPage {
    pub nav: Nav,
    pub error: Option<String>,
    pub user: UserRow,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDonationFormPage {
    pub nav: Nav,
    pub target: UserRow,
    pub error: Option<String>,
    pub values: DonationValues,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPage {
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbCheckPage {
    pub ok: bool,
    pub now: Option<String>,
    pub version: Option<String>,
}

pub fn format_timestamp(ts: time::OffsetDateTime) -> String {
    ts.format(DATE_TIME).unwrap_or_default()
}
