use serde::Deserialize;

use crate::views::DonationValues;

/// Body of both donation forms. Every field is optional on the wire so that a
/// missing field turns into a validation message rather than a 422.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonationForm {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub donated_on: String,
    #[serde(default)]
    pub note: String,
}

impl DonationForm {
    pub fn values(&self) -> DonationValues {
        DonationValues {
            user_id: self.user_id.clone(),
            amount: self.amount.clone(),
            currency: self.currency.clone(),
            donated_on: self.donated_on.clone(),
            note: self.note.clone(),
        }
    }
}
