use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{guard::RequireAuth, session::SessionData},
    donations::{
        dto::DonationForm,
        services::{parse_donor, validate_donation, DonationError},
    },
    error::AppResult,
    state::AppState,
    users::{User, UserOrder},
    views::{donation_rows, DashboardPage, DonationFormPage, DonationValues, Nav, UserOption, UserRow, View},
};

pub fn donation_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(dashboard))
        .route("/donations/new", get(new_donation_form).post(create_donation))
}

#[instrument(skip(state, session), fields(user_id = session.user_id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(session): RequireAuth,
) -> AppResult<Response> {
    let Some(user) = state.users.find_by_id(session.user_id).await? else {
        warn!("session user no longer exists");
        return Ok(Redirect::to("/logout").into_response());
    };
    let donations = state.donations.list_for_user(user.id).await?;

    Ok(View::Dashboard(DashboardPage {
        nav: Nav::from(&session),
        user: UserRow::from(&user),
        donations: donation_rows(&donations),
    })
    .into_response())
}

fn donor_options(users: &[User], selected: &str) -> Vec<UserOption> {
    let selected = parse_donor(selected);
    users
        .iter()
        .map(|u| UserOption {
            id: u.id,
            email: u.email.clone(),
            selected: Some(u.id) == selected,
        })
        .collect()
}

/// Everyone an admin may record a donation for; `None` for non-admins.
async fn donor_choices(state: &AppState, session: &SessionData) -> AppResult<Option<Vec<User>>> {
    if !session.role.is_admin() {
        return Ok(None);
    }
    Ok(Some(state.users.list(UserOrder::EmailAsc).await?))
}

#[instrument(skip(state, session), fields(user_id = session.user_id))]
pub async fn new_donation_form(
    State(state): State<AppState>,
    RequireAuth(session): RequireAuth,
) -> AppResult<View> {
    let users = donor_choices(&state, &session).await?;
    Ok(View::DonationForm(DonationFormPage {
        nav: Nav::from(&session),
        users: users.as_deref().map(|u| donor_options(u, "")),
        error: None,
        values: DonationValues::default(),
    }))
}

#[instrument(skip(state, session, form), fields(user_id = session.user_id))]
pub async fn create_donation(
    State(state): State<AppState>,
    RequireAuth(session): RequireAuth,
    Form(form): Form<DonationForm>,
) -> AppResult<Response> {
    let users = donor_choices(&state, &session).await?;

    let rerender = |error: DonationError| {
        warn!(%error, "donation rejected");
        View::DonationForm(DonationFormPage {
            nav: Nav::from(&session),
            users: users.as_deref().map(|u| donor_options(u, &form.user_id)),
            error: Some(error.to_string()),
            values: form.values(),
        })
        .into_response()
    };

    let target = match &users {
        Some(users) => {
            let picked = parse_donor(&form.user_id).filter(|id| users.iter().any(|u| u.id == *id));
            match picked {
                Some(id) => id,
                None => return Ok(rerender(DonationError::MissingDonor)),
            }
        }
        None => session.user_id,
    };

    let donation = match validate_donation(&form, target) {
        Ok(d) => d,
        Err(e) => return Ok(rerender(e)),
    };

    state.donations.create(&donation).await?;
    info!(target_user = target, amount = %donation.amount, currency = %donation.currency, "donation recorded");
    Ok(Redirect::to("/me").into_response())
}
