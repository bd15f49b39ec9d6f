use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    admin::{
        dto::{CreateUserForm, EditUserForm},
        services::{parse_user_id, validate_edit, validate_new_user, UserFormError},
    },
    auth::{guard::RequireAdmin, password::hash_password_blocking, session::SessionData},
    db::StoreError,
    donations::{dto::DonationForm, services::validate_donation},
    error::{AppError, AppResult},
    state::AppState,
    users::{User, UserOrder, UserUpdate},
    views::{
        donation_rows, AdminDonationFormPage, AdminUsersPage, CreateUserPage, DonationValues, EditUserPage, Nav,
        UserDetailPage, UserRow, View,
    },
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/new", get(new_user_form).post(create_user))
        .route("/admin/users/:id", get(user_detail))
        .route("/admin/users/:id/edit", get(edit_user_form).post(update_user))
        .route(
            "/admin/users/:id/donations/new",
            get(new_donation_form).post(create_donation),
        )
}

/// Resolves the `:id` segment to an existing user, or 404.
async fn load_user(state: &AppState, raw_id: &str) -> AppResult<User> {
    let Some(id) = parse_user_id(raw_id) else {
        return Err(AppError::NotFound);
    };
    state.users.find_by_id(id).await?.ok_or(AppError::NotFound)
}

/// A unique-key failure on write means another request took the email first.
fn email_conflict(e: StoreError) -> Result<UserFormError, AppError> {
    if e.is_constraint_violation() {
        Ok(UserFormError::EmailTaken)
    } else {
        Err(e.into())
    }
}

#[instrument(skip_all, fields(admin_id = session.user_id))]
pub async fn list_users(State(state): State<AppState>, RequireAdmin(session): RequireAdmin) -> AppResult<View> {
    let users = state.users.list(UserOrder::NewestFirst).await?;
    Ok(View::AdminUsers(AdminUsersPage {
        nav: Nav::from(&session),
        users: users.iter().map(UserRow::from).collect(),
    }))
}

fn create_page(session: &SessionData, error: Option<UserFormError>, form: &CreateUserForm) -> View {
    View::AdminCreateUser(CreateUserPage {
        nav: Nav::from(session),
        error: error.map(|e| e.to_string()),
        email: form.email.clone(),
        role: form.role.clone(),
    })
}

pub async fn new_user_form(RequireAdmin(session): RequireAdmin) -> View {
    create_page(&session, None, &CreateUserForm::default())
}

#[instrument(skip_all, fields(admin_id = session.user_id))]
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Form(form): Form<CreateUserForm>,
) -> AppResult<Response> {
    let rejected = |error: UserFormError| {
        warn!(%error, "create user rejected");
        create_page(&session, Some(error), &form).into_response()
    };

    let input = match validate_new_user(&form) {
        Ok(input) => input,
        Err(e) => return Ok(rejected(e)),
    };
    if state.users.email_taken(&input.email, None).await? {
        return Ok(rejected(UserFormError::EmailTaken));
    }

    let hash = hash_password_blocking(input.password.clone()).await?;
    let user = match state.users.create(&input.email, &hash, input.role).await {
        Ok(user) => user,
        Err(e) => return Ok(rejected(email_conflict(e)?)),
    };

    info!(user_id = user.id, role = %user.role, "user created");
    Ok(Redirect::to("/admin/users").into_response())
}

#[instrument(skip(state, session), fields(admin_id = session.user_id))]
pub async fn user_detail(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<View> {
    let user = load_user(&state, &id).await?;
    let donations = state.donations.list_for_user(user.id).await?;
    Ok(View::AdminUserDetail(UserDetailPage {
        nav: Nav::from(&session),
        viewed: UserRow::from(&user),
        donations: donation_rows(&donations),
    }))
}

#[instrument(skip(state, session), fields(admin_id = session.user_id))]
pub async fn edit_user_form(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<View> {
    let user = load_user(&state, &id).await?;
    Ok(View::AdminEditUser(EditUserPage {
        nav: Nav::from(&session),
        error: None,
        email: user.email.clone(),
        role: user.role.to_string(),
        user: UserRow::from(&user),
    }))
}

#[instrument(skip(state, session, form), fields(admin_id = session.user_id))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<EditUserForm>,
) -> AppResult<Response> {
    let user = load_user(&state, &id).await?;
    let rejected = |error: UserFormError| {
        warn!(%error, user_id = user.id, "edit user rejected");
        View::AdminEditUser(EditUserPage {
            nav: Nav::from(&session),
            error: Some(error.to_string()),
            user: UserRow::from(&user),
            email: form.email.clone(),
            role: form.role.clone(),
        })
        .into_response()
    };

    let input = match validate_edit(&form) {
        Ok(input) => input,
        Err(e) => return Ok(rejected(e)),
    };
    if state.users.email_taken(&input.email, Some(user.id)).await? {
        return Ok(rejected(UserFormError::EmailTaken));
    }

    // Hash before touching the row so a failure leaves it as it was.
    let password_hash = match input.new_password {
        Some(password) => Some(hash_password_blocking(password).await?),
        None => None,
    };
    let password_changed = password_hash.is_some();
    let update = UserUpdate {
        email: input.email,
        role: input.role,
        password_hash,
    };

    match state.users.update(user.id, &update).await {
        Ok(true) => {}
        Ok(false) => return Err(AppError::NotFound),
        Err(e) => return Ok(rejected(email_conflict(e)?)),
    }

    info!(user_id = user.id, role = %update.role, password_changed, "user updated");
    Ok(Redirect::to("/admin/users").into_response())
}

#[instrument(skip(state, session), fields(admin_id = session.user_id))]
pub async fn new_donation_form(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Path(id): Path<String>,
) -> AppResult<View> {
    let user = load_user(&state, &id).await?;
    Ok(View::AdminDonationForm(AdminDonationFormPage {
        nav: Nav::from(&session),
        target: UserRow::from(&user),
        error: None,
        values: DonationValues::default(),
    }))
}

#[instrument(skip(state, session, form), fields(admin_id = session.user_id))]
pub async fn create_donation(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<DonationForm>,
) -> AppResult<Response> {
    let user = load_user(&state, &id).await?;

    let donation = match validate_donation(&form, user.id) {
        Ok(d) => d,
        Err(error) => {
            warn!(%error, user_id = user.id, "donation rejected");
            return Ok(View::AdminDonationForm(AdminDonationFormPage {
                nav: Nav::from(&session),
                target: UserRow::from(&user),
                error: Some(error.to_string()),
                values: form.values(),
            })
            .into_response());
        }
    };

    state.donations.create(&donation).await?;
    info!(target_user = user.id, amount = %donation.amount, currency = %donation.currency, "donation recorded");
    Ok(Redirect::to(&format!("/admin/users/{}", user.id)).into_response())
}
