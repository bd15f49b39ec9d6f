use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{normalize_email, LoginForm},
        guard::{AuthState, CurrentSession, RequireAnonymous},
        password::verify_password_blocking,
        session::SessionData,
    },
    error::AppResult,
    state::AppState,
    views::{LoginPage, View},
};

/// Shown for unknown emails and wrong passwords alike.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

pub async fn home(current: CurrentSession) -> Redirect {
    match current.auth {
        AuthState::Authenticated(_) => Redirect::to("/me"),
        AuthState::Anonymous => Redirect::to("/login"),
    }
}

pub async fn login_page(_: RequireAnonymous) -> View {
    View::Login(LoginPage::default())
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    _: RequireAnonymous,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let email = normalize_email(&form.email);
    let rejected = || {
        View::Login(LoginPage {
            error: Some(INVALID_CREDENTIALS.to_string()),
            email: email.clone(),
        })
        .into_response()
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Ok(rejected());
    };

    if !verify_password_blocking(form.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Ok(rejected());
    }

    let expire = OffsetDateTime::now_utc() + state.session_ttl();
    let sid = state.sessions.create(&SessionData::from(&user), expire).await?;

    info!(user_id = user.id, role = %user.role, "user logged in");
    Ok((
        [(SET_COOKIE, state.cookies.set_cookie(&sid))],
        Redirect::to("/me"),
    )
        .into_response())
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(sid) = state.cookies.session_id(&headers) {
        // the visitor is logged out either way
        match state.sessions.destroy(&sid).await {
            Ok(()) => info!("session destroyed"),
            Err(e) => warn!(error = %e, "session destroy failed"),
        }
    }
    (
        [(SET_COOKIE, state.cookies.clear_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}
