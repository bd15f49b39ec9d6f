//! Per-request access gate.
//!
//! Each request starts `Anonymous` and becomes `Authenticated(role)` only when it
//! carries a correctly signed cookie naming a live session. The route then states its
//! [`Requirement`] by taking one of the extractors below as an argument:
//!
//! | extractor          | Anonymous            | Authenticated(user) | Authenticated(admin) |
//! |--------------------|----------------------|---------------------|----------------------|
//! | [`RequireAuth`]    | redirect `/login`    | pass                | pass                 |
//! | [`RequireAdmin`]   | redirect `/login`    | 403                 | pass                 |
//! | [`RequireAnonymous`] | pass               | redirect `/me`      | redirect `/me`       |
//! | [`CurrentSession`] | pass                 | pass                | pass                 |

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use time::OffsetDateTime;
use tracing::error;

use crate::auth::session::SessionData;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(SessionData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Admin,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    RedirectToLogin,
    RedirectToDashboard,
    Forbidden,
}

pub fn evaluate(requirement: Requirement, auth: &AuthState) -> Decision {
    match (requirement, auth) {
        (Requirement::Authenticated, AuthState::Anonymous) => Decision::RedirectToLogin,
        (Requirement::Authenticated, AuthState::Authenticated(_)) => Decision::Pass,
        (Requirement::Admin, AuthState::Anonymous) => Decision::RedirectToLogin,
        (Requirement::Admin, AuthState::Authenticated(s)) if s.role.is_admin() => Decision::Pass,
        (Requirement::Admin, AuthState::Authenticated(_)) => Decision::Forbidden,
        (Requirement::Anonymous, AuthState::Anonymous) => Decision::Pass,
        (Requirement::Anonymous, AuthState::Authenticated(_)) => Decision::RedirectToDashboard,
    }
}

#[derive(Debug)]
pub enum GuardRejection {
    RedirectToLogin,
    RedirectToDashboard,
    Forbidden,
    Internal(anyhow::Error),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            GuardRejection::RedirectToLogin => Redirect::to("/login").into_response(),
            GuardRejection::RedirectToDashboard => Redirect::to("/me").into_response(),
            GuardRejection::Forbidden => AppError::Forbidden.into_response(),
            GuardRejection::Internal(e) => AppError::Internal(e).into_response(),
        }
    }
}

impl Decision {
    pub fn into_result(self) -> Result<(), GuardRejection> {
        match self {
            Decision::Pass => Ok(()),
            Decision::RedirectToLogin => Err(GuardRejection::RedirectToLogin),
            Decision::RedirectToDashboard => Err(GuardRejection::RedirectToDashboard),
            Decision::Forbidden => Err(GuardRejection::Forbidden),
        }
    }
}

/// Session state of the request, whatever it is. Never rejects except on store failure.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub sid: Option<String>,
    pub auth: AuthState,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(sid) = state.cookies.session_id(&parts.headers) else {
            return Ok(CurrentSession {
                sid: None,
                auth: AuthState::Anonymous,
            });
        };

        let data = state
            .sessions
            .read(&sid, OffsetDateTime::now_utc())
            .await
            .map_err(|e| {
                error!(error = %e, "session read failed");
                GuardRejection::Internal(e.into())
            })?;

        let auth = match data {
            Some(data) => AuthState::Authenticated(data),
            None => AuthState::Anonymous,
        };
        Ok(CurrentSession { sid: Some(sid), auth })
    }
}

async fn gate(
    parts: &mut Parts,
    state: &AppState,
    requirement: Requirement,
) -> Result<AuthState, GuardRejection> {
    let current = CurrentSession::from_request_parts(parts, state).await?;
    evaluate(requirement, &current.auth).into_result()?;
    Ok(current.auth)
}

/// Any logged-in user.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub SessionData);

#[async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match gate(parts, state, Requirement::Authenticated).await? {
            AuthState::Authenticated(data) => Ok(RequireAuth(data)),
            AuthState::Anonymous => Err(GuardRejection::RedirectToLogin),
        }
    }
}

/// Logged-in admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub SessionData);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match gate(parts, state, Requirement::Admin).await? {
            AuthState::Authenticated(data) => Ok(RequireAdmin(data)),
            AuthState::Anonymous => Err(GuardRejection::RedirectToLogin),
        }
    }
}

/// Only for visitors who are not logged in (the login page).
#[derive(Debug, Clone, Copy)]
pub struct RequireAnonymous;

#[async_trait]
impl FromRequestParts<AppState> for RequireAnonymous {
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        gate(parts, state, Requirement::Anonymous).await?;
        Ok(RequireAnonymous)
    }
}
