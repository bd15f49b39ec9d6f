//! Server-rendered pages.
//!
//! Every page the app can produce is a [`View`] variant; `render` maps each one to
//! its embedded tera template. Templates are autoescaped.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use lazy_static::lazy_static;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::error;

pub mod pages;

pub use pages::*;

lazy_static! {
    static ref TEMPLATES: Tera = build_templates().expect("embedded templates must parse");
}

fn build_templates() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../templates/base.html")),
        ("login.html", include_str!("../../templates/login.html")),
        ("dashboard.html", include_str!("../../templates/dashboard.html")),
        ("donation_form.html", include_str!("../../templates/donation_form.html")),
        ("admin_users.html", include_str!("../../templates/admin_users.html")),
        ("admin_create_user.html", include_str!("../../templates/admin_create_user.html")),
        ("admin_user_detail.html", include_str!("../../templates/admin_user_detail.html")),
        ("admin_edit_user.html", include_str!("../../templates/admin_edit_user.html")),
        ("admin_donation_form.html", include_str!("../../templates/admin_donation_form.html")),
        ("error.html", include_str!("../../templates/error.html")),
        ("db_check.html", include_str!("../../templates/db_check.html")),
    ])?;
    Ok(tera)
}

#[derive(Debug, Clone)]
pub enum View {
    Login(LoginPage),
    Dashboard(DashboardPage),
    DonationForm(DonationFormPage),
    AdminUsers(AdminUsersPage),
    AdminCreateUser(CreateUserPage),
    AdminUserDetail(UserDetailPage),
    AdminEditUser(EditUserPage),
    AdminDonationForm(AdminDonationFormPage),
    Error(ErrorPage),
    DbCheck(DbCheckPage),
}

fn render_page<T: Serialize>(template: &str, page: &T) -> tera::Result<String> {
    let ctx = Context::from_serialize(page)?;
    TEMPLATES.render(template, &ctx)
}

impl View {
    pub fn render(&self) -> tera::Result<String> {
        match self {
            View::Login(p) => render_page("login.html", p),
            View::Dashboard(p) => render_page("dashboard.html", p),
            View::DonationForm(p) => render_page("donation_form.html", p),
            View::AdminUsers(p) => render_page("admin_users.html", p),
            View::AdminCreateUser(p) => render_page("admin_create_user.html", p),
            View::AdminUserDetail(p) => render_page("admin_user_detail.html", p),
            View::AdminEditUser(p) => render_page("admin_edit_user.html", p),
            View::AdminDonationForm(p) => render_page("admin_donation_form.html", p),
            View::Error(p) => render_page("error.html", p),
            View::DbCheck(p) => render_page("db_check.html", p),
        }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        match self.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!(error = ?e, "template render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// A view with a non-200 status.
pub fn with_status(status: StatusCode, view: View) -> Response {
    let mut res = view.into_response();
    if res.status() == StatusCode::OK {
        *res.status_mut() = status;
    }
    res
}
