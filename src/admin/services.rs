use crate::admin::dto::{CreateUserForm, EditUserForm};
use crate::auth::dto::{is_valid_email, normalize_email};
use crate::auth::password::MIN_PASSWORD_LEN;
use crate::users::Role;

/// Problems with the admin user forms. `Display` is the message shown on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UserFormError {
    #[error("All fields are required")]
    AllFieldsRequired,
    #[error("Email and role are required")]
    EmailAndRoleRequired,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Invalid role")]
    InvalidRole,
    #[error("A user with this email already exists")]
    EmailTaken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserInput {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditUserInput {
    pub email: String,
    pub role: Role,
    pub new_password: Option<String>,
}

fn long_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

fn parse_role(raw: &str) -> Result<Role, UserFormError> {
    raw.trim().parse().map_err(|_| UserFormError::InvalidRole)
}

/// Shape checks only; uniqueness is checked against the store by the caller.
pub fn validate_new_user(form: &CreateUserForm) -> Result<NewUserInput, UserFormError> {
    let email = normalize_email(&form.email);
    if email.is_empty() || form.password.is_empty() || form.role.trim().is_empty() {
        return Err(UserFormError::AllFieldsRequired);
    }
    if !is_valid_email(&email) {
        return Err(UserFormError::InvalidEmail);
    }
    if !long_enough(&form.password) {
        return Err(UserFormError::PasswordTooShort);
    }
    let role = parse_role(&form.role)?;
    Ok(NewUserInput {
        email,
        password: form.password.clone(),
        role,
    })
}

pub fn validate_edit(form: &EditUserForm) -> Result<EditUserInput, UserFormError> {
    let email = normalize_email(&form.email);
    if email.is_empty() || form.role.trim().is_empty() {
        return Err(UserFormError::EmailAndRoleRequired);
    }
    if !is_valid_email(&email) {
        return Err(UserFormError::InvalidEmail);
    }
    let role = parse_role(&form.role)?;
    let new_password = if form.password.trim().is_empty() {
        None
    } else if long_enough(&form.password) {
        Some(form.password.clone())
    } else {
        return Err(UserFormError::PasswordTooShort);
    };
    Ok(EditUserInput {
        email,
        role,
        new_password,
    })
}

/// Path ids that are not positive integers name no user.
pub fn parse_user_id(raw: &str) -> Option<i32> {
    raw.parse::<i32>().ok().filter(|id| *id > 0)
}
