use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::normalize_email, password::hash_password_blocking},
    config::BootstrapConfig,
    users::{Role, UserRepo},
};

/// Creates the configured admin account unless that email already exists.
/// An existing row is left untouched, whatever its role or password.
#[instrument(skip_all)]
pub async fn ensure_default_admin(users: &dyn UserRepo, config: &BootstrapConfig) -> anyhow::Result<()> {
    let email = normalize_email(&config.admin_email);
    let hash = hash_password_blocking(config.admin_password.clone()).await?;

    match users.create_if_absent(&email, &hash, Role::Admin).await? {
        Some(user) => {
            info!(user_id = user.id, %email, "default admin created");
            warn!("change the default admin password after first login");
        }
        None => info!(%email, "default admin already present"),
    }
    Ok(())
}
