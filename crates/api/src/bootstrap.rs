//! First-start seeding of an admin account.

use tally_core::roles::Role;
use tally_db::models::user::CreateUser;
use tally_db::Storage;

use crate::auth::password::hash_password;
use crate::config::BootstrapAdmin;
use crate::error::{AppError, AppResult};

/// Create the configured admin unless a user with that name already exists.
///
/// Returns `true` when a user was created.
pub async fn ensure_admin(storage: &Storage, admin: &BootstrapAdmin) -> AppResult<bool> {
    if storage
        .find_user_by_username(&admin.username)
        .await?
        .is_some()
    {
        tracing::debug!(username = %admin.username, "Bootstrap admin already present");
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = storage
        .create_user(&CreateUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await?;
    tracing::info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_admin_once() {
        let storage = Storage::in_memory();
        let admin = BootstrapAdmin {
            username: "root".into(),
            password: "bootstrap-password".into(),
            email: "root@localhost".into(),
        };

        assert!(ensure_admin(&storage, &admin).await.unwrap());
        assert!(!ensure_admin(&storage, &admin).await.unwrap());

        let user = storage.find_user_by_username("root").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.is_active);
    }
}
