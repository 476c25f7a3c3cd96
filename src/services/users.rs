//! User account management service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use rand::seq::SliceRandom;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, CreatedUser, NewUser, UpdateUser, User, UserChanges, UserQuery},
    repository::Repository,
    services::{email::Notifier, notices},
};

const PASSWORD_LENGTH: usize = 8;

const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
}

impl UsersService {
    pub fn new(repository: Repository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<User> {
        self.repository
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn list_users(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        self.repository.users.list(query).await
    }

    /// Create an account with a generated password and mail the credentials
    pub async fn create_user(&self, user: CreateUser) -> AppResult<CreatedUser> {
        user.validate()?;

        if self.repository.users.find_by_id(&user.id).await?.is_some() {
            return Err(AppError::Conflict("User with this ID already exists".to_string()));
        }
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("User with this email already exists".to_string()));
        }

        let password = generate_password();
        let created = self
            .repository
            .users
            .create(&NewUser {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
                password_hash: hash_password(&password)?,
            })
            .await?;

        tracing::info!(user_id = %created.id, role = %created.role, "User created");

        let notice = notices::account_created(&created, &password);
        let credentials_sent = self
            .notifier
            .send(&notice.subject, &notice.body, &created.email)
            .await;
        if !credentials_sent {
            tracing::warn!(user_id = %created.id, "Failed to send email credentials");
        }

        Ok(CreatedUser {
            user: created,
            credentials_sent,
        })
    }

    pub async fn update_user(&self, id: &str, update: UpdateUser) -> AppResult<User> {
        update.validate()?;

        if let Some(ref email) = update.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("User with this email already exists".to_string()));
            }
        }

        let password_hash = update.password.as_deref().map(hash_password).transpose()?;
        let user = self
            .repository
            .users
            .update(
                id,
                &UserChanges {
                    name: update.name,
                    email: update.email,
                    role: update.role,
                    password_hash,
                },
            )
            .await?;

        if let Some(ref password) = update.password {
            tracing::info!(user_id = %user.id, "Password reset by administrator");
            let notice = notices::password_updated(&user, password);
            if !self.notifier.send(&notice.subject, &notice.body, &user.email).await {
                tracing::warn!(user_id = %user.id, "Failed to send updated credentials");
            }
        }

        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

/// Random password from letters, digits and punctuation
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .filter_map(|_| PASSWORD_ALPHABET.choose(&mut rng))
        .map(|&b| b as char)
        .collect()
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
