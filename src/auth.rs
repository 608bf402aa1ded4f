use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

const PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately generic; callers show it as-is and never leak which
    /// part of the credential pair was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("this email is already registered")]
    EmailAlreadyInUse,
    #[error("no account exists for {0}")]
    AccountNotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// The authentication collaborator. A trait so the provisioning saga can be
/// exercised against a substitute without touching a real backend.
pub trait AuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError>;
    async fn create_account(&self, email: &str, password: &str) -> Result<(), AuthError>;
    /// Resets the account to a generated temporary password and returns it,
    /// the CLI analog of sending a password-reset email.
    async fn reset_password(&self, email: &str) -> Result<String, AuthError>;
}

/// Accounts held in the `accounts` table, PBKDF2-HMAC-SHA256 password
/// hashes with a per-account random salt. Emails are stored lowercased.
pub struct PgAuthProvider {
    pool: PgPool,
}

impl PgAuthProvider {
    pub fn new(pool: PgPool) -> Self {
        PgAuthProvider { pool }
    }

    async fn fetch_credentials(&self, email: &str) -> Result<Option<(String, String)>, AuthError> {
        let row = sqlx::query(
            "SELECT password_hash, salt FROM call_analytics.accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.into()))?;
        Ok(row.map(|r| (r.get("password_hash"), r.get("salt"))))
    }
}

impl AuthProvider for PgAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        let Some((hash, salt)) = self.fetch_credentials(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if verify_password(password, &salt, &hash) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        if self.fetch_credentials(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }
        let (salt, hash) = hash_password(password);
        sqlx::query(
            "INSERT INTO call_analytics.accounts (email, password_hash, salt) VALUES ($1, $2, $3)",
        )
        .bind(&email)
        .bind(&hash)
        .bind(&salt)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.into()))?;
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<String, AuthError> {
        let email = email.trim().to_lowercase();
        if self.fetch_credentials(&email).await?.is_none() {
            return Err(AuthError::AccountNotFound(email));
        }
        let temporary = Uuid::new_v4().simple().to_string();
        let (salt, hash) = hash_password(&temporary);
        sqlx::query(
            "UPDATE call_analytics.accounts SET password_hash = $2, salt = $3 WHERE email = $1",
        )
        .bind(&email)
        .bind(&hash)
        .bind(&salt)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.into()))?;
        Ok(temporary)
    }
}

/// Returns (salt, hash), both base64.
pub fn hash_password(password: &str) -> (String, String) {
    let salt = Uuid::new_v4().into_bytes();
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);
    (B64.encode(salt), B64.encode(key))
}

pub fn verify_password(password: &str, salt_b64: &str, hash_b64: &str) -> bool {
    let Ok(salt) = B64.decode(salt_b64) else {
        return false;
    };
    let Ok(expected) = B64.decode(hash_b64) else {
        return false;
    };
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);
    key.as_slice() == expected.as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_with_the_right_password_only() {
        let (salt, hash) = hash_password("hunter22");
        assert!(verify_password("hunter22", &salt, &hash));
        assert!(!verify_password("hunter23", &salt, &hash));
    }

    #[test]
    fn salts_differ_between_accounts() {
        let (salt_a, hash_a) = hash_password("same-password");
        let (salt_b, hash_b) = hash_password("same-password");
        assert_ne!(salt_a, salt_b);
        assert_ne!(hash_a, hash_b);
    }

    #[test]
    fn garbage_stored_credentials_never_verify() {
        assert!(!verify_password("x", "not base64!", "also not"));
    }
}
