//! Credential verification
//!
//! The session layer only needs to know who logged in; how credentials are
//! checked sits behind [`Authenticator`].

use std::collections::HashMap;

use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use sbweb_shared::config::AccountSettings;

use crate::error::ApiError;

/// A verified user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub login: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Ok(None)` for an unknown login or a wrong password.
    async fn authenticate(&self, login: &str, password: &str) -> Result<Option<Principal>, ApiError>;
}

/// PHC-format Argon2 hash of `password`, as stored in `accounts[].password_hash`.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// `Ok(false)` on a mismatch, `Err` when `phc` is not a usable hash.
fn verify_password(password: &str, phc: &str) -> Result<bool, password_hash::Error> {
    let parsed = PasswordHash::new(phc)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Accounts listed in the `accounts` configuration section.
pub struct ConfigAuthenticator {
    accounts: HashMap<String, AccountSettings>,
}

impl ConfigAuthenticator {
    pub fn new(accounts: &[AccountSettings]) -> Self {
        Self {
            accounts: accounts
                .iter()
                .map(|a| (a.login.clone(), a.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for ConfigAuthenticator {
    async fn authenticate(&self, login: &str, password: &str) -> Result<Option<Principal>, ApiError> {
        let Some(account) = self.accounts.get(login) else {
            return Ok(None);
        };

        // Blocking task for CPU-intensive hash verification
        let password = password.to_owned();
        let phc = account.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &phc))
            .await
            .map_err(|e| ApiError::InternalError(format!("Password check aborted: {}", e)))?
            .map_err(|e| ApiError::InternalError(format!("Account {} has an unusable hash: {}", login, e)))?;

        Ok(valid.then(|| Principal {
            user_id: account.user_id,
            login: account.login.clone(),
        }))
    }
}
