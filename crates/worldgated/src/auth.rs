//! Shared-secret authentication.
//!
//! One token guards the whole gateway. Sessions read it concurrently; the
//! admin shell may rotate it at any time. The current token lives behind an
//! `RwLock<Arc<str>>` so a reader either sees the old value or the new one,
//! never a mix, and rotation persists the new token before publishing it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use worldgate_config::{ConfigError, ConfigFile};

#[cfg(test)]
use mockall::automock;

pub(crate) const AUTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::auth");

const TOKEN_BYTES: usize = 32;

/// Errors raised while loading or persisting the token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token store could not be read or written.
    #[error("token storage failed: {source}")]
    Storage {
        /// Underlying configuration error.
        #[source]
        source: ConfigError,
    },
}

impl From<ConfigError> for AuthError {
    fn from(source: ConfigError) -> Self {
        Self::Storage { source }
    }
}

/// Durable home of the token.
#[cfg_attr(test, automock)]
pub trait TokenStore: Send + Sync {
    /// Returns the persisted token; an empty or absent value yields `None`.
    fn load(&self) -> Result<Option<String>, AuthError>;

    /// Durably records `token`, returning only once it is written.
    fn persist(&self, token: &str) -> Result<(), AuthError>;
}

/// Stores the token as `token` in the configuration file; `WORLDGATE_TOKEN`
/// overrides what is read back.
#[derive(Debug, Clone)]
pub struct ConfigTokenStore {
    file: ConfigFile,
}

impl ConfigTokenStore {
    /// Wraps the configuration file the daemon was started with.
    #[must_use]
    pub const fn new(file: ConfigFile) -> Self {
        Self { file }
    }
}

impl TokenStore for ConfigTokenStore {
    fn load(&self) -> Result<Option<String>, AuthError> {
        let config = self.file.load()?;
        let token = config.token.trim().to_owned();
        Ok((!token.is_empty()).then_some(token))
    }

    fn persist(&self, token: &str) -> Result<(), AuthError> {
        self.file
            .update(|config| config.token = token.to_owned())?;
        Ok(())
    }
}

/// Generates a fresh token: 256 random bits, URL-safe base64 without padding.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Issues, validates, and rotates the gateway token.
pub struct TokenAuthenticator {
    store: Arc<dyn TokenStore>,
    current: RwLock<Arc<str>>,
    require_token: AtomicBool,
    rotation: Mutex<()>,
}

impl TokenAuthenticator {
    /// Loads the persisted token, generating and persisting one when absent.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be read, or when a generated token cannot
    /// be persisted.
    pub fn issue_or_load(
        store: Arc<dyn TokenStore>,
        require_token: bool,
    ) -> Result<Self, AuthError> {
        let token = match store.load()? {
            Some(token) => token,
            None => {
                let token = generate_token();
                store.persist(&token)?;
                info!(target: AUTH_TARGET, "generated new gateway token");
                token
            }
        };
        Ok(Self {
            store,
            current: RwLock::new(Arc::from(token)),
            require_token: AtomicBool::new(require_token),
            rotation: Mutex::new(()),
        })
    }

    /// Returns the current token.
    #[must_use]
    pub fn token(&self) -> Arc<str> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns whether requests must present the token.
    #[must_use]
    pub fn requires_token(&self) -> bool {
        self.require_token.load(Ordering::SeqCst)
    }

    /// Turns the token requirement on or off.
    pub fn set_require_token(&self, required: bool) {
        self.require_token.store(required, Ordering::SeqCst);
    }

    /// Checks `candidate` against the current token.
    ///
    /// Always succeeds when the requirement is switched off. Otherwise the
    /// SHA-256 digests of both values are compared without early exit, so the
    /// time taken reveals neither the content nor the length of the token.
    #[must_use]
    pub fn validate(&self, candidate: &str) -> bool {
        if !self.requires_token() {
            return true;
        }
        let expected = Sha256::digest(self.token().as_bytes());
        let presented = Sha256::digest(candidate.as_bytes());
        expected
            .iter()
            .zip(presented.iter())
            .fold(0_u8, |acc, (left, right)| acc | (left ^ right))
            == 0
    }

    /// Replaces the token with a freshly generated one.
    ///
    /// The new token is persisted before it is published; if persistence
    /// fails the previous token stays in force.
    ///
    /// # Errors
    ///
    /// Returns the store error when the new token cannot be persisted.
    pub fn regenerate(&self) -> Result<Arc<str>, AuthError> {
        self.replace(generate_token())
    }

    /// Adopts a token edited into storage out of band.
    ///
    /// Returns whether the token changed.
    ///
    /// # Errors
    ///
    /// Returns the store error when the token cannot be read.
    pub fn reload(&self) -> Result<bool, AuthError> {
        let _rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = self.store.load()? else {
            return Ok(false);
        };
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if **current == *stored {
            return Ok(false);
        }
        *current = Arc::from(stored);
        info!(target: AUTH_TARGET, "adopted token from configuration");
        Ok(true)
    }

    fn replace(&self, token: String) -> Result<Arc<str>, AuthError> {
        let _rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.persist(&token)?;
        let token: Arc<str> = Arc::from(token);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&token);
        info!(target: AUTH_TARGET, "gateway token regenerated");
        Ok(token)
    }
}
