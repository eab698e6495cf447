//! Subcommand implementations.
//!
//! Every command runs against a [`Context`]: the configuration, the selected
//! backend and a session guard restored from the session store before the
//! command starts.

use std::io::{BufRead, Write};
use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;

use sealen_client::api::ConnectError;
use sealen_client::session::SessionStore;
use sealen_client::{ClientConfig, ClientError, FileSessionStore, MarineApi, SessionGuard};

pub mod auth;
pub mod certification;
pub mod demo;
pub mod pages;
pub mod robot;
pub mod shop;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to connect: {0}")]
    Connect(#[from] ConnectError),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Failed to read from terminal: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    fn argument(message: impl std::fmt::Display) -> Self {
        Self::Argument(message.to_string())
    }
}

/// Everything a command needs.
pub struct Context<S: SessionStore = FileSessionStore> {
    pub config: ClientConfig,
    pub api: Arc<dyn MarineApi>,
    pub guard: SessionGuard<S>,
}

impl Context<FileSessionStore> {
    /// Build the backend and restore the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Connect` if the backend cannot be built. A stored
    /// session that the API rejects is cleared, not reported.
    pub async fn connect(config: ClientConfig) -> Result<Self, CliError> {
        let api = sealen_client::connect(&config)?;
        let store = FileSessionStore::new(&config.session_file);
        Ok(Self::restore(config, api, store).await)
    }
}

impl<S: SessionStore> Context<S> {
    /// Wrap `store` in a session guard and restore whatever it holds.
    pub async fn restore(config: ClientConfig, api: Arc<dyn MarineApi>, store: S) -> Self {
        let mut guard = SessionGuard::new(store);
        guard.restore(api.as_ref()).await;
        Self { config, api, guard }
    }

    pub fn api(&self) -> &dyn MarineApi {
        self.api.as_ref()
    }
}

/// Use `given`, or prompt for a secret on the terminal.
fn secret_or_prompt(given: Option<String>, prompt: &str) -> Result<SecretString, CliError> {
    if let Some(value) = given {
        return Ok(SecretString::from(value));
    }

    let mut stderr = std::io::stderr().lock();
    write!(stderr, "{prompt}: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
    Ok(SecretString::from(trimmed))
}
