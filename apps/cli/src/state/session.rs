//! # Operator Session
//!
//! Every command runs under a `Session`, created by checking the supplied
//! credential against the configured one. There is no global "logged in"
//! flag: handlers take `&Session` as an argument.
//!
//! ```text
//! --user / --password            [auth] in kantin.toml
//! (or KANTIN_USERNAME / ...)     (or KANTIN_AUTH_USERNAME / ...)
//!          │                               │
//!          └──────────► Session::login ◄───┘
//!                            │
//!              ok ───────────┴────────── Unauthorized
//!              │
//!              ▼
//!        commands::run(&session, ...)
//! ```

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

use super::config::AuthConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,
}

/// Proof that the operator logged in.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Checks `username` / `password` against the configured credential.
    pub fn login(
        auth: &AuthConfig,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Session, SessionError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(SessionError::MissingCredentials);
        };

        // Evaluate both before branching so the timing does not reveal
        // which half was wrong.
        let user_ok = username.trim().as_bytes().ct_eq(auth.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(auth.password.as_bytes());

        if !bool::from(user_ok & pass_ok) {
            warn!(username = %username, "Login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        info!(username = %auth.username, "Operator logged in");
        Ok(Session {
            username: auth.username.clone(),
            started_at: Utc::now(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
