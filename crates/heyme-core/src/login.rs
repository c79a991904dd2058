use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::{Credentials, SessionToken, TokenAcquirer};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Credentials,
    Token,
}

/// State of the login surface between submissions.
///
/// A failed submission only sets `error`; what the user typed stays put so
/// they can correct it and try again.
#[derive(Clone, Default)]
pub struct LoginForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    pub token: String,
    pub error: Option<String>,
    pub is_loading: bool,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("mode", &self.mode)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .field("error", &self.error)
            .field("is_loading", &self.is_loading)
            .finish()
    }
}

impl LoginForm {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode, ..Default::default() }
    }

    pub fn credentials(&self) -> Credentials {
        match self.mode {
            AuthMode::Token => Credentials::Token(self.token.clone()),
            AuthMode::Credentials => Credentials::password(&self.email, &self.password),
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.is_loading, self.mode) {
            (true, _) => "Connecting...",
            (false, AuthMode::Token) => "Connect with Token",
            (false, AuthMode::Credentials) => "Login & Connect",
        }
    }

    /// Resolve the form into a session token, recording any failure in
    /// `error`.
    pub async fn submit(&mut self, acquirer: &TokenAcquirer) -> Option<SessionToken> {
        self.error = None;
        self.is_loading = true;
        let result = acquirer.acquire(&self.credentials()).await;
        self.is_loading = false;

        match result {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("authentication error: {e}");
                self.error = Some(e.to_string());
                None
            }
        }
    }
}
