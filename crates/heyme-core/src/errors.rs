use reqwest::StatusCode;
use thiserror::Error;

/// Failures while turning user input into a session token.
///
/// The `Display` text is what the login surface shows to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter a LiveKit token")]
    EmptyToken,
    #[error("Please enter both email and password")]
    MissingField,
    #[error("Login failed: {0}")]
    LoginFailed(StatusCode),
    #[error("No access token received from login")]
    NoAccessToken,
    #[error("Failed to get LiveKit token: {0}")]
    MeetingFetchFailed(StatusCode),
    #[error("Failed to get LiveKit token from response")]
    MeetingDataMissing,
    #[error("Authentication failed: {0}")]
    InvalidResponse(String),
    #[error("Authentication failed: {0}")]
    Http(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("failed to connect to room: {0}")]
    ConnectFailed(String),
    #[error("not connected")]
    NotConnected,
    #[error("failed to publish track: {0}")]
    Publish(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid url for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HeymeError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
