use std::fmt;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::errors::{AuthError, SettingsError};

pub const LOGIN_PATH: &str = "/api/ui/v1/users/login";
pub const MEETING_PATH: &str = "/api/ui/v1/meetings/public";

/// What the user typed into the login surface.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A LiveKit access token pasted as-is.
    Token(String),
    /// Email and password for the HeyMe identity service.
    Password { email: String, password: SecretString },
}

impl Credentials {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Opaque signed credential for one LiveKit room.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a token from the `data` payload of the meetings endpoint.
    ///
    /// Strings are taken verbatim, any other truthy value is forwarded as
    /// compact JSON. Falsy payloads yield `None`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if !is_truthy(payload) {
            return None;
        }
        match payload {
            Value::String(s) => Some(Self(s.clone())),
            other => Some(Self(other.to_string())),
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// JavaScript-style truthiness, which is what the HeyMe API clients check.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MeetingResponse {
    #[serde(default)]
    success: Value,
    #[serde(default)]
    data: Value,
}

/// Resolves user credentials into a LiveKit session token.
///
/// Token mode never touches the network. Credential mode logs in against the
/// identity service, then exchanges the bearer token for the public meeting's
/// session token. Steps run in order and stop at the first failure; nothing
/// is retried or cached between calls.
pub struct TokenAcquirer {
    client: reqwest::Client,
    login_url: Url,
    meeting_url: Url,
}

impl TokenAcquirer {
    pub fn new(api_base: &Url) -> Result<Self, SettingsError> {
        let join = |path: &str| {
            api_base
                .join(path)
                .map_err(|e| SettingsError::InvalidUrl {
                    field: "api_base_url",
                    reason: e.to_string(),
                })
        };
        Ok(Self {
            client: reqwest::Client::new(),
            login_url: join(LOGIN_PATH)?,
            meeting_url: join(MEETING_PATH)?,
        })
    }

    pub async fn acquire(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        match credentials {
            Credentials::Token(raw) => {
                let token = raw.trim();
                if token.is_empty() {
                    return Err(AuthError::EmptyToken);
                }
                tracing::info!("using pasted LiveKit token");
                Ok(SessionToken::new(token))
            }
            Credentials::Password { email, password } => {
                let email = email.trim();
                let password = password.expose_secret().trim();
                if email.is_empty() || password.is_empty() {
                    return Err(AuthError::MissingField);
                }
                let access_token = self.login(email, password).await?;
                self.fetch_meeting_token(&access_token).await
            }
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<SecretString, AuthError> {
        tracing::info!("logging in to {} as {email}", self.login_url);

        let resp = self
            .client
            .post(self.login_url.clone())
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("login rejected with status {status}");
            return Err(AuthError::LoginFailed(status));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("invalid login response: {e}")))?;

        body.pointer("/data/access_token")
            .filter(|t| is_truthy(t))
            .map(|t| match t {
                Value::String(s) => SecretString::from(s.clone()),
                other => SecretString::from(other.to_string()),
            })
            .ok_or(AuthError::NoAccessToken)
    }

    async fn fetch_meeting_token(&self, access_token: &SecretString) -> Result<SessionToken, AuthError> {
        tracing::info!("requesting LiveKit token from {}", self.meeting_url);

        let resp = self
            .client
            .get(self.meeting_url.clone())
            .header(
                AUTHORIZATION,
                format!("Bearer {}", access_token.expose_secret()),
            )
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("meeting request failed with status {status}");
            return Err(AuthError::MeetingFetchFailed(status));
        }

        let meeting: MeetingResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("invalid meeting response: {e}")))?;

        if !is_truthy(&meeting.success) {
            return Err(AuthError::MeetingDataMissing);
        }
        SessionToken::from_payload(&meeting.data).ok_or(AuthError::MeetingDataMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn acquirer(server: &MockServer) -> TokenAcquirer {
        let base = Url::parse(&server.uri()).unwrap();
        TokenAcquirer::new(&base).unwrap()
    }

    async fn mount_login(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn expect_no_meeting_call(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(MEETING_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn token_mode_trims_input() {
        let server = MockServer::start().await;
        let token = acquirer(&server)
            .acquire(&Credentials::Token("  abc123  ".into()))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "abc123");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_mode_rejects_blank_input() {
        let server = MockServer::start().await;
        let acquirer = acquirer(&server);
        for input in ["", "   ", "\n\t"] {
            let err = acquirer
                .acquire(&Credentials::Token(input.into()))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::EmptyToken));
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_field_makes_no_network_call() {
        let server = MockServer::start().await;
        let acquirer = acquirer(&server);
        for (email, password) in [("", "secret"), ("a@b.c", "  "), (" ", "")] {
            let err = acquirer
                .acquire(&Credentials::password(email, password))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::MissingField));
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_exchange_returns_meeting_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({"email": "a@b.c", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": "X"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(MEETING_PATH))
            .and(header("authorization", "Bearer X"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"room": "public", "token": "lk-jwt"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = acquirer(&server)
            .acquire(&Credentials::password(" a@b.c ", " pw "))
            .await
            .unwrap();

        let payload: Value = serde_json::from_str(token.as_str()).unwrap();
        assert_eq!(payload, json!({"room": "public", "token": "lk-jwt"}));
    }

    #[tokio::test]
    async fn string_payload_is_used_verbatim() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": "X"}})),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(MEETING_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "lk-jwt"})),
            )
            .mount(&server)
            .await;

        let token = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "pw"))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "lk-jwt");
    }

    #[tokio::test]
    async fn login_failure_short_circuits() {
        let server = MockServer::start().await;
        mount_login(&server, ResponseTemplate::new(401)).await;
        expect_no_meeting_call(&server).await;

        let err = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::LoginFailed(s) if s == StatusCode::UNAUTHORIZED));
        assert_eq!(err.to_string(), "Login failed: 401 Unauthorized");
    }

    #[tokio::test]
    async fn missing_access_token_short_circuits() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": {}})),
        )
        .await;
        expect_no_meeting_call(&server).await;

        let err = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoAccessToken));
    }

    #[tokio::test]
    async fn numeric_access_token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": 12345}})),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(MEETING_PATH))
            .and(header("authorization", "Bearer 12345"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "lk"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "pw"))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "lk");
    }

    #[tokio::test]
    async fn falsy_access_token_short_circuits() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": 0}})),
        )
        .await;
        expect_no_meeting_call(&server).await;

        let err = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoAccessToken));
    }

    #[tokio::test]
    async fn non_json_login_body_is_invalid_response() {
        let server = MockServer::start().await;
        mount_login(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;
        expect_no_meeting_call(&server).await;

        let err = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn meeting_http_error_is_reported_with_status() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": "X"}})),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(MEETING_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = acquirer(&server)
            .acquire(&Credentials::password("a@b.c", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::MeetingFetchFailed(s) if s == StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[tokio::test]
    async fn meeting_logical_failure_is_data_missing() {
        let bodies = [
            json!({"success": false, "data": {"token": "t"}}),
            json!({"success": true, "data": null}),
            json!({"success": true, "data": ""}),
            json!({"data": {"token": "t"}}),
            json!({"success": true}),
        ];

        for body in bodies {
            let server = MockServer::start().await;
            mount_login(
                &server,
                ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": "X"}})),
            )
            .await;
            Mock::given(method("GET"))
                .and(path(MEETING_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
                .mount(&server)
                .await;

            let err = acquirer(&server)
                .acquire(&Credentials::password("a@b.c", "pw"))
                .await
                .unwrap_err();
            assert!(
                matches!(err, AuthError::MeetingDataMissing),
                "body {body} gave {err:?}"
            );
        }
    }

    #[test]
    fn session_token_debug_is_redacted() {
        let token = SessionToken::new("very-secret-jwt");
        let debug = format!("{token:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret-jwt"));
    }

    #[test]
    fn truthiness_matches_js() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!(1)));
    }
}
