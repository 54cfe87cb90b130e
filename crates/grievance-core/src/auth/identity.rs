//! Client for a GoTrue-compatible password identity service.

use std::time::Duration;

use serde::Deserialize;

use super::session::AuthUser;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity service is not configured")]
    NotConfigured,

    /// Message reported by the service, passed through verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("identity service unreachable: {0}")]
    Transport(String),

    #[error("identity service returned a malformed response: {0}")]
    Malformed(String),
}

pub trait IdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError>;
    fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Pull the human message out of an error body, whichever key carries it.
#[must_use]
pub fn error_message(status: u16, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"))
}

/// Decode a successful token grant. `fallback_email` fills in a missing
/// `user.email`.
pub fn decode_token_response(body: &str, fallback_email: &str) -> Result<AuthUser, IdentityError> {
    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|err| IdentityError::Malformed(err.to_string()))?;
    Ok(AuthUser {
        id: parsed.user.id,
        email: parsed
            .user
            .email
            .unwrap_or_else(|| fallback_email.to_string()),
        access_token: parsed.access_token,
    })
}

pub struct GoTrueClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl GoTrueClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("grievance/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent,
        }
    }

    fn ensure_configured(&self) -> Result<(), IdentityError> {
        if self.base_url.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(IdentityError::NotConfigured);
        }
        Ok(())
    }

    fn read_failure(err: ureq::Error) -> IdentityError {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                IdentityError::Rejected(error_message(code, &body))
            }
            ureq::Error::Transport(transport) => IdentityError::Transport(transport.to_string()),
        }
    }
}

impl IdentityProvider for GoTrueClient {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError> {
        self.ensure_configured()?;
        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .agent
            .post(&url)
            .query("grant_type", "password")
            .set("apikey", &self.api_key)
            .send_json(serde_json::json!({ "email": email, "password": password }))
            .map_err(Self::read_failure)?;
        let body = response
            .into_string()
            .map_err(|err| IdentityError::Transport(err.to_string()))?;
        decode_token_response(&body, email)
    }

    fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.ensure_configured()?;
        let url = format!("{}/auth/v1/logout", self.base_url);
        self.agent
            .post(&url)
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {access_token}"))
            .call()
            .map_err(Self::read_failure)?;
        Ok(())
    }
}
