//! Spreadsheet-backed HTTP endpoint: `GET ?action=read`, `POST {action:"write"}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Complaint, decode_rows};

const PLACEHOLDER_MARKER: &str = "YOUR_DEPLOYMENT_ID";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote endpoint is not configured")]
    NotConfigured,

    #[error("request to remote endpoint failed: {0}")]
    Transport(String),

    #[error("remote endpoint reported an error: {0}")]
    Rejected(String),

    #[error("remote endpoint returned a malformed response: {0}")]
    Malformed(String),
}

/// The remote mirror of the complaint collection.
///
/// Writes are fire-and-forget: an `Ok` only means the request left this
/// process, never that the sheet accepted it.
pub trait RemoteSheet {
    fn read(&self) -> Result<Vec<Complaint>, RemoteError>;
    fn write(&self, records: &[Complaint], bearer: Option<&str>) -> Result<(), RemoteError>;
}

/// Whether `url` points at a real deployment rather than the sample value.
#[must_use]
pub fn is_configured(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && !url.contains(PLACEHOLDER_MARKER)
}

#[derive(Debug, Deserialize)]
struct ReadEnvelope {
    status: String,
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteEnvelope<'a> {
    action: &'static str,
    data: &'a [Complaint],
}

/// Decode the body of a read response.
pub fn decode_read_response(body: &str) -> Result<Vec<Complaint>, RemoteError> {
    let envelope: ReadEnvelope =
        serde_json::from_str(body).map_err(|err| RemoteError::Malformed(err.to_string()))?;
    if envelope.status != "success" {
        return Err(RemoteError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "failed to fetch data".to_string()),
        ));
    }
    let rows = envelope
        .data
        .ok_or_else(|| RemoteError::Malformed("missing 'data' array".to_string()))?;
    let decoded = decode_rows(rows);
    // Caching a collection with rows missing would lose them on the next save.
    if decoded.dropped > 0 {
        return Err(RemoteError::Malformed(format!(
            "{} row(s) without an id",
            decoded.dropped
        )));
    }
    Ok(decoded.records)
}

/// Encode the body of a write request.
pub fn encode_write_request(records: &[Complaint]) -> Result<String, RemoteError> {
    serde_json::to_string(&WriteEnvelope {
        action: "write",
        data: records,
    })
    .map_err(|err| RemoteError::Malformed(err.to_string()))
}

/// `ureq`-backed client for the sheet's web-app URL.
pub struct HttpSheet {
    url: String,
    agent: ureq::Agent,
}

impl HttpSheet {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("grievance/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl RemoteSheet for HttpSheet {
    fn read(&self) -> Result<Vec<Complaint>, RemoteError> {
        if !is_configured(&self.url) {
            return Err(RemoteError::NotConfigured);
        }
        let response = self
            .agent
            .get(&self.url)
            .query("action", "read")
            .call()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        let body = response
            .into_string()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        decode_read_response(&body)
    }

    fn write(&self, records: &[Complaint], bearer: Option<&str>) -> Result<(), RemoteError> {
        if !is_configured(&self.url) {
            return Err(RemoteError::NotConfigured);
        }
        let body = encode_write_request(records)?;
        let mut request = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json");
        if let Some(token) = bearer {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        match request.send_string(&body) {
            Ok(_) => Ok(()),
            // The sheet's reply is not part of the contract; only a failure to
            // deliver the request counts.
            Err(ureq::Error::Status(code, _)) => {
                tracing::debug!(code, "remote write returned non-success status");
                Ok(())
            }
            Err(err) => Err(RemoteError::Transport(err.to_string())),
        }
    }
}
