use crate::{
    config::{AuthConfig, DatabaseConfig},
    error::{CoreError, Result},
};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Status the time-series endpoint answers with when it accepts a write
pub const ACCEPTED_STATUS: u16 = 204;

/// Maximum number of characters kept from an error response body
const MAX_BODY_CHARS: usize = 200;

/// Delivers one formatted payload to the time-series target.
///
/// Delivery is at-most-once: a failed call is reported and the payload is
/// dropped by the caller.
pub trait Forwarder {
    fn forward(&self, payload: &str) -> Result<()>;
}

/// Blocking HTTP POST with optional basic auth
pub struct HttpForwarder {
    agent: ureq::Agent,
    url: String,
    authorization: Option<String>,
}

impl HttpForwarder {
    pub fn new(database: &DatabaseConfig) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = database.timeout() {
            builder = builder.timeout(timeout);
        }

        Self {
            agent: builder.build(),
            url: database.url.trim().to_string(),
            authorization: database.auth.as_ref().map(basic_auth_header),
        }
    }
}

impl Forwarder for HttpForwarder {
    fn forward(&self, payload: &str) -> Result<()> {
        let mut request = self
            .agent
            .post(&self.url)
            .set("Content-Type", "text/plain; charset=utf-8");
        if let Some(authorization) = &self.authorization {
            request = request.set("Authorization", authorization);
        }

        match request.send_string(payload) {
            Ok(response) if response.status() == ACCEPTED_STATUS => Ok(()),
            // ureq treats every 2xx/3xx as success, only 204 counts here
            Ok(response) => Err(unexpected_status(response.status(), response)),
            Err(ureq::Error::Status(status, response)) => Err(unexpected_status(status, response)),
            Err(ureq::Error::Transport(transport)) => {
                Err(CoreError::transport(transport.to_string()))
            }
        }
    }
}

/// `Authorization` header value for HTTP basic auth
pub fn basic_auth_header(auth: &AuthConfig) -> String {
    let credentials = format!("{}:{}", auth.username, auth.password);
    format!("Basic {}", STANDARD.encode(credentials))
}

fn unexpected_status(status: u16, response: ureq::Response) -> CoreError {
    let body = response.into_string().unwrap_or_default();
    CoreError::UnexpectedStatus {
        status,
        body: truncate(body.trim(), MAX_BODY_CHARS),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
