use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::transport::{MailTransport, SentEmail, TransportError};

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResendErrorBody {
    #[serde(default)]
    message: String,
}

/// Mail transport backed by the Resend HTTP API.
pub struct ResendTransport {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ResendTransport {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connection(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Pull `message` out of a Resend error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ResendErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl MailTransport for ResendTransport {
    fn name(&self) -> &str {
        "resend"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn send_html_email(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        html: &str,
    ) -> Result<SentEmail, TransportError> {
        let body = ResendRequest {
            from,
            to,
            subject,
            html,
        };
        let url = format!("{}/emails", self.base_url);
        debug!(recipients = to.len(), "sending email via Resend");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let parsed: ResendResponse = resp
                    .json()
                    .await
                    .map_err(|e| TransportError::Parse(e.to_string()))?;
                debug!(id = %parsed.id, "email accepted by Resend");
                Ok(SentEmail { id: parsed.id })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let text = resp.text().await.unwrap_or_default();
                error!(status = status.as_u16(), "Resend rejected credentials");
                Err(TransportError::Auth(error_message(&text)))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(retry_after_secs, "Resend rate limit hit");
                Err(TransportError::RateLimited { retry_after_secs })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let text = resp.text().await.unwrap_or_default();
                error!(status = status.as_u16(), "Resend rejected request");
                Err(TransportError::InvalidRequest(error_message(&text)))
            }
            _ => {
                let text = resp.text().await.unwrap_or_default();
                error!(status = status.as_u16(), "unexpected Resend response");
                Err(TransportError::Server {
                    status: status.as_u16(),
                    message: error_message(&text),
                })
            }
        }
    }
}
