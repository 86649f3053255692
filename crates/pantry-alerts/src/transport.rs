use async_trait::async_trait;
use serde::Serialize;

/// Acknowledgement returned by a transport for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentEmail {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("auth failed: {0}")]
    Auth(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connection(e.to_string())
        }
    }
}

/// Outbound email delivery (Resend, or a stand-in when unconfigured).
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Whether the transport has what it needs to send.
    fn is_available(&self) -> bool {
        true
    }

    async fn send_html_email(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        html: &str,
    ) -> Result<SentEmail, TransportError>;
}

/// Placeholder transport when no API key is configured.
pub struct NullTransport;

#[async_trait]
impl MailTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn send_html_email(
        &self,
        _from: &str,
        _to: &[String],
        _subject: &str,
        _html: &str,
    ) -> Result<SentEmail, TransportError> {
        Err(TransportError::Unavailable(
            "no mail transport configured, set RESEND_API_KEY or resend.api_key".into(),
        ))
    }
}
