use std::sync::Arc;

use email_address::EmailAddress;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::format::AlertPayload;
use crate::render::AlertRenderer;
use crate::transport::{MailTransport, TransportError};

/// Why a send did not go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendErrorKind {
    TransportUnavailable,
    TransportFailure,
    TransportTimeout,
}

/// Outcome of one send attempt. Always returned, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<SendErrorKind>,
    pub recipient: String,
    pub items_count: usize,
    pub critical_count: usize,
}

impl SendResult {
    fn base(payload: &AlertPayload, recipient: &str) -> Self {
        Self {
            success: false,
            message_id: None,
            message: None,
            error: None,
            error_kind: None,
            recipient: recipient.to_string(),
            items_count: payload.total,
            critical_count: payload.critical_count(),
        }
    }

    fn failed(mut self, kind: SendErrorKind, error: impl Into<String>) -> Self {
        self.error_kind = Some(kind);
        self.error = Some(error.into());
        self
    }
}

/// Renders an alert and hands it to the configured mail transport.
pub struct NotificationSender {
    transport: Arc<dyn MailTransport>,
    renderer: AlertRenderer,
    from: String,
    app_name: String,
}

impl NotificationSender {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        from: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            renderer: AlertRenderer::new()?,
            from: from.into(),
            app_name: app_name.into(),
        })
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_available()
    }

    /// Deliver `payload` to `recipient`.
    ///
    /// Empty payloads succeed without touching the transport. Every
    /// transport error ends up in the returned [`SendResult`].
    pub async fn send(&self, payload: &AlertPayload, recipient: &str) -> SendResult {
        let mut result = SendResult::base(payload, recipient);

        if payload.is_empty() {
            info!(recipient, "no items close to expiry, nothing to send");
            result.success = true;
            result.message = Some("nothing to send".to_string());
            return result;
        }

        if !self.transport.is_available() {
            warn!(transport = self.transport.name(), "mail transport unavailable");
            return result.failed(SendErrorKind::TransportUnavailable, "transport unavailable");
        }

        if !EmailAddress::is_valid(recipient) {
            warn!(recipient, "malformed recipient address");
            return result.failed(
                SendErrorKind::TransportFailure,
                format!("malformed recipient address: {recipient:?}"),
            );
        }

        let html = match self.renderer.render_html(payload, &self.app_name) {
            Ok(html) => html,
            Err(e) => {
                error!(error = %e, "failed to render alert email");
                return result.failed(SendErrorKind::TransportFailure, e.to_string());
            }
        };
        let subject = format!("{} - {}", payload.subject, self.app_name);
        let to = [recipient.to_string()];

        match self
            .transport
            .send_html_email(&self.from, &to, &subject, &html)
            .await
        {
            Ok(sent) => {
                info!(
                    recipient,
                    message_id = %sent.id,
                    items = payload.total,
                    critical = payload.critical_count(),
                    "alert email sent"
                );
                result.success = true;
                result.message = Some(format!("alert sent to {recipient}"));
                result.message_id = Some(sent.id);
                result
            }
            Err(e) => {
                error!(recipient, transport = self.transport.name(), error = %e, "alert email failed");
                let kind = match e {
                    TransportError::Timeout => SendErrorKind::TransportTimeout,
                    TransportError::Unavailable(_) => SendErrorKind::TransportUnavailable,
                    _ => SendErrorKind::TransportFailure,
                };
                result.failed(kind, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format_alert;
    use crate::transport::{NullTransport, SentEmail};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pantry_core::Food;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport returning a canned outcome and counting calls.
    struct ScriptedTransport {
        calls: AtomicUsize,
        outcome: fn() -> std::result::Result<SentEmail, TransportError>,
    }

    impl ScriptedTransport {
        fn new(outcome: fn() -> std::result::Result<SentEmail, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    #[async_trait]
    impl MailTransport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send_html_email(
            &self,
            _from: &str,
            to: &[String],
            subject: &str,
            html: &str,
        ) -> std::result::Result<SentEmail, TransportError> {
            assert_eq!(to.len(), 1);
            assert!(subject.ends_with(" - Pantry"));
            assert!(html.contains("<html>"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn ok() -> std::result::Result<SentEmail, TransportError> {
        Ok(SentEmail {
            id: "msg-1".to_string(),
        })
    }

    fn auth_failure() -> std::result::Result<SentEmail, TransportError> {
        Err(TransportError::Auth("API key is invalid".to_string()))
    }

    fn timeout() -> std::result::Result<SentEmail, TransportError> {
        Err(TransportError::Timeout)
    }

    fn payload(n: usize) -> AlertPayload {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let foods: Vec<Food> = (0..n)
            .map(|i| Food {
                id: i as i64 + 1,
                name: format!("food-{i}"),
                category_id: 1,
                admission_date: today,
                category: None,
            })
            .collect();
        format_alert(&foods, today)
    }

    fn sender(transport: Arc<dyn MailTransport>) -> NotificationSender {
        NotificationSender::new(transport, "noreply@example.com", "Pantry").unwrap()
    }

    #[tokio::test]
    async fn empty_payload_short_circuits() {
        let t = ScriptedTransport::new(ok);
        let r = sender(t.clone()).send(&payload(0), "admin@example.com").await;
        assert!(r.success);
        assert_eq!(r.message.as_deref(), Some("nothing to send"));
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_payload_succeeds_even_without_transport() {
        let r = sender(Arc::new(NullTransport))
            .send(&payload(0), "admin@example.com")
            .await;
        assert!(r.success);
    }

    #[tokio::test]
    async fn unavailable_transport_fails_without_raising() {
        let r = sender(Arc::new(NullTransport))
            .send(&payload(2), "admin@example.com")
            .await;
        assert!(!r.success);
        assert_eq!(r.error_kind, Some(SendErrorKind::TransportUnavailable));
        assert_eq!(r.error.as_deref(), Some("transport unavailable"));
        assert_eq!(r.items_count, 2);
    }

    #[tokio::test]
    async fn successful_send_reports_counts() {
        let t = ScriptedTransport::new(ok);
        let r = sender(t.clone()).send(&payload(3), "admin@example.com").await;
        assert!(r.success);
        assert_eq!(r.message_id.as_deref(), Some("msg-1"));
        assert_eq!(r.items_count, 3);
        assert_eq!(r.critical_count, 3);
        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn auth_error_is_reported() {
        let r = sender(ScriptedTransport::new(auth_failure))
            .send(&payload(1), "admin@example.com")
            .await;
        assert!(!r.success);
        assert_eq!(r.error_kind, Some(SendErrorKind::TransportFailure));
        assert!(r.error.unwrap().contains("auth"));
    }

    #[tokio::test]
    async fn timeout_is_classified() {
        let r = sender(ScriptedTransport::new(timeout))
            .send(&payload(1), "admin@example.com")
            .await;
        assert_eq!(r.error_kind, Some(SendErrorKind::TransportTimeout));
    }

    #[tokio::test]
    async fn malformed_recipient_never_reaches_transport() {
        let t = ScriptedTransport::new(ok);
        let r = sender(t.clone()).send(&payload(1), "not-an-address").await;
        assert!(!r.success);
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }
}
