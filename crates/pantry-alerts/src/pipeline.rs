use std::sync::Arc;

use chrono::NaiveDate;
use email_address::EmailAddress;
use pantry_core::config::AlertsConfig;
use pantry_core::{Food, ItemStore};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{AlertError, Result};
use crate::format::{format_alert_with_shelf_life, AlertPayload};
use crate::sender::{NotificationSender, SendResult};
use crate::window::{find_near_expiry, ExpiryWindow};

/// Alert knobs resolved from configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AlertSettings {
    pub days_ahead: u32,
    pub shelf_life_days: u32,
    pub admin_email: String,
    pub from_email: String,
    pub app_name: String,
}

impl AlertSettings {
    pub fn from_config(cfg: &AlertsConfig) -> Self {
        Self {
            days_ahead: cfg.days_ahead,
            shelf_life_days: cfg.shelf_life_days,
            admin_email: cfg.admin_email.clone(),
            from_email: cfg.from_email.clone(),
            app_name: cfg.app_name.clone(),
        }
    }
}

/// Result of a dry-run check: what would be sent, without sending.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub window: ExpiryWindow,
    pub items: Vec<Food>,
    pub alert: AlertPayload,
}

/// Result of one gated pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub check_date: NaiveDate,
    pub days_ahead: u32,
    pub items_found: usize,
    pub send: SendResult,
}

/// Snapshot of the notification subsystem's configuration.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationStatus {
    pub transport: String,
    pub transport_available: bool,
    pub admin_email: String,
    pub from_email: String,
    pub days_ahead: u32,
    pub shelf_life_days: u32,
    pub app_name: String,
    pub busy: bool,
}

/// Evaluator, formatter and sender chained behind one single-flight gate.
///
/// Manual and scheduled runs share the gate: a run requested while another
/// is in flight fails with [`AlertError::Busy`] instead of queueing.
pub struct AlertPipeline {
    store: Arc<dyn ItemStore>,
    sender: NotificationSender,
    settings: AlertSettings,
    gate: Mutex<()>,
}

impl AlertPipeline {
    pub fn new(store: Arc<dyn ItemStore>, sender: NotificationSender, settings: AlertSettings) -> Self {
        Self {
            store,
            sender,
            settings,
            gate: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn transport_available(&self) -> bool {
        self.sender.is_available()
    }

    /// True while a gated run holds the lock.
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    pub fn notification_status(&self) -> NotificationStatus {
        NotificationStatus {
            transport: self.sender.transport_name().to_string(),
            transport_available: self.sender.is_available(),
            admin_email: self.settings.admin_email.clone(),
            from_email: self.settings.from_email.clone(),
            days_ahead: self.settings.days_ahead,
            shelf_life_days: self.settings.shelf_life_days,
            app_name: self.settings.app_name.clone(),
            busy: self.is_busy(),
        }
    }

    fn window(&self, today: NaiveDate, days_ahead: Option<i64>) -> Result<ExpiryWindow> {
        let days = days_ahead.unwrap_or(self.settings.days_ahead as i64);
        Ok(ExpiryWindow::new(today, days)?.with_shelf_life(self.settings.shelf_life_days))
    }

    /// Run the storage query on the blocking pool.
    async fn evaluate(&self, window: ExpiryWindow) -> Result<Vec<Food>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || find_near_expiry(store.as_ref(), &window))
            .await
            .map_err(|e| AlertError::Internal(format!("storage task failed: {e}")))?
    }

    /// Evaluate and format without sending. Not gated.
    pub async fn check(&self, today: NaiveDate, days_ahead: Option<i64>) -> Result<CheckReport> {
        let window = self.window(today, days_ahead)?;
        let items = self.evaluate(window).await?;
        let alert = format_alert_with_shelf_life(&items, today, window.shelf_life_days);
        Ok(CheckReport {
            window,
            items,
            alert,
        })
    }

    /// Full run to an explicit recipient.
    pub async fn send_manual(
        &self,
        today: NaiveDate,
        recipient: &str,
        days_ahead: Option<i64>,
    ) -> Result<RunReport> {
        let recipient = recipient.trim();
        if !EmailAddress::is_valid(recipient) {
            return Err(AlertError::invalid(
                "recipient",
                format!("not a valid email address: {recipient:?}"),
            ));
        }
        let window = self.window(today, days_ahead)?;
        let _guard = self.gate.try_lock().map_err(|_| AlertError::Busy)?;
        self.run_locked(window, recipient, "manual").await
    }

    /// Full run to the configured admin address.
    pub async fn run_scheduled(&self, today: NaiveDate) -> Result<RunReport> {
        let window = self.window(today, None)?;
        let _guard = self.gate.try_lock().map_err(|_| {
            warn!("alert run skipped, previous run still in flight");
            AlertError::Busy
        })?;
        let recipient = self.settings.admin_email.clone();
        self.run_locked(window, &recipient, "scheduled").await
    }

    async fn run_locked(
        &self,
        window: ExpiryWindow,
        recipient: &str,
        trigger: &'static str,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("alert_run", %run_id, trigger);
        async move {
            info!(today = %window.today, days_ahead = window.days_ahead, "alert run started");
            let items = self.evaluate(window).await?;
            let payload = format_alert_with_shelf_life(&items, window.today, window.shelf_life_days);
            let send = self.sender.send(&payload, recipient).await;
            info!(
                success = send.success,
                count = payload.total,
                critical = payload.critical_count(),
                "alert run finished"
            );
            Ok(RunReport {
                run_id,
                check_date: window.today,
                days_ahead: window.days_ahead,
                items_found: items.len(),
                send,
            })
        }
        .instrument(span)
        .await
    }
}
