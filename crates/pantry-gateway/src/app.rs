use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use pantry_alerts::{
    AlertPipeline, AlertSettings, MailTransport, NotificationSender, NullTransport,
    ResendTransport,
};
use pantry_core::config::PantryConfig;
use pantry_inventory::{InventoryDb, InventoryManager};
use pantry_scheduler::{AlertScheduler, SchedulerConfig};
use tracing::{info, warn};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: PantryConfig,
    pub inventory: InventoryManager,
    pub pipeline: Arc<AlertPipeline>,
    pub scheduler: AlertScheduler,
}

impl AppState {
    /// Open storage and wire the alert subsystem.
    ///
    /// Each subsystem gets its own SQLite connection; alert runs open a
    /// fresh one per query.
    pub fn from_config(config: PantryConfig, transport: Arc<dyn MailTransport>) -> anyhow::Result<Self> {
        let db_path = config.database.path.clone();
        ensure_parent_dir(&db_path);
        info!(path = %db_path, "opening SQLite database");

        let db = pantry_inventory::db::open(&db_path)?;
        db.execute_batch("PRAGMA journal_mode=WAL;")?;
        pantry_inventory::db::init_db(&db)?;
        pantry_scheduler::db::init_db(&db)?;
        info!("database migrations complete");

        let inventory = InventoryManager::new(db);

        let sender = NotificationSender::new(
            transport,
            config.alerts.from_email.clone(),
            config.alerts.app_name.clone(),
        )?;
        let pipeline = Arc::new(AlertPipeline::new(
            Arc::new(InventoryDb::new(db_path.clone())),
            sender,
            AlertSettings::from_config(&config.alerts),
        ));
        let scheduler = AlertScheduler::with_store(
            Arc::clone(&pipeline),
            SchedulerConfig::from_alerts(&config.alerts)?,
            rusqlite::Connection::open(&db_path)?,
        )?;

        Ok(Self {
            config,
            inventory,
            pipeline,
            scheduler,
        })
    }
}

/// Resend when an API key is configured, the null transport otherwise.
pub fn build_transport(config: &PantryConfig) -> Arc<dyn MailTransport> {
    let Some(api_key) = config.resend.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        warn!("no Resend API key configured, email delivery disabled");
        return Arc::new(NullTransport);
    };
    let timeout = Duration::from_secs(config.alerts.transport_timeout_secs);
    match ResendTransport::new(api_key, config.resend.base_url.clone(), timeout) {
        Ok(t) => {
            info!(base_url = %config.resend.base_url, "Resend transport configured");
            Arc::new(t)
        }
        Err(e) => {
            warn!("Resend transport init failed ({e}), email delivery disabled");
            Arc::new(NullTransport)
        }
    }
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    use crate::http::{alerts, categories, foods, health};

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/foods", get(foods::list_foods).post(foods::create_food))
        .route(
            "/foods/{id}",
            get(foods::get_food)
                .put(foods::update_food)
                .delete(foods::delete_food),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/alerts/check", get(alerts::check))
        .route("/alerts/send", post(alerts::send))
        .route("/alerts/trigger", post(alerts::trigger))
        .route("/alerts/status", get(alerts::status))
        .route("/alerts/scheduler/start", post(alerts::start_scheduler))
        .route("/alerts/scheduler/stop", post(alerts::stop_scheduler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
