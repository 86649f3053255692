use email_address::EmailAddress;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PantryError, Result};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_DAYS_AHEAD: u32 = 3;
/// Items admitted up to this many days before today are still reported.
pub const DAYS_LOOKBACK: u32 = 7;
pub const DEFAULT_SCHEDULE_HOUR: u8 = 9;
pub const DEFAULT_SCHEDULE_MINUTE: u8 = 0;
pub const DEFAULT_TRANSPORT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
pub const DEFAULT_FROM_EMAIL: &str = "noreply@example.com";
pub const DEFAULT_APP_NAME: &str = "Food Inventory System";
pub const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";

/// Flat environment keys used by existing deployment scripts.
/// Applied on top of `pantry.toml` and `PANTRY_*` overrides.
pub const ALERT_ENV_KEYS: [&str; 8] = [
    "AUTO_ALERTS_ENABLED",
    "ALERT_DAYS_AHEAD",
    "ALERT_SCHEDULE_HOUR",
    "ALERT_SCHEDULE_MINUTE",
    "ADMIN_EMAIL",
    "FROM_EMAIL",
    "RESEND_API_KEY",
    "APP_NAME",
];

/// Top-level config (pantry.toml + PANTRY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PantryConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub resend: ResendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Expiry alert policy and daily schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Master switch for the daily job. Manual endpoints work regardless.
    /// Override with env var: AUTO_ALERTS_ENABLED=false
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
    /// Local-time hour (0-23) of the daily run.
    #[serde(default = "default_schedule_hour")]
    pub schedule_hour: u8,
    /// Local-time minute (0-59) of the daily run.
    #[serde(default)]
    pub schedule_minute: u8,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Days added to `admission_date` to obtain the expiry date. 0 means the
    /// admission date is the expiry date.
    #[serde(default)]
    pub shelf_life_days: u32,
    #[serde(default = "default_transport_timeout_secs")]
    pub transport_timeout_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days_ahead: DEFAULT_DAYS_AHEAD,
            schedule_hour: DEFAULT_SCHEDULE_HOUR,
            schedule_minute: DEFAULT_SCHEDULE_MINUTE,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            shelf_life_days: 0,
            transport_timeout_secs: DEFAULT_TRANSPORT_TIMEOUT_SECS,
        }
    }
}

/// Resend mail API. No `api_key` selects the unavailable transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_resend_base_url")]
    pub base_url: String,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_RESEND_BASE_URL.to_string(),
        }
    }
}

/// Values read from the flat [`ALERT_ENV_KEYS`].
#[derive(Debug, Default, Deserialize)]
struct AlertEnv {
    auto_alerts_enabled: Option<bool>,
    alert_days_ahead: Option<u32>,
    alert_schedule_hour: Option<u8>,
    alert_schedule_minute: Option<u8>,
    admin_email: Option<String>,
    from_email: Option<String>,
    resend_api_key: Option<String>,
    app_name: Option<String>,
}

impl AlertEnv {
    fn apply(self, config: &mut PantryConfig) {
        let alerts = &mut config.alerts;
        if let Some(v) = self.auto_alerts_enabled {
            alerts.enabled = v;
        }
        if let Some(v) = self.alert_days_ahead {
            alerts.days_ahead = v;
        }
        if let Some(v) = self.alert_schedule_hour {
            alerts.schedule_hour = v;
        }
        if let Some(v) = self.alert_schedule_minute {
            alerts.schedule_minute = v;
        }
        if let Some(v) = self.admin_email {
            alerts.admin_email = v;
        }
        if let Some(v) = self.from_email {
            alerts.from_email = v;
        }
        if let Some(v) = self.app_name {
            alerts.app_name = v;
        }
        if let Some(v) = self.resend_api_key.filter(|k| !k.trim().is_empty()) {
            config.resend.api_key = Some(v);
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_days_ahead() -> u32 {
    DEFAULT_DAYS_AHEAD
}
fn default_schedule_hour() -> u8 {
    DEFAULT_SCHEDULE_HOUR
}
fn default_admin_email() -> String {
    DEFAULT_ADMIN_EMAIL.to_string()
}
fn default_from_email() -> String {
    DEFAULT_FROM_EMAIL.to_string()
}
fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}
fn default_transport_timeout_secs() -> u64 {
    DEFAULT_TRANSPORT_TIMEOUT_SECS
}
fn default_resend_base_url() -> String {
    DEFAULT_RESEND_BASE_URL.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pantry/pantry.db", home)
}

impl PantryConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Layers, later wins:
    ///   1. Explicit path argument, else ~/.pantry/pantry.toml
    ///   2. PANTRY_* (nesting split on `__`, e.g. PANTRY_ALERTS__DAYS_AHEAD)
    ///   3. Flat keys from [`ALERT_ENV_KEYS`]
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let mut config: PantryConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("PANTRY_").split("__"))
            .extract()
            .map_err(|e| PantryError::Config(e.to_string()))?;

        let flat: AlertEnv = Figment::from(Env::raw().only(&ALERT_ENV_KEYS))
            .extract()
            .map_err(|e| PantryError::Config(e.to_string()))?;
        flat.apply(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler or mailer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let alerts = &self.alerts;
        if alerts.schedule_hour > 23 {
            return Err(PantryError::Config(format!(
                "alerts.schedule_hour must be 0-23, got {}",
                alerts.schedule_hour
            )));
        }
        if alerts.schedule_minute > 59 {
            return Err(PantryError::Config(format!(
                "alerts.schedule_minute must be 0-59, got {}",
                alerts.schedule_minute
            )));
        }
        for (key, value) in [
            ("alerts.admin_email", &alerts.admin_email),
            ("alerts.from_email", &alerts.from_email),
        ] {
            if !EmailAddress::is_valid(value) {
                return Err(PantryError::Config(format!(
                    "{key} is not a valid email address: {value}"
                )));
            }
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.pantry/pantry.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn load_in(jail: &Jail) -> std::result::Result<PantryConfig, figment::Error> {
        let path = jail.directory().join("pantry.toml");
        PantryConfig::load(path.to_str()).map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let config = load_in(jail)?;
            assert!(config.alerts.enabled);
            assert_eq!(config.alerts.days_ahead, 3);
            assert_eq!(config.alerts.schedule_hour, 9);
            assert_eq!(config.alerts.schedule_minute, 0);
            assert_eq!(config.alerts.admin_email, "admin@example.com");
            assert_eq!(config.alerts.from_email, "noreply@example.com");
            assert_eq!(config.alerts.transport_timeout_secs, 30);
            assert!(config.resend.api_key.is_none());
            Ok(())
        });
    }

    #[test]
    fn flat_env_keys_override_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "pantry.toml",
                r#"
                [alerts]
                days_ahead = 5
                schedule_hour = 7
                "#,
            )?;
            jail.set_env("ALERT_DAYS_AHEAD", "2");
            jail.set_env("AUTO_ALERTS_ENABLED", "false");
            jail.set_env("RESEND_API_KEY", "re_test");
            let config = load_in(jail)?;
            assert_eq!(config.alerts.days_ahead, 2);
            assert_eq!(config.alerts.schedule_hour, 7);
            assert!(!config.alerts.enabled);
            assert_eq!(config.resend.api_key.as_deref(), Some("re_test"));
            Ok(())
        });
    }

    #[test]
    fn prefixed_env_reaches_nested_keys() {
        Jail::expect_with(|jail| {
            jail.set_env("PANTRY_GATEWAY__PORT", "9100");
            jail.set_env("PANTRY_ALERTS__SHELF_LIFE_DAYS", "7");
            let config = load_in(jail)?;
            assert_eq!(config.gateway.port, 9100);
            assert_eq!(config.alerts.shelf_life_days, 7);
            Ok(())
        });
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("ALERT_SCHEDULE_HOUR", "24");
            assert!(load_in(jail).is_err());
            Ok(())
        });
    }

    #[test]
    fn malformed_admin_email_is_rejected() {
        let mut config = PantryConfig::default();
        config.alerts.admin_email = "not-an-address".to_string();
        assert!(matches!(config.validate(), Err(PantryError::Config(_))));
    }
}
