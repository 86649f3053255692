use chrono::{DateTime, Local};
use pantry_alerts::RunReport;
use pantry_core::config::AlertsConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SchedulerError};

/// Name of the single recurring job.
pub const JOB_NAME: &str = "daily_food_alert";

/// Fire every day at `hour:minute` local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub hour: u8,
    pub minute: u8,
}

impl DailySchedule {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(SchedulerError::InvalidSchedule(format!(
                "{hour:02}:{minute:02} is not a time of day"
            )));
        }
        Ok(Self { hour, minute })
    }
}

/// Scheduler settings resolved from the alerts config section.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub schedule: DailySchedule,
}

impl SchedulerConfig {
    pub fn from_alerts(cfg: &AlertsConfig) -> Result<Self> {
        Ok(Self {
            enabled: cfg.enabled,
            schedule: DailySchedule::new(cfg.schedule_hour, cfg.schedule_minute)?,
        })
    }
}

/// How the most recent run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Pipeline ran and the sender reported success (including "nothing to send").
    Sent { run_id: Uuid, items: usize },
    /// Pipeline ran but delivery failed.
    SendFailed { run_id: Uuid, error: String },
    /// Another run held the gate.
    Skipped,
    /// Storage failure, internal error or panic.
    Failed { error: String },
}

impl RunOutcome {
    pub fn from_report(report: &RunReport) -> Self {
        if report.send.success {
            RunOutcome::Sent {
                run_id: report.run_id,
                items: report.items_found,
            }
        } else {
            RunOutcome::SendFailed {
                run_id: report.run_id,
                error: report.send.error.clone().unwrap_or_default(),
            }
        }
    }

    /// Skipped fires are not counted as runs.
    pub fn counts_as_run(&self) -> bool {
        !matches!(self, RunOutcome::Skipped)
    }
}

/// Snapshot returned by [`crate::AlertScheduler::status`].
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleState {
    pub running: bool,
    pub enabled: bool,
    pub job_registered: bool,
    pub job_name: &'static str,
    pub schedule_hour: u8,
    pub schedule_minute: u8,
    /// Absent when the job is not registered.
    pub next_run: Option<DateTime<Local>>,
    pub last_run: Option<DateTime<Local>>,
    pub last_outcome: Option<RunOutcome>,
    pub run_count: u32,
    pub in_flight: bool,
}
