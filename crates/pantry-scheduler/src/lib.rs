//! `pantry-scheduler`: daily trigger for the expiry alert pipeline.
//!
//! # Overview
//!
//! One named job, `daily_food_alert`, fires at `HH:MM` local time every day.
//! The [`engine::AlertScheduler`] polls once a second and, when the job is
//! due, runs the alert pipeline on its own task. Only last/next run
//! bookkeeping is persisted (`alert_jobs` table); a `next_run` found in the
//! past at startup is logged as missed.

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use engine::AlertScheduler;
pub use error::{Result, SchedulerError};
pub use types::{DailySchedule, RunOutcome, ScheduleState, SchedulerConfig, JOB_NAME};
