use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, NaiveDate, Utc};
use pantry_alerts::{AlertError, AlertPipeline, RunReport};
use rusqlite::Connection;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    db,
    error::Result,
    schedule::next_daily_run,
    types::{RunOutcome, ScheduleState, SchedulerConfig, JOB_NAME},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Stats {
    next_run: Option<DateTime<Local>>,
    last_run: Option<DateTime<Local>>,
    last_outcome: Option<RunOutcome>,
    run_count: u32,
}

/// State shared between the handle and the trigger loop.
struct Shared {
    pipeline: Arc<AlertPipeline>,
    config: SchedulerConfig,
    conn: Option<Arc<Mutex<Connection>>>,
    stats: Mutex<Stats>,
}

#[derive(Default)]
struct Control {
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Daily trigger for the alert pipeline.
///
/// Owned by the composition root. `start` and `stop` are idempotent; runs
/// go through the pipeline's single-flight gate, so a fire that lands while
/// another run is in flight is skipped.
pub struct AlertScheduler {
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl AlertScheduler {
    /// Scheduler without persisted bookkeeping.
    pub fn new(pipeline: Arc<AlertPipeline>, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                pipeline,
                config,
                conn: None,
                stats: Mutex::new(Stats::default()),
            }),
            control: Mutex::new(Control::default()),
        }
    }

    /// Scheduler that keeps last/next run bookkeeping in `conn`.
    ///
    /// Logs a missed run when the persisted `next_run` is already in the past.
    pub fn with_store(
        pipeline: Arc<AlertPipeline>,
        config: SchedulerConfig,
        conn: Connection,
    ) -> Result<Self> {
        db::init_db(&conn)?;
        let mut stats = Stats::default();
        if let Some(rec) = db::load_job(&conn, JOB_NAME)? {
            if let Some(missed) = rec.next_run.filter(|next| *next < Utc::now()) {
                warn!(job = JOB_NAME, missed_at = %missed, "scheduled alert run was missed while offline");
            }
            stats.last_run = rec.last_run.map(|d| d.with_timezone(&Local));
            stats.last_outcome = rec
                .last_outcome
                .and_then(|raw| serde_json::from_str(&raw).ok());
            stats.run_count = rec.run_count;
        }
        Ok(Self {
            shared: Arc::new(Shared {
                pipeline,
                config,
                conn: Some(Arc::new(Mutex::new(conn))),
                stats: Mutex::new(stats),
            }),
            control: Mutex::new(Control::default()),
        })
    }

    /// Register the daily job and start the trigger loop.
    ///
    /// Returns the next fire time, or `None` when alerts are disabled or the
    /// transport is unavailable. Calling it while running changes nothing.
    pub fn start(&self) -> Option<DateTime<Local>> {
        let cfg = self.shared.config;
        if !cfg.enabled {
            info!(job = JOB_NAME, "automatic alerts disabled, scheduler not started");
            return None;
        }
        if !self.shared.pipeline.transport_available() {
            warn!(job = JOB_NAME, "mail transport unavailable, scheduler not started");
            return None;
        }

        let mut control = lock(&self.control);
        if control.shutdown_tx.is_some() {
            debug!(job = JOB_NAME, "scheduler already running");
            return lock(&self.shared.stats).next_run;
        }

        let Some(next) = next_daily_run(cfg.schedule, &Local::now()) else {
            error!(job = JOB_NAME, "could not compute next fire time");
            return None;
        };
        lock(&self.shared.stats).next_run = Some(next);
        self.shared.persist_registration(Some(next));

        let (tx, rx) = watch::channel(false);
        control.task = Some(tokio::spawn(run_loop(Arc::clone(&self.shared), rx)));
        control.shutdown_tx = Some(tx);

        info!(
            job = JOB_NAME,
            hour = cfg.schedule.hour,
            minute = cfg.schedule.minute,
            next_run = %next,
            "alert scheduler started"
        );
        Some(next)
    }

    /// Cancel the trigger. An in-flight run is left to finish.
    pub fn stop(&self) {
        let mut control = lock(&self.control);
        let Some(tx) = control.shutdown_tx.take() else {
            debug!(job = JOB_NAME, "scheduler not running");
            return;
        };
        let _ = tx.send(true);
        control.task = None;
        lock(&self.shared.stats).next_run = None;
        self.shared.persist_registration(None);
        info!(job = JOB_NAME, "alert scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        lock(&self.control).shutdown_tx.is_some()
    }

    pub fn status(&self) -> ScheduleState {
        let running = self.is_running();
        let stats = lock(&self.shared.stats);
        ScheduleState {
            running,
            enabled: self.shared.config.enabled,
            job_registered: running && stats.next_run.is_some(),
            job_name: JOB_NAME,
            schedule_hour: self.shared.config.schedule.hour,
            schedule_minute: self.shared.config.schedule.minute,
            next_run: stats.next_run,
            last_run: stats.last_run,
            last_outcome: stats.last_outcome.clone(),
            run_count: stats.run_count,
            in_flight: self.shared.pipeline.is_busy(),
        }
    }

    /// Run the pipeline once for today, now. Fails with `Busy` if a run is
    /// already in flight.
    pub async fn trigger_now(&self) -> pantry_alerts::Result<RunReport> {
        let today = Local::now().date_naive();
        info!(job = JOB_NAME, "manual trigger");
        Arc::clone(&self.shared).execute(today).await
    }
}

impl Shared {
    fn persist_registration(&self, next: Option<DateTime<Local>>) {
        let Some(conn) = &self.conn else { return };
        let sched = self.config.schedule;
        if let Err(e) = db::register_job(
            &lock(&**conn),
            JOB_NAME,
            sched.hour,
            sched.minute,
            next.map(|d| d.with_timezone(&Utc)),
        ) {
            error!(job = JOB_NAME, "failed to persist job registration: {e}");
        }
    }

    /// Bookkeeping write on the blocking pool.
    async fn persist<F>(&self, what: &'static str, write: F)
    where
        F: FnOnce(&Connection) -> Result<()> + Send + 'static,
    {
        let Some(conn) = self.conn.clone() else { return };
        match tokio::task::spawn_blocking(move || write(&lock(&*conn))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(job = JOB_NAME, "failed to persist {what}: {e}"),
            Err(e) => error!(job = JOB_NAME, "{what} write task failed: {e}"),
        }
    }

    async fn record(&self, started: DateTime<Local>, outcome: RunOutcome) {
        let json = serde_json::to_string(&outcome).unwrap_or_default();
        let sched = self.config.schedule;
        let counted = outcome.counts_as_run();
        let ran = started.with_timezone(&Utc);
        self.persist("run outcome", move |conn| {
            db::record_run(conn, JOB_NAME, sched.hour, sched.minute, ran, &json, counted)
        })
        .await;

        let mut stats = lock(&self.stats);
        if counted {
            stats.run_count += 1;
        }
        stats.last_run = Some(started);
        stats.last_outcome = Some(outcome);
    }

    /// One pipeline run on its own task, so a panic is contained and logged.
    async fn execute(self: Arc<Self>, today: NaiveDate) -> pantry_alerts::Result<RunReport> {
        let started = Local::now();
        let pipeline = Arc::clone(&self.pipeline);
        let result = match tokio::spawn(async move { pipeline.run_scheduled(today).await }).await {
            Ok(r) => r,
            Err(e) => Err(AlertError::Internal(format!("alert run panicked: {e}"))),
        };

        let outcome = match &result {
            Ok(report) => RunOutcome::from_report(report),
            Err(AlertError::Busy) => RunOutcome::Skipped,
            Err(e) => RunOutcome::Failed {
                error: e.to_string(),
            },
        };
        match &outcome {
            RunOutcome::Sent { run_id, items } => {
                info!(job = JOB_NAME, %run_id, items, "alert run succeeded")
            }
            RunOutcome::SendFailed { run_id, error } => {
                warn!(job = JOB_NAME, %run_id, %error, "alert run finished, delivery failed")
            }
            RunOutcome::Skipped => info!(job = JOB_NAME, "alert run skipped, another run in flight"),
            RunOutcome::Failed { error } => {
                error!(job = JOB_NAME, %error, "alert run failed, schedule kept")
            }
        }
        self.record(started, outcome).await;
        result
    }

    /// Fire the job if its time has come and advance `next_run`.
    fn tick(self: &Arc<Self>, now: DateTime<Local>) {
        let following = {
            let mut stats = lock(&self.stats);
            match stats.next_run {
                Some(next) if now >= next => {
                    stats.next_run = next_daily_run(self.config.schedule, &now);
                    stats.next_run
                }
                _ => return,
            }
        };
        match following {
            Some(next) => info!(job = JOB_NAME, next_run = %next, "alert job fired"),
            None => error!(job = JOB_NAME, "alert job fired, no further fire time"),
        }

        let shared = Arc::clone(self);
        let today = now.date_naive();
        let sched = self.config.schedule;
        let next_utc = following.map(|d| d.with_timezone(&Utc));
        tokio::spawn(async move {
            shared
                .persist("job registration", move |conn| {
                    db::register_job(conn, JOB_NAME, sched.hour, sched.minute, next_utc)
                })
                .await;
            let _ = shared.execute(today).await;
        });
    }
}

/// Polls every second until `shutdown` broadcasts `true`.
async fn run_loop(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    debug!(job = JOB_NAME, "trigger loop started");
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = interval.tick() => shared.tick(Local::now()),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(job = JOB_NAME, "trigger loop exiting");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailySchedule;
    use async_trait::async_trait;
    use pantry_alerts::{
        AlertSettings, MailTransport, NotificationSender, NullTransport, SentEmail, TransportError,
    };
    use pantry_core::{Food, ItemStore, PantryError};
    use std::time::Duration;
    use tokio::sync::Notify;

    enum StoreMode {
        Empty,
        OneItem,
        Broken,
    }

    struct FakeStore(StoreMode);

    impl ItemStore for FakeStore {
        fn query_items_in_date_range(
            &self,
            low: NaiveDate,
            _high: NaiveDate,
        ) -> pantry_core::Result<Vec<Food>> {
            match self.0 {
                StoreMode::Empty => Ok(vec![]),
                StoreMode::OneItem => Ok(vec![Food {
                    id: 1,
                    name: "milk".to_string(),
                    category_id: 1,
                    // past_cutoff is always inside the window
                    admission_date: low,
                    category: None,
                }]),
                StoreMode::Broken => Err(PantryError::Database("database is locked".into())),
            }
        }
    }

    enum Behaviour {
        Ok,
        AuthFailure,
        Panic,
        Park(Arc<Notify>, Arc<Notify>),
    }

    struct FakeTransport(Behaviour);

    #[async_trait]
    impl MailTransport for FakeTransport {
        fn name(&self) -> &str {
            "fake"
        }

        async fn send_html_email(
            &self,
            _from: &str,
            _to: &[String],
            _subject: &str,
            _html: &str,
        ) -> std::result::Result<SentEmail, TransportError> {
            match &self.0 {
                Behaviour::Ok => {}
                Behaviour::AuthFailure => {
                    return Err(TransportError::Auth("API key is invalid".into()))
                }
                Behaviour::Panic => panic!("transport exploded"),
                Behaviour::Park(started, release) => {
                    started.notify_one();
                    release.notified().await;
                }
            }
            Ok(SentEmail { id: "msg-1".into() })
        }
    }

    fn scheduler_with(
        store: StoreMode,
        transport: Arc<dyn MailTransport>,
        enabled: bool,
    ) -> AlertScheduler {
        let sender = NotificationSender::new(transport, "noreply@example.com", "Pantry").unwrap();
        let settings = AlertSettings {
            days_ahead: 3,
            shelf_life_days: 0,
            admin_email: "admin@example.com".into(),
            from_email: "noreply@example.com".into(),
            app_name: "Pantry".into(),
        };
        let pipeline = Arc::new(AlertPipeline::new(
            Arc::new(FakeStore(store)),
            sender,
            settings,
        ));
        AlertScheduler::new(
            pipeline,
            SchedulerConfig {
                enabled,
                schedule: DailySchedule::new(9, 0).unwrap(),
            },
        )
    }

    fn scheduler(store: StoreMode, behaviour: Behaviour) -> AlertScheduler {
        scheduler_with(store, Arc::new(FakeTransport(behaviour)), true)
    }

    #[tokio::test]
    async fn start_twice_is_a_noop() {
        let s = scheduler(StoreMode::Empty, Behaviour::Ok);
        let first = s.start().unwrap();
        let second = s.start().unwrap();
        assert_eq!(first, second);
        let st = s.status();
        assert!(st.running);
        assert!(st.job_registered);
        assert_eq!(st.next_run, Some(first));
        assert_eq!(st.job_name, "daily_food_alert");
        s.stop();
    }

    #[tokio::test]
    async fn start_refuses_without_transport() {
        let s = scheduler_with(StoreMode::Empty, Arc::new(NullTransport), true);
        assert!(s.start().is_none());
        let st = s.status();
        assert!(!st.running);
        assert!(!st.job_registered);
        assert!(st.next_run.is_none());
    }

    #[tokio::test]
    async fn start_refuses_when_disabled() {
        let s = scheduler_with(StoreMode::Empty, Arc::new(FakeTransport(Behaviour::Ok)), false);
        assert!(s.start().is_none());
        assert!(!s.status().enabled);
        assert!(!s.is_running());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let s = scheduler(StoreMode::Empty, Behaviour::Ok);
        s.stop();
        s.start();
        s.stop();
        s.stop();
        let st = s.status();
        assert!(!st.running);
        assert!(st.next_run.is_none());
        // restart after stop works
        assert!(s.start().is_some());
        s.stop();
    }

    #[tokio::test]
    async fn trigger_now_records_outcome() {
        let s = scheduler(StoreMode::OneItem, Behaviour::Ok);
        let report = s.trigger_now().await.unwrap();
        assert!(report.send.success);
        assert_eq!(report.items_found, 1);
        let st = s.status();
        assert_eq!(st.run_count, 1);
        assert!(st.last_run.is_some());
        assert!(matches!(st.last_outcome, Some(RunOutcome::Sent { items: 1, .. })));
    }

    #[tokio::test]
    async fn auth_failure_keeps_schedule_registered() {
        let s = scheduler(StoreMode::OneItem, Behaviour::AuthFailure);
        let next = s.start().unwrap();
        let report = s.trigger_now().await.unwrap();
        assert!(!report.send.success);
        assert!(report.send.error.unwrap().contains("auth"));
        let st = s.status();
        assert!(st.running);
        assert!(st.job_registered);
        assert_eq!(st.next_run, Some(next));
        assert!(matches!(st.last_outcome, Some(RunOutcome::SendFailed { .. })));
        s.stop();
    }

    #[tokio::test]
    async fn storage_failure_is_logged_and_schedule_kept() {
        let s = scheduler(StoreMode::Broken, Behaviour::Ok);
        s.start().unwrap();
        let err = s.trigger_now().await.unwrap_err();
        assert!(matches!(err, AlertError::Storage(_)));
        let st = s.status();
        assert!(st.job_registered);
        assert!(matches!(st.last_outcome, Some(RunOutcome::Failed { .. })));
        s.stop();
    }

    #[tokio::test]
    async fn panicking_run_is_contained() {
        let s = scheduler(StoreMode::OneItem, Behaviour::Panic);
        s.start().unwrap();
        let err = s.trigger_now().await.unwrap_err();
        assert!(matches!(err, AlertError::Internal(_)));
        assert!(s.status().job_registered);
        assert!(!s.status().in_flight);
        s.stop();
    }

    #[tokio::test]
    async fn trigger_while_in_flight_is_busy() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let s = Arc::new(scheduler(
            StoreMode::OneItem,
            Behaviour::Park(started.clone(), release.clone()),
        ));

        let first = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.trigger_now().await })
        };
        started.notified().await;
        assert!(s.status().in_flight);

        let err = s.trigger_now().await.unwrap_err();
        assert!(matches!(err, AlertError::Busy));
        assert_eq!(s.status().last_outcome, Some(RunOutcome::Skipped));
        assert_eq!(s.status().run_count, 0);

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(s.status().run_count, 1);
    }

    #[tokio::test]
    async fn due_tick_fires_and_advances() {
        let s = scheduler(StoreMode::Empty, Behaviour::Ok);
        let next = s.start().unwrap();

        s.shared.tick(next + chrono::Duration::seconds(1));
        let advanced = s.status().next_run.unwrap();
        assert!(advanced > next);

        for _ in 0..200 {
            if s.status().run_count == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(s.status().run_count, 1);
        assert!(s.status().job_registered);
        s.stop();
    }

    #[tokio::test]
    async fn tick_before_due_does_nothing() {
        let s = scheduler(StoreMode::Empty, Behaviour::Ok);
        let next = s.start().unwrap();
        s.shared.tick(next - chrono::Duration::seconds(1));
        assert_eq!(s.status().next_run, Some(next));
        s.stop();
    }

    #[tokio::test]
    async fn store_keeps_bookkeeping_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let config = SchedulerConfig {
            enabled: true,
            schedule: DailySchedule::new(9, 0).unwrap(),
        };
        let pipeline = || {
            let sender = NotificationSender::new(
                Arc::new(FakeTransport(Behaviour::Ok)),
                "noreply@example.com",
                "Pantry",
            )
            .unwrap();
            Arc::new(AlertPipeline::new(
                Arc::new(FakeStore(StoreMode::Empty)),
                sender,
                AlertSettings {
                    days_ahead: 3,
                    shelf_life_days: 0,
                    admin_email: "admin@example.com".into(),
                    from_email: "noreply@example.com".into(),
                    app_name: "Pantry".into(),
                },
            ))
        };

        {
            let s = AlertScheduler::with_store(pipeline(), config, Connection::open(&path).unwrap())
                .unwrap();
            s.start().unwrap();
            s.trigger_now().await.unwrap();
        }

        let s = AlertScheduler::with_store(pipeline(), config, Connection::open(&path).unwrap())
            .unwrap();
        let st = s.status();
        assert_eq!(st.run_count, 1);
        assert!(st.last_run.is_some());
        assert!(matches!(st.last_outcome, Some(RunOutcome::Sent { .. })));
        assert!(!st.running);
    }

    #[tokio::test]
    async fn trigger_without_start_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let config = SchedulerConfig {
            enabled: false,
            schedule: DailySchedule::new(9, 0).unwrap(),
        };
        let pipeline = || {
            let sender = NotificationSender::new(
                Arc::new(FakeTransport(Behaviour::Ok)),
                "noreply@example.com",
                "Pantry",
            )
            .unwrap();
            Arc::new(AlertPipeline::new(
                Arc::new(FakeStore(StoreMode::OneItem)),
                sender,
                AlertSettings {
                    days_ahead: 3,
                    shelf_life_days: 0,
                    admin_email: "admin@example.com".into(),
                    from_email: "noreply@example.com".into(),
                    app_name: "Pantry".into(),
                },
            ))
        };

        {
            let s = AlertScheduler::with_store(pipeline(), config, Connection::open(&path).unwrap())
                .unwrap();
            assert!(s.trigger_now().await.unwrap().send.success);
            assert_eq!(s.status().run_count, 1);
        }

        let rec = db::load_job(&Connection::open(&path).unwrap(), JOB_NAME)
            .unwrap()
            .unwrap();
        assert_eq!(rec.run_count, 1);
        assert!(rec.last_run.is_some());
        assert!(rec.next_run.is_none());

        let s = AlertScheduler::with_store(pipeline(), config, Connection::open(&path).unwrap())
            .unwrap();
        assert_eq!(s.status().run_count, 1);
        assert!(matches!(s.status().last_outcome, Some(RunOutcome::Sent { items: 1, .. })));
    }
}
