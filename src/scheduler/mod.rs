//! Periodic, non-overlapping sync passes.
//!
//! The scheduler owns the only state that survives between passes: the source
//! snapshot from the last pass, which feeds new-file notices. A pass holds the
//! pass gate for its whole duration; a tick that finds the gate taken is
//! dropped instead of queued.

use crate::compare::ContentComparator;
use crate::config::MirrorConfig;
use crate::events::{EventSink, SyncEvent};
use crate::notify::notify_new_files;
use crate::reconciliation::{build_reconciliation_plan, ReconcileExecutor};
use crate::snapshot::{self, Snapshot, SnapshotError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PassError {
    #[error("Source folder unavailable: {0}")]
    Source(#[source] SnapshotError),

    #[error("Replica folder unavailable: {0}")]
    Replica(#[source] SnapshotError),
}

/// Scheduler state as seen from the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Shutdown requests sent to [`SyncScheduler::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    None,
    Shutdown,
}

/// Summary of one completed pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// 1-based pass number within this process
    pub pass: u64,
    pub copied: usize,
    pub deleted: usize,
    pub failed: usize,
    pub up_to_date: usize,
    pub new_files: usize,
    /// Paths in either tree the scan could not read
    pub unreadable: usize,
    pub duration: Duration,
}

impl PassReport {
    pub fn changed_anything(&self) -> bool {
        self.copied > 0 || self.deleted > 0
    }
}

#[derive(Debug, Default)]
struct PassContext {
    previous_source: Option<Snapshot>,
    passes: u64,
}

/// Exclusive right to run a pass; the scheduler is `Running` while one exists
pub struct PassGuard(OwnedMutexGuard<PassContext>);

/// Drives sync passes on a fixed period
#[derive(Clone)]
pub struct SyncScheduler {
    source: PathBuf,
    replica: PathBuf,
    interval: Duration,
    comparator: ContentComparator,
    executor: ReconcileExecutor,
    sink: Arc<dyn EventSink>,
    context: Arc<Mutex<PassContext>>,
    dropped_ticks: Arc<AtomicU64>,
}

impl SyncScheduler {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval: Duration,
        comparator: ContentComparator,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let source = source.into();
        let replica = replica.into();
        Self {
            executor: ReconcileExecutor::new(&source, &replica),
            source,
            replica,
            interval,
            comparator,
            sink,
            context: Arc::new(Mutex::new(PassContext::default())),
            dropped_ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_config(config: &MirrorConfig, sink: Arc<dyn EventSink>) -> Self {
        Self::new(
            &config.source,
            &config.replica,
            config.interval(),
            ContentComparator::new(config.chunk_size),
            sink,
        )
    }

    pub fn state(&self) -> SchedulerState {
        match self.context.try_lock() {
            Ok(_) => SchedulerState::Idle,
            Err(_) => SchedulerState::Running,
        }
    }

    /// Ticks that arrived while a pass was still running
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks.load(Ordering::Relaxed)
    }

    /// Take the pass gate if no pass is running
    pub fn try_begin_pass(&self) -> Option<PassGuard> {
        self.context.clone().try_lock_owned().ok().map(PassGuard)
    }

    /// Handle one timer tick.
    ///
    /// Starts a pass on its own task when idle. When a pass is already
    /// running the tick is dropped and `None` is returned.
    pub fn tick(&self) -> Option<JoinHandle<Result<PassReport, PassError>>> {
        let Some(guard) = self.try_begin_pass() else {
            let dropped = self.dropped_ticks.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(dropped, "Previous pass still running, skipping tick");
            return None;
        };

        let scheduler = self.clone();
        Some(tokio::spawn(async move { scheduler.run_with(guard).await }))
    }

    /// Run one pass now, waiting for any running pass to finish first
    pub async fn run_pass(&self) -> Result<PassReport, PassError> {
        let guard = PassGuard(self.context.clone().lock_owned().await);
        self.run_with(guard).await
    }

    /// Run one pass using an already acquired gate.
    ///
    /// Failures are recorded on the sink before being returned; they never
    /// affect later passes.
    pub async fn run_with(&self, mut guard: PassGuard) -> Result<PassReport, PassError> {
        let context = &mut guard.0;
        context.passes += 1;
        let pass = context.passes;
        let started = Instant::now();

        match self.reconcile(context).await {
            Ok(mut report) => {
                report.pass = pass;
                report.duration = started.elapsed();
                let elapsed_ms = report.duration.as_millis() as u64;
                if report.changed_anything() || report.failed > 0 {
                    info!(
                        pass,
                        copied = report.copied,
                        deleted = report.deleted,
                        failed = report.failed,
                        new_files = report.new_files,
                        elapsed_ms,
                        "Pass finished"
                    );
                } else {
                    debug!(pass, up_to_date = report.up_to_date, elapsed_ms, "Replica already in sync");
                }
                Ok(report)
            }
            Err(e) => {
                match &e {
                    PassError::Source(SnapshotError::RootNotFound(root)) => {
                        self.sink.record(&SyncEvent::SourceMissing(root.clone()));
                    }
                    other => self.sink.record(&SyncEvent::Error(other.to_string())),
                }
                warn!(pass, error = %e, "Pass skipped");
                Err(e)
            }
        }
    }

    async fn reconcile(&self, context: &mut PassContext) -> Result<PassReport, PassError> {
        let sink: &dyn EventSink = self.sink.as_ref();

        let source = snapshot::capture(&self.source)
            .await
            .map_err(PassError::Source)?;
        let replica = snapshot::capture_or_empty(&self.replica)
            .await
            .map_err(PassError::Replica)?;

        let unreadable = record_unreadable(&source, sink) + record_unreadable(&replica, sink);

        let new_files = notify_new_files(context.previous_source.as_ref(), &source, sink);

        let plan = build_reconciliation_plan(&source, &replica, &self.comparator, sink).await;
        let result = self.executor.execute(&plan, sink).await;
        if !result.is_complete() {
            warn!(failed = result.failed.len(), "Some actions failed, retrying next pass");
        }

        context.previous_source = Some(source);

        Ok(PassReport {
            copied: result.copied.len(),
            deleted: result.deleted.len(),
            failed: result.failed.len(),
            up_to_date: plan.up_to_date.len(),
            new_files: new_files.len(),
            unreadable,
            ..Default::default()
        })
    }

    /// Tick every `interval` until shutdown is requested.
    ///
    /// The first pass starts immediately. On shutdown a pass that is already
    /// running is allowed to finish before this returns. Returns the number
    /// of passes started by this loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<ShutdownSignal>) -> u64 {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut started = 0u64;

        info!(
            source = %self.source.display(),
            replica = %self.replica.display(),
            interval_secs = self.interval.as_secs_f64(),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().is_some() {
                        started += 1;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() == ShutdownSignal::Shutdown {
                        break;
                    }
                }
            }
        }

        if self.state() == SchedulerState::Running {
            info!("Waiting for the running pass to finish");
        }
        // Taking the gate waits out any in-flight pass
        drop(self.context.lock().await);

        info!(passes = started, dropped_ticks = self.dropped_ticks(), "Scheduler stopped");
        started
    }
}

/// Record an error for every path `snapshot` had to skip; returns how many
fn record_unreadable(snapshot: &Snapshot, sink: &dyn EventSink) -> usize {
    for skipped in snapshot.unreadable() {
        sink.record(&SyncEvent::Error(format!(
            "Cannot read {}: {}",
            snapshot.absolute(&skipped.relative_path).display(),
            skipped.error
        )));
    }
    snapshot.unreadable().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use std::path::Path;

    fn scheduler(source: &Path, replica: &Path, sink: Arc<MemorySink>) -> SyncScheduler {
        SyncScheduler::new(
            source,
            replica,
            Duration::from_millis(20),
            ContentComparator::default(),
            sink,
        )
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_tick_is_dropped_while_pass_running() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(src.path(), dst.path(), sink);

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let guard = scheduler.try_begin_pass().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);

        assert!(scheduler.tick().is_none());
        assert!(scheduler.tick().is_none());
        assert_eq!(scheduler.dropped_ticks(), 2);
        assert!(scheduler.try_begin_pass().is_none());

        drop(guard);
        let handle = scheduler.tick().expect("idle scheduler should start a pass");
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.pass, 1);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_missing_source_is_recorded_and_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let replica = dir.path().join("replica");
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(&source, &replica, sink.clone());

        let err = scheduler.run_pass().await.unwrap_err();
        assert!(matches!(err, PassError::Source(SnapshotError::RootNotFound(_))));
        assert_eq!(
            sink.events(),
            vec![SyncEvent::SourceMissing(source.clone())]
        );

        // The next pass works once the source shows up
        write(&source, "a.txt", "a");
        let report = scheduler.run_pass().await.unwrap();
        assert_eq!(report.copied, 1);
        assert_eq!(report.pass, 2);
        assert_eq!(std::fs::read_to_string(replica.join("a.txt")).unwrap(), "a");
    }

    #[tokio::test]
    async fn test_new_file_notices_start_from_second_pass() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "existing.txt", "x");
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(src.path(), dst.path(), sink.clone());

        let first = scheduler.run_pass().await.unwrap();
        assert_eq!(first.new_files, 0);
        assert_eq!(sink.messages(), vec!["Copied: existing.txt"]);

        sink.clear();
        write(src.path(), "added.txt", "y");
        let second = scheduler.run_pass().await.unwrap();
        assert_eq!(second.new_files, 1);
        assert_eq!(
            sink.messages(),
            vec!["New file detected: added.txt", "Copied: added.txt"]
        );
    }

    #[tokio::test]
    async fn test_second_pass_changes_nothing() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "a");
        write(src.path(), "dir/b.txt", "b");
        write(dst.path(), "extra.txt", "extra");
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(src.path(), dst.path(), sink.clone());

        let first = scheduler.run_pass().await.unwrap();
        assert_eq!((first.copied, first.deleted), (2, 1));

        let second = scheduler.run_pass().await.unwrap();
        assert!(!second.changed_anything());
        assert_eq!(second.up_to_date, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "a");
        let sink = Arc::new(MemorySink::new());
        let scheduler = scheduler(src.path(), dst.path(), sink);

        let (tx, rx) = watch::channel(ShutdownSignal::None);
        let runner = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(ShutdownSignal::Shutdown).unwrap();
        let passes = runner.await.unwrap();

        assert!(passes >= 1);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(dst.path().join("a.txt").exists());
    }

    #[test]
    fn test_unreadable_paths_become_error_events() {
        let mut snapshot = Snapshot::empty("/data/source");
        snapshot.mark_unreadable(PathBuf::from("locked"), "Permission denied".to_string());
        let sink = MemorySink::new();

        assert_eq!(record_unreadable(&snapshot, &sink), 1);
        assert_eq!(
            sink.messages(),
            vec!["Error: Cannot read /data/source/locked: Permission denied"]
        );
    }
}
