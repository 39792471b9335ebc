//! One-way directory mirroring.
//!
//! A [`SyncScheduler`] periodically snapshots a source and a replica folder,
//! plans the copies and deletes that make the replica match the source, and
//! applies them. Everything notable is reported to an [`EventSink`].

pub mod compare;
pub mod config;
pub mod events;
pub mod notify;
pub mod reconciliation;
pub mod scheduler;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types
pub use compare::{CompareError, ContentComparator};
pub use config::{prepare_folders, Cli, ConfigError, ConfigLayer, MirrorConfig};
pub use events::{EventLog, EventSink, MemorySink, SyncEvent};
pub use notify::notify_new_files;
pub use reconciliation::{
    build_reconciliation_plan, ExecuteError, FailedAction, ReconcileExecutor, ReconciliationPlan,
    ReconciliationResult, SyncAction,
};
pub use scheduler::{PassError, PassReport, SchedulerState, ShutdownSignal, SyncScheduler};
pub use snapshot::{capture, FileEntry, Snapshot, SnapshotError, UnreadablePath};
