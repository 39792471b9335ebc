mod execute;
mod plan;

pub use execute::{ExecuteError, FailedAction, ReconcileExecutor, ReconciliationResult};
pub use plan::{build_reconciliation_plan, CopyReason, ReconciliationPlan, SyncAction};
