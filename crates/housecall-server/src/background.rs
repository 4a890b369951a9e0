//! Background tasks for the Housecall server.
//!
//! Currently one task: periodically retrying durable saves that failed,
//! so degraded persistence heals itself once the disk or database
//! recovers.

use housecall_store::CallRecordStore;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Starts the persistence reconciliation task.
///
/// Runs indefinitely. Each pass re-saves every record whose last durable
/// write failed; successes clear the flag, failures stay flagged for the
/// next pass.
pub async fn start_reconcile_task(store: Arc<CallRecordStore>, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::warn!("reconcile task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_secs);
    tracing::info!(interval_secs, "starting persistence reconcile task");

    loop {
        sleep(interval).await;

        let flagged = store.unsaved_count();
        if flagged == 0 {
            continue;
        }

        let store = Arc::clone(&store);
        // reconcile() hits the database; keep it off the async runtime.
        let res = tokio::task::spawn_blocking(move || store.reconcile()).await;

        match res {
            Ok(saved) => {
                if saved < flagged {
                    tracing::warn!(
                        flagged,
                        saved,
                        "some call records still lack a durable copy"
                    );
                }
            }
            Err(e) => {
                tracing::error!("reconcile task join error: {}", e);
            }
        }
    }
}
