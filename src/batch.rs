// ============================================================================
// File: src/batch.rs
// ----------------------------------------------------------------------------
// Parallel command execution across independent hosts.
//
// Each host owns its own session, so hosts can be driven concurrently as
// long as no two operations target the same host. Blocking session work
// runs on tokio's blocking pool.
// ============================================================================

use log::{debug, warn};
use tokio::task::JoinError;

use crate::errors::HostResult;
use crate::host::Host;
use crate::session::CommandResult;

/// Handle to a spawned batch operation
pub type AsyncTask<T> = tokio::task::JoinHandle<T>;

/// Outcome for one host of a batch
pub type HostOutcome<T> = (Host, HostResult<T>);

/// Handle to a batch; resolves to every host's outcome or the first worker failure
pub type BatchTask<T> = AsyncTask<Result<Vec<HostOutcome<T>>, JoinError>>;

/// Run `command` on every host in parallel
///
/// Hosts come back in input order, each paired with its result, so callers
/// keep ownership and can close or release them afterwards. A worker that
/// panics or is cancelled surfaces as the batch's `JoinError`. Must be called
/// from within a tokio runtime.
pub fn execute_all(hosts: Vec<Host>, command: &str) -> BatchTask<CommandResult> {
    let command = command.to_string();
    run_all(hosts, move |host| host.execute(&command, None))
}

/// Close every host in parallel
pub fn close_all(hosts: Vec<Host>) -> BatchTask<()> {
    run_all(hosts, Host::close)
}

/// Apply a blocking operation to every host in parallel
pub fn run_all<T, F>(hosts: Vec<Host>, op: F) -> BatchTask<T>
where
    T: Send + 'static,
    F: Fn(&mut Host) -> HostResult<T> + Send + Sync + Clone + 'static,
{
    tokio::spawn(async move {
        debug!("Dispatching batch operation to {} hosts", hosts.len());

        let handles: Vec<_> = hosts
            .into_iter()
            .map(|mut host| {
                let op = op.clone();
                tokio::task::spawn_blocking(move || {
                    let result = op(&mut host);
                    (host, result)
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Batch worker failed: {e}");
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    })
}
