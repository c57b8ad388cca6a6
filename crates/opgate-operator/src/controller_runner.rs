//! Controller runner - builds the controller futures
//!
//! Returns boxed futures so the caller decides how to drive them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::controller::Config as ControllerConfig;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use opgate_admission::{error_policy, reconcile_admission_check, reconcile_workload, Context};
use opgate_common::crd::{AdmissionCheck, Workload};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the AdmissionCheck and Workload controller futures
pub fn build_admission_controllers(
    client: Client,
    ctx: Arc<Context>,
    concurrency: u16,
) -> Vec<Pin<Box<dyn Future<Output = ()> + Send>>> {
    let checks: Api<AdmissionCheck> = Api::all(client.clone());
    let workloads: Api<Workload> = Api::all(client);

    let check_ctrl = Controller::new(checks, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
        .with_config(ControllerConfig::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile_admission_check, error_policy, ctx.clone())
        .for_each(log_reconcile_result("AdmissionCheck"));

    let workload_ctrl =
        Controller::new(workloads, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
            .with_config(ControllerConfig::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(reconcile_workload, error_policy, ctx)
            .for_each(log_reconcile_result("Workload"));

    vec![Box::pin(check_ctrl), Box::pin(workload_ctrl)]
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
