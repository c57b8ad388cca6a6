//! Command-line and environment configuration

use std::time::Duration;

use clap::Parser;

use opgate_admission::{GateSettings, MissingGatePolicy};
use opgate_common::DEFAULT_CONTROLLER_NAME;

/// opgate - holds Kueue workloads until the Fluid data operation they wait on completes
#[derive(Parser, Debug)]
#[command(name = "opgate", version, about, long_about = None)]
pub struct Cli {
    /// Controller identity; AdmissionChecks naming it in spec.controllerName are served
    #[arg(long, env = "OPGATE_CONTROLLER_NAME", default_value = DEFAULT_CONTROLLER_NAME)]
    pub controller_name: String,

    /// Seconds between polls of a data operation that is still running
    #[arg(long, env = "OPGATE_POLL_INTERVAL_SECS", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Seconds before a failed reconcile is retried
    #[arg(long, env = "OPGATE_ERROR_REQUEUE_SECS", default_value_t = 30)]
    pub error_requeue_secs: u64,

    /// What to do with workloads lacking exactly one owned admission check state
    /// (requeue or ignore)
    #[arg(long, env = "OPGATE_MISSING_GATE_POLICY", default_value_t = MissingGatePolicy::Requeue)]
    pub missing_gate_policy: MissingGatePolicy,

    /// Maximum concurrent reconciles per controller (0 = unbounded)
    #[arg(long, env = "OPGATE_CONCURRENCY", default_value_t = 4)]
    pub concurrency: u16,
}

impl Cli {
    /// Reconciler settings derived from the flags
    pub fn gate_settings(&self) -> GateSettings {
        GateSettings {
            controller_name: self.controller_name.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            error_requeue: Duration::from_secs(self.error_requeue_secs),
            missing_gate_policy: self.missing_gate_policy,
        }
    }
}
