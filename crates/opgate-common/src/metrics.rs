//! OpenTelemetry metrics for the admission gate
//!
//! Instruments are registered on the global meter. Without an exporter
//! configured (see [`crate::telemetry`]) recording is a no-op.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;

/// Global meter for opgate metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("opgate"));

/// Counter of committed or absorbed admission decisions
///
/// Labels:
/// - `decision`: ready, rejected, invalid
pub static ADMISSION_DECISIONS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("opgate_admission_decisions_total")
        .with_description("Admission decisions taken for gated workloads")
        .with_unit("{decisions}")
        .build()
});

/// Counter of data-operation status lookups
///
/// Labels:
/// - `type`: operation type tag as found on the workload
pub static OPERATION_POLLS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("opgate_operation_polls_total")
        .with_description("Data operation status lookups")
        .with_unit("{lookups}")
        .build()
});

/// Counter of failed reconciliations
///
/// Labels:
/// - `controller`: AdmissionCheck, Workload
/// - `retryable`: true, false
pub static RECONCILE_ERRORS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("opgate_reconcile_errors_total")
        .with_description("Reconciliations that ended in an error")
        .with_unit("{errors}")
        .build()
});

/// Decision label values
pub mod decision {
    /// GateState set to Ready
    pub const READY: &str = "ready";
    /// GateState set to Rejected
    pub const REJECTED: &str = "rejected";
    /// Operation reference could not be resolved
    pub const INVALID: &str = "invalid";
}

/// Record one admission decision
pub fn record_decision(decision: &'static str) {
    ADMISSION_DECISIONS.add(1, &[KeyValue::new("decision", decision)]);
}

/// Record one operation status lookup
pub fn record_operation_poll(type_tag: &str) {
    OPERATION_POLLS.add(1, &[KeyValue::new("type", type_tag.to_string())]);
}

/// Record one failed reconcile
pub fn record_reconcile_error(controller: &str, retryable: bool) {
    RECONCILE_ERRORS.add(
        1,
        &[
            KeyValue::new("controller", controller.to_string()),
            KeyValue::new("retryable", retryable),
        ],
    );
}
