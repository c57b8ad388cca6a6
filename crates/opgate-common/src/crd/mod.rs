//! Resource models consumed by the opgate controllers
//!
//! - [`AdmissionCheck`]: cluster-scoped gate definition naming its controller
//! - [`Workload`]: queued unit of work carrying per-gate admission state
//! - [`OperationKind`] / [`OperationStatus`]: the Fluid data operations a
//!   workload may wait on

mod admission_check;
mod data_operation;
mod types;
mod upsert;
mod workload;

pub use admission_check::{
    AdmissionCheck, AdmissionCheckSpec, AdmissionCheckStatus, ACTIVE_CONDITION,
    ACTIVE_CONDITION_MESSAGE, ACTIVE_CONDITION_REASON,
};
pub use data_operation::{
    OperationKind, OperationPhase, OperationReference, OperationStatus, DATA_GROUP, DATA_VERSION,
    WAIT_DATAOP_NAMESPACE_LABEL, WAIT_DATAOP_NAME_LABEL, WAIT_DATAOP_TYPE_LABEL,
};
pub use types::{condition_is_true, new_condition, CONDITION_FALSE, CONDITION_TRUE, KUEUE_GROUP};
pub use upsert::{upsert, Keyed};
pub use workload::{
    AdmissionCheckState, CheckState, PodSet, Workload, WorkloadSpec, WorkloadStatus,
    ADMITTED_CONDITION,
};
