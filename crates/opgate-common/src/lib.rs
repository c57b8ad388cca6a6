//! Common types for opgate: resource models, events, telemetry and metrics
//!
//! The resources modelled here are owned by other systems (the Kueue queue
//! controller and the Fluid data-operation controllers). opgate only reads
//! them and writes their status subresources, so none of the models
//! generate CRD schemas.

#![deny(missing_docs)]

pub mod crd;
pub mod events;
pub mod metrics;
pub mod telemetry;

/// Controller identity used when none is configured.
///
/// An AdmissionCheck whose `spec.controllerName` equals this value is
/// evaluated by opgate.
pub const DEFAULT_CONTROLLER_NAME: &str = "fluid.io/dataop-admission-controller";

/// Field manager recorded on status writes
pub const FIELD_MANAGER: &str = "opgate-controller";
