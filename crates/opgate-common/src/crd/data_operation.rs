//! Fluid data operations a workload can wait on
//!
//! Data operations (DataLoad, DataProcess, ...) are run by Fluid's own
//! controllers. opgate never writes them; it resolves a reference taken from
//! a workload's pod-template labels and reads `status.phase`.

use std::collections::BTreeMap;

use kube::api::GroupVersionKind;
use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};

/// API group of the Fluid data-operation resources
pub const DATA_GROUP: &str = "data.fluid.io";

/// API version of the Fluid data-operation resources
pub const DATA_VERSION: &str = "v1alpha1";

/// Pod-template label naming the operation kind; its absence means the
/// workload is not gated
pub const WAIT_DATAOP_TYPE_LABEL: &str = "fluid.io/wait-dataop-type";

/// Pod-template label naming the operation
pub const WAIT_DATAOP_NAME_LABEL: &str = "fluid.io/wait-dataop-name";

/// Pod-template label naming the operation's namespace (may be empty)
pub const WAIT_DATAOP_NAMESPACE_LABEL: &str = "fluid.io/wait-dataop-namespace";

// =============================================================================
// Reference
// =============================================================================

/// A workload's pointer to the data operation gating it.
///
/// Values are taken literally from the labels: an unknown type tag or an
/// empty name is only detected when the status lookup runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationReference {
    /// Operation type tag, e.g. "DataLoad"
    pub type_tag: String,
    /// Operation name
    pub name: String,
    /// Operation namespace; empty defers resolution to the lookup
    pub namespace: String,
}

impl OperationReference {
    /// Read a reference from pod-template labels.
    ///
    /// Returns `None` when the type label is absent.
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Option<Self> {
        let type_tag = labels.get(WAIT_DATAOP_TYPE_LABEL)?;
        let get = |key: &str| labels.get(key).cloned().unwrap_or_default();
        Some(Self {
            type_tag: type_tag.clone(),
            name: get(WAIT_DATAOP_NAME_LABEL),
            namespace: get(WAIT_DATAOP_NAMESPACE_LABEL),
        })
    }
}

impl std::fmt::Display for OperationReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.type_tag, self.name)
        } else {
            write!(f, "{}/{}/{}", self.type_tag, self.namespace, self.name)
        }
    }
}

// =============================================================================
// Kind
// =============================================================================

/// Supported data-operation kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// Cache warm-up of a dataset
    DataLoad,
    /// Arbitrary processing job against a dataset
    DataProcess,
    /// Data copy between storage locations
    DataMigrate,
    /// Backup of dataset metadata
    DataBackup,
}

impl OperationKind {
    /// All supported kinds
    pub const ALL: [OperationKind; 4] = [
        Self::DataLoad,
        Self::DataProcess,
        Self::DataMigrate,
        Self::DataBackup,
    ];

    /// Kubernetes kind name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataLoad => "DataLoad",
            Self::DataProcess => "DataProcess",
            Self::DataMigrate => "DataMigrate",
            Self::DataBackup => "DataBackup",
        }
    }

    /// Dynamic API resource used to read operations of this kind
    pub fn api_resource(self) -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(
            DATA_GROUP,
            DATA_VERSION,
            self.as_str(),
        ))
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unsupported data operation type '{}' (expected one of: DataLoad, DataProcess, DataMigrate, DataBackup)",
                    s
                )
            })
    }
}

// =============================================================================
// Status
// =============================================================================

/// Lifecycle phase reported by a data operation
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum OperationPhase {
    /// No phase written yet
    #[default]
    #[serde(rename = "")]
    None,
    /// Accepted but not started
    Pending,
    /// Running
    Executing,
    /// Finished successfully
    Complete,
    /// Finished unsuccessfully
    Failed,
    /// A phase this controller does not know; treated as still running
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Pending => write!(f, "Pending"),
            Self::Executing => write!(f, "Executing"),
            Self::Complete => write!(f, "Complete"),
            Self::Failed => write!(f, "Failed"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The part of a data operation's status opgate reads
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    /// Current phase
    #[serde(default)]
    pub phase: OperationPhase,

    /// Run duration as reported by Fluid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl OperationStatus {
    /// Extract the status from an operation's object data.
    ///
    /// An object without a `status` stanza has not been picked up by its
    /// controller yet and is reported with the default (empty) phase.
    pub fn from_object_data(data: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match data.get("status") {
            Some(status) if !status.is_null() => serde_json::from_value(status.clone()),
            _ => Ok(Self::default()),
        }
    }
}
