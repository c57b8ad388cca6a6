//! Data-operation status lookup
//!
//! The admission controller only needs the phase of the operation a
//! workload waits on. Lookup failures are split in two classes because the
//! controller reacts to them differently: an [`LookupError::Invalid`]
//! reference is reported once and left for a human to fix, a
//! [`LookupError::Transient`] failure is retried.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject};
use kube::Client;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use opgate_common::crd::{OperationKind, OperationReference, OperationStatus};

/// Longest object name the API server accepts (DNS-1123 subdomain)
const MAX_NAME_LEN: usize = 253;

/// Longest namespace name the API server accepts (DNS-1123 label)
const MAX_NAMESPACE_LEN: usize = 63;

/// Why a data operation's status could not be read
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The reference can never resolve: unsupported type tag or malformed name
    #[error("invalid data operation reference {reference}: {message}")]
    Invalid {
        /// Reference as found on the workload
        reference: String,
        /// What is wrong with it
        message: String,
    },

    /// The status could not be read right now
    #[error("failed to read data operation {reference}: {message}")]
    Transient {
        /// Reference as found on the workload
        reference: String,
        /// Underlying failure
        message: String,
    },
}

impl LookupError {
    /// Whether retrying the same lookup later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    fn invalid(reference: &OperationReference, message: impl Into<String>) -> Self {
        Self::Invalid {
            reference: reference.to_string(),
            message: message.into(),
        }
    }

    fn transient(reference: &OperationReference, message: impl ToString) -> Self {
        Self::Transient {
            reference: reference.to_string(),
            message: message.to_string(),
        }
    }
}

/// Reads the status of the data operation a workload waits on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OperationStatusLookup: Send + Sync {
    /// Current status of the operation named by `reference`
    async fn status(&self, reference: &OperationReference)
        -> Result<OperationStatus, LookupError>;
}

/// Lookup backed by the Kubernetes API, reading operations as dynamic objects
pub struct KubeOperationLookup {
    client: Client,
}

impl KubeOperationLookup {
    /// Create a lookup using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OperationStatusLookup for KubeOperationLookup {
    async fn status(
        &self,
        reference: &OperationReference,
    ) -> Result<OperationStatus, LookupError> {
        let kind = validate_reference(reference)?;
        let ar = kind.api_resource();

        // An empty namespace label defers to the client's namespace
        let api: Api<DynamicObject> = if reference.namespace.is_empty() {
            Api::default_namespaced_with(self.client.clone(), &ar)
        } else {
            Api::namespaced_with(self.client.clone(), &reference.namespace, &ar)
        };

        let object = api
            .get(&reference.name)
            .await
            .map_err(|e| LookupError::transient(reference, e))?;

        let status = OperationStatus::from_object_data(&object.data)
            .map_err(|e| LookupError::transient(reference, format!("unreadable status: {}", e)))?;

        debug!(operation = %reference, phase = %status.phase, "Read data operation status");
        Ok(status)
    }
}

/// Check that `reference` can name an existing operation at all.
///
/// Everything rejected here would fail the same way on every retry.
fn validate_reference(reference: &OperationReference) -> Result<OperationKind, LookupError> {
    let kind = reference
        .type_tag
        .parse::<OperationKind>()
        .map_err(|e| LookupError::invalid(reference, e))?;

    validate_object_name(&reference.name, MAX_NAME_LEN, true)
        .map_err(|e| LookupError::invalid(reference, format!("name {}", e)))?;

    if !reference.namespace.is_empty() {
        validate_object_name(&reference.namespace, MAX_NAMESPACE_LEN, false)
            .map_err(|e| LookupError::invalid(reference, format!("namespace {}", e)))?;
    }

    Ok(kind)
}

/// Validate a DNS-1123 name.
///
/// Lowercase alphanumerics and hyphens, starting and ending alphanumeric;
/// dots are only accepted for subdomains.
fn validate_object_name(s: &str, max_len: usize, allow_dots: bool) -> Result<(), String> {
    if s.is_empty() {
        return Err("cannot be empty".to_string());
    }
    if s.len() > max_len {
        return Err(format!("'{}' is longer than {} characters", s, max_len));
    }

    let edge_ok = |c: Option<char>| matches!(c, Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(s.chars().next()) || !edge_ok(s.chars().last()) {
        return Err(format!("'{}' must start and end with a lowercase alphanumeric", s));
    }

    for c in s.chars() {
        let ok = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || (allow_dots && c == '.');
        if !ok {
            return Err(format!("'{}' contains invalid character '{}'", s, c));
        }
    }

    Ok(())
}
