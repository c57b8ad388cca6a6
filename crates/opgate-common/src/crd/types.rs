//! Shared condition helpers
//!
//! Both Kueue resources use the standard `meta/v1` Condition shape, so these
//! helpers operate on the k8s-openapi type directly.

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

use super::upsert::Keyed;

/// API group of the Kueue resources
pub const KUEUE_GROUP: &str = "kueue.x-k8s.io";

/// Condition status string for a met condition
pub const CONDITION_TRUE: &str = "True";

/// Condition status string for an unmet condition
pub const CONDITION_FALSE: &str = "False";

/// Build a condition stamped with the current time
pub fn new_condition(
    type_: impl Into<String>,
    status: &str,
    reason: impl Into<String>,
    message: impl Into<String>,
    observed_generation: Option<i64>,
) -> Condition {
    Condition {
        type_: type_.into(),
        status: status.to_string(),
        reason: reason.into(),
        message: message.into(),
        observed_generation,
        last_transition_time: Time(Utc::now()),
    }
}

/// Whether `conditions` contains `type_` with status `True`
pub fn condition_is_true(conditions: &[Condition], type_: &str) -> bool {
    conditions
        .iter()
        .any(|c| c.type_ == type_ && c.status == CONDITION_TRUE)
}

impl Keyed for Condition {
    fn key(&self) -> &str {
        &self.type_
    }

    fn carry_over(&mut self, previous: &Self) {
        if previous.status == self.status {
            self.last_transition_time = previous.last_transition_time.clone();
        }
    }
}
