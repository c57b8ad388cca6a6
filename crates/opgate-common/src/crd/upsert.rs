//! Find-or-append over keyed status lists
//!
//! Condition lists and admission-check state lists follow the same
//! convention: at most one entry per key, order preserved, and the
//! transition timestamp only moves when the entry's status really changes.

/// An element of a status list identified by a unique key.
pub trait Keyed {
    /// Key unique within the list (condition type, check name, ...)
    fn key(&self) -> &str;

    /// Called on the replacement before it overwrites `previous`.
    ///
    /// Implementations copy over whatever must survive a no-op update,
    /// typically the last transition time when the status is unchanged.
    fn carry_over(&mut self, _previous: &Self) {}
}

/// Replace the element with `item`'s key, or append `item` if none exists.
pub fn upsert<T: Keyed>(mut list: Vec<T>, mut item: T) -> Vec<T> {
    match list.iter_mut().find(|existing| existing.key() == item.key()) {
        Some(existing) => {
            item.carry_over(existing);
            *existing = item;
        }
        None => list.push(item),
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{new_condition, AdmissionCheckState, CheckState, CONDITION_FALSE, CONDITION_TRUE};
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn past() -> Time {
        Time(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn appends_when_key_is_absent() {
        let list = vec![new_condition("A", CONDITION_TRUE, "r", "m", None)];
        let list = upsert(list, new_condition("B", CONDITION_TRUE, "r", "m", None));
        let keys: Vec<_> = list.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn replaces_in_place_preserving_order() {
        let list = vec![
            new_condition("A", CONDITION_TRUE, "r", "m", None),
            new_condition("B", CONDITION_FALSE, "r", "m", None),
            new_condition("C", CONDITION_TRUE, "r", "m", None),
        ];
        let list = upsert(list, new_condition("B", CONDITION_TRUE, "now", "done", None));
        let keys: Vec<_> = list.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
        assert_eq!(list[1].status, CONDITION_TRUE);
        assert_eq!(list[1].message, "done");
    }

    #[test]
    fn unchanged_status_keeps_transition_time() {
        let mut old = new_condition("Active", CONDITION_TRUE, "Active", "old", None);
        old.last_transition_time = past();
        let list = upsert(
            vec![old],
            new_condition("Active", CONDITION_TRUE, "Active", "new", None),
        );
        assert_eq!(list[0].last_transition_time, past());
        assert_eq!(list[0].message, "new");
    }

    #[test]
    fn changed_status_takes_new_transition_time() {
        let mut old = new_condition("Active", CONDITION_FALSE, "Inactive", "", None);
        old.last_transition_time = past();
        let list = upsert(
            vec![old],
            new_condition("Active", CONDITION_TRUE, "Active", "", None),
        );
        assert_ne!(list[0].last_transition_time, past());
    }

    #[test]
    fn check_states_use_the_same_helper() {
        let pending = AdmissionCheckState {
            name: "gate1".to_string(),
            state: CheckState::Pending,
            message: String::new(),
            last_transition_time: Some(past()),
            pod_set_updates: None,
        };
        let other = AdmissionCheckState {
            name: "gate2".to_string(),
            ..pending.clone()
        };

        let list = upsert(
            vec![pending.clone(), other],
            AdmissionCheckState::transition(&pending, CheckState::Ready, "done"),
        );

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "gate1");
        assert_eq!(list[0].state, CheckState::Ready);
        assert_ne!(list[0].last_transition_time, Some(past()));
        assert_eq!(list[1].state, CheckState::Pending);
    }
}
