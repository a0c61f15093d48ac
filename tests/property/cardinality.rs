// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for flag and list driven resource sets

use proptest::prelude::*;
use std::collections::BTreeSet;

use cim_network_topology::cardinality::{materialize, materialize_list, Gate};
use cim_network_topology::generate;

use crate::fixtures::{validated, with_recipients};

fn distinct_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,8}", 0..8).prop_map(|set| set.into_iter().collect())
}

proptest! {
    /// Output depends on the set of elements, never on their order
    #[test]
    fn prop_list_order_is_irrelevant(names in distinct_names().prop_shuffle()) {
        let built = materialize_list("names", &names, |name| format!("resource.{}", name)).unwrap();
        let mut expected: Vec<String> = names.iter().map(|n| format!("resource.{}", n)).collect();
        expected.sort();
        prop_assert_eq!(built, expected);
    }

    /// One instance per element; a repeated element is rejected
    #[test]
    fn prop_list_cardinality(names in distinct_names()) {
        let gate = Gate::List(names.as_slice());
        prop_assert_eq!(gate.cardinality(), names.len());
        prop_assert_eq!(materialize("names", gate, |_| ()).unwrap().len(), names.len());

        if let Some(first) = names.first() {
            let mut repeated = names.clone();
            repeated.push(first.clone());
            prop_assert!(materialize_list("names", &repeated, |n| n.clone()).is_err());
        }
    }

    #[test]
    fn prop_flag_cardinality(enabled in any::<bool>()) {
        let gate: Gate<'_, String> = Gate::Flag(enabled);
        let built = materialize("flag", gate, |element| element.is_none()).unwrap();
        prop_assert_eq!(built.len(), usize::from(enabled));
        prop_assert!(built.into_iter().all(|from_flag| from_flag));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Removing one recipient removes exactly its subscription
    #[test]
    fn prop_recipient_removal_is_independent(
        users in prop::collection::btree_set("[a-z]{1,6}", 2..5),
        index in any::<prop::sample::Index>(),
    ) {
        let emails: Vec<String> = users.iter().map(|u| format!("{}@example.com", u)).collect();
        let removed = index.get(&emails).clone();
        let remaining: Vec<&str> = emails.iter().filter(|e| **e != removed).map(String::as_str).collect();
        let all: Vec<&str> = emails.iter().map(String::as_str).collect();

        let before = generate(&validated(with_recipients(&all))).unwrap();
        let after = generate(&validated(with_recipients(&remaining))).unwrap();

        let keys = |plan: &cim_network_topology::InfrastructurePlan| -> BTreeSet<String> {
            plan.apply_order.iter().map(|k| k.to_string()).collect()
        };
        let gone: Vec<String> = keys(&before).difference(&keys(&after)).cloned().collect();
        prop_assert_eq!(gone, vec![format!("alert_subscription.{}", removed)]);
        prop_assert!(keys(&after).is_subset(&keys(&before)));
    }
}
