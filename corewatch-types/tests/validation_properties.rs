//! Property tests for the boundaries the binding validation contract and
//! the registry document rely on.

use std::collections::HashMap;

use corewatch_types::{AccountId, AccountRecord, RegistryDocument};
use proptest::prelude::*;

fn arb_account_id() -> impl Strategy<Value = AccountId> {
    "[a-z0-9]{8,16}".prop_map(|s| AccountId::from(format!("acct-{s}")))
}

fn account_record(id: AccountId, order: u32) -> AccountRecord {
    let now = chrono::Utc::now();
    AccountRecord {
        id,
        name: "test".to_string(),
        note: String::new(),
        order,
        created_at: now,
        last_active_at: now,
        auto_start: false,
        session_dir: "account_test".to_string(),
        proxy: Default::default(),
        translation: Default::default(),
        notifications: Default::default(),
    }
}

fn registry_with(ids: &[AccountId]) -> RegistryDocument {
    let mut registry = RegistryDocument::empty();
    for (order, id) in ids.iter().enumerate() {
        registry.accounts.insert(id.clone(), account_record(id.clone(), order as u32));
    }
    registry
}

proptest! {
    /// `port_in_range` accepts exactly [1, 65535] regardless of how the
    /// candidate value was produced.
    #[test]
    fn port_in_range_matches_the_closed_interval(port in 0u32..=70_000) {
        let parsed = corewatch_types::validation::port_in_range(port);
        if (1..=65535).contains(&port) {
            prop_assert_eq!(parsed, Some(port as u16));
        } else {
            prop_assert_eq!(parsed, None);
        }
    }

    /// Any reordering of a registry's own ids is accepted as a valid
    /// `reorder` target; dropping, duplicating, or introducing an id is
    /// always rejected.
    #[test]
    fn any_permutation_of_known_ids_is_accepted(ids in prop::collection::vec(arb_account_id(), 0..8)) {
        let unique: HashMap<AccountId, ()> = ids.iter().cloned().map(|id| (id, ())).collect();
        let unique_ids: Vec<AccountId> = unique.keys().cloned().collect();
        let registry = registry_with(&unique_ids);

        let mut shuffled = unique_ids.clone();
        shuffled.reverse();
        prop_assert!(registry.is_permutation_of_ids(&shuffled));

        if !unique_ids.is_empty() {
            let mut missing_one = unique_ids.clone();
            missing_one.pop();
            prop_assert!(!registry.is_permutation_of_ids(&missing_one));

            let mut duplicated = unique_ids.clone();
            duplicated.push(unique_ids[0].clone());
            prop_assert!(!registry.is_permutation_of_ids(&duplicated));
        }

        let mut with_unknown = unique_ids;
        with_unknown.push(AccountId::from("acct-unknown".to_string()));
        prop_assert!(!registry.is_permutation_of_ids(&with_unknown));
    }
}
