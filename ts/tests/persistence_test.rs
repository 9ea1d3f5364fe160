//! Property tests for TargetStore persistence

use proptest::prelude::*;
use targetstore::{TargetResource, TargetStatus, TargetStore};
use tempfile::TempDir;

fn target_strategy() -> impl Strategy<Value = TargetResource> {
    ("[A-Z0-9]{1,10}", "[a-zA-Z ]{0,20}", "[A-Z0-9-]{1,12}", proptest::option::of("[0-9]{1,3}")).prop_map(
        |(id, name, section, qz)| {
            let target = TargetResource::new(id, name, section);
            match qz {
                Some(qz) => target.with_attribute("qz", qz),
                None => target,
            }
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn load_after_save_returns_same_targets(targets in proptest::collection::vec(target_strategy(), 0..12)) {
        let temp = TempDir::new().unwrap();
        let store = TargetStore::open(temp.path()).unwrap();

        store.save_targets(&targets).unwrap();
        let loaded = store.load_targets();

        let saved_ids: Vec<_> = targets.iter().map(|t| t.resource_id.clone()).collect();
        let loaded_ids: Vec<_> = loaded.iter().map(|t| t.resource_id.clone()).collect();
        prop_assert_eq!(saved_ids, loaded_ids);
        prop_assert_eq!(loaded, targets);
    }

    #[test]
    fn last_status_write_wins(messages in proptest::collection::vec("[a-z]{0,8}", 1..10)) {
        let temp = TempDir::new().unwrap();
        let store = TargetStore::open(temp.path()).unwrap();

        for (i, message) in messages.iter().enumerate() {
            let status = if i % 2 == 0 { TargetStatus::Failed } else { TargetStatus::Success };
            store.update_status("r", status, message).unwrap();
        }

        let last = messages.last().unwrap();
        let record = store.get_status("r").unwrap();
        prop_assert_eq!(&record.message, last);
        let expected = if (messages.len() - 1) % 2 == 0 { TargetStatus::Failed } else { TargetStatus::Success };
        prop_assert_eq!(record.status, expected);
    }
}
