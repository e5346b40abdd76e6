use super::super::proof::{verify_iavl_proof, IavlProof};
use super::IAVLTree;
use proptest::prelude::*;
use std::collections::HashMap;

#[test]
fn empty_tree_has_no_root_and_returns_none() {
    let tree = IAVLTree::new();
    assert_eq!(tree.root_hash(), None);
    assert_eq!(tree.get(b"missing").unwrap(), None);
}

#[test]
fn insert_then_get_round_trips() {
    let mut tree = IAVLTree::new();
    tree.insert(b"alice", b"100").unwrap();
    tree.insert(b"bob", b"200").unwrap();
    assert_eq!(tree.get(b"alice").unwrap(), Some(b"100".to_vec()));
    assert_eq!(tree.get(b"bob").unwrap(), Some(b"200".to_vec()));
    assert_eq!(tree.get(b"carol").unwrap(), None);
}

#[test]
fn overwrite_replaces_value() {
    let mut tree = IAVLTree::new();
    tree.insert(b"k", b"v1").unwrap();
    tree.insert(b"k", b"v2").unwrap();
    assert_eq!(tree.get(b"k").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn remove_deletes_key() {
    let mut tree = IAVLTree::new();
    tree.insert(b"a", b"1").unwrap();
    tree.insert(b"b", b"2").unwrap();
    tree.remove(b"a").unwrap();
    assert_eq!(tree.get(b"a").unwrap(), None);
    assert_eq!(tree.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn remove_missing_key_is_noop() {
    let mut tree = IAVLTree::new();
    tree.insert(b"a", b"1").unwrap();
    let root_before = tree.root_hash();
    tree.remove(b"does-not-exist").unwrap();
    assert_eq!(tree.root_hash(), root_before);
}

#[test]
fn many_inserts_stay_balanced_and_retrievable() {
    let mut tree = IAVLTree::new();
    let keys: Vec<Vec<u8>> = (0..200u32).map(|i| i.to_be_bytes().to_vec()).collect();
    for (i, k) in keys.iter().enumerate() {
        tree.insert(k, i.to_string().as_bytes()).unwrap();
    }
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(tree.get(k).unwrap(), Some(i.to_string().into_bytes()));
    }
    assert!(tree.tree_height().unwrap() < 20, "tree should stay log-balanced");
}

#[test]
fn existence_proof_verifies_against_root() {
    let mut tree = IAVLTree::new();
    tree.insert(b"alice", b"100").unwrap();
    tree.insert(b"bob", b"200").unwrap();
    tree.insert(b"carol", b"300").unwrap();

    let root = tree.root_hash_or_empty();
    let proof = tree.create_proof(b"bob").unwrap();
    assert!(matches!(proof, IavlProof::Existence(_)));
    assert!(verify_iavl_proof(&root, b"bob", Some(b"200"), &proof).unwrap());
    assert!(!verify_iavl_proof(&root, b"bob", Some(b"wrong"), &proof).unwrap());
}

#[test]
fn non_existence_proof_verifies_against_root() {
    let mut tree = IAVLTree::new();
    tree.insert(b"alice", b"100").unwrap();
    tree.insert(b"carol", b"300").unwrap();

    let root = tree.root_hash_or_empty();
    let proof = tree.create_proof(b"bob").unwrap();
    assert!(matches!(proof, IavlProof::NonExistence(_)));
    assert!(verify_iavl_proof(&root, b"bob", None, &proof).unwrap());
}

#[test]
fn new_nodes_includes_every_node_touched_since_last_clear() {
    let mut tree = IAVLTree::new();
    tree.insert(b"a", b"1").unwrap();
    tree.insert(b"b", b"2").unwrap();
    let nodes = tree.new_nodes().unwrap();
    assert!(!nodes.is_empty());

    tree.clear_cache();
    assert!(tree.new_nodes().unwrap().is_empty());
    assert!(tree.root_hash().is_some());
}

#[test]
fn clone_is_independent_of_original() {
    let mut tree = IAVLTree::new();
    tree.insert(b"a", b"1").unwrap();
    let snapshot = tree.clone();
    tree.insert(b"b", b"2").unwrap();
    assert_eq!(snapshot.get(b"b").unwrap(), None);
    assert_eq!(tree.get(b"b").unwrap(), Some(b"2".to_vec()));
}

proptest! {
    /// A tree built from an arbitrary sequence of insert/remove ops must
    /// always agree with a plain `HashMap` reference model, and must stay
    /// log-balanced regardless of insertion order.
    #[test]
    fn matches_a_reference_map_and_stays_balanced(
        ops in prop::collection::vec(
            (any::<u8>(), prop::collection::vec(any::<u8>(), 1..8), prop::bool::ANY),
            1..200,
        )
    ) {
        let mut tree = IAVLTree::new();
        let mut model: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();

        for (k, v, is_insert) in ops {
            let key = vec![k];
            if is_insert {
                tree.insert(&key, &v).unwrap();
                model.insert(key, v);
            } else {
                tree.remove(&key).unwrap();
                model.remove(&key);
            }
        }

        for k in 0u8..=255 {
            let key = vec![k];
            prop_assert_eq!(tree.get(&key).unwrap(), model.get(&key).cloned());
        }

        // 256 possible single-byte keys: log2(256) == 8, a few rotations of
        // slack is still well short of the degenerate-list height of 256.
        prop_assert!(tree.tree_height().unwrap() <= 16);
    }

    /// Every key present in the tree must produce an existence proof that
    /// verifies against the current root, and removing it then yields a
    /// non-existence proof for the same key.
    #[test]
    fn insert_then_remove_round_trips_through_proofs(
        keys in prop::collection::hash_set(prop::collection::vec(any::<u8>(), 1..8), 1..40)
    ) {
        let mut tree = IAVLTree::new();
        let keys: Vec<Vec<u8>> = keys.into_iter().collect();
        for (i, k) in keys.iter().enumerate() {
            tree.insert(k, i.to_string().as_bytes()).unwrap();
        }

        let root = tree.root_hash_or_empty();
        for (i, k) in keys.iter().enumerate() {
            let proof = tree.create_proof(k).unwrap();
            prop_assert!(matches!(proof, IavlProof::Existence(_)));
            prop_assert!(verify_iavl_proof(&root, k, Some(i.to_string().as_bytes()), &proof).unwrap());
        }

        for k in &keys {
            tree.remove(k).unwrap();
        }
        let root = tree.root_hash_or_empty();
        for k in &keys {
            let proof = tree.create_proof(k).unwrap();
            prop_assert!(matches!(proof, IavlProof::NonExistence(_)));
            prop_assert!(verify_iavl_proof(&root, k, None, &proof).unwrap());
        }
    }
}
