// Path: crates/mempool/src/pool.rs
//! The pool itself: a bounded, fee-ordered set of pending transactions with
//! no two admitted transactions allowed to share a spent input.

use crate::config::MempoolConfig;
use nyx_tx::validate::{validate_transaction, BoxLookup, ValidationContext};
use nyx_types::boxes::BoxId;
use nyx_types::error::{MempoolError, TxError};
use nyx_types::ids::ModifierId;
use nyx_types::tx::Transaction;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

/// Sorted by descending fee, then ascending timestamp (older first among
/// equal fees), then id for a total order. Iterating a `BTreeSet<OrderKey>`
/// ascending therefore yields highest-priority transactions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OrderKey {
    fee_desc: Reverse<u64>,
    timestamp: u64,
    id: ModifierId,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<ModifierId, Transaction>,
    keys_by_id: HashMap<ModifierId, OrderKey>,
    order: BTreeSet<OrderKey>,
    spent_inputs: HashMap<BoxId, ModifierId>,
}

/// A bounded, fee-ordered, no-double-spend transaction pool.
pub struct Mempool {
    inner: RwLock<Inner>,
    config: MempoolConfig,
}

impl Mempool {
    /// Builds an empty pool with the given bounds.
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    /// The number of transactions currently pooled.
    pub fn size(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Whether a transaction with this id is currently pooled.
    pub fn contains(&self, id: &ModifierId) -> bool {
        self.inner.read().by_id.contains_key(id)
    }

    /// Validates `tx` against the current state (via `lookup`/`ctx`, the
    /// same contract `AuthenticatedStateEngine::validate` uses) and, if it
    /// passes, admits it: rejecting duplicates and input conflicts against
    /// already-pooled transactions, and evicting the lowest-fee entry if
    /// the pool is full and `tx` outbids it.
    #[tracing::instrument(skip_all)]
    pub fn put<L: BoxLookup>(
        &self,
        tx: Transaction,
        lookup: &L,
        ctx: &ValidationContext,
    ) -> Result<(), MempoolError> {
        validate_transaction(&tx, lookup, ctx)?;
        let id = tx
            .id()
            .map_err(|e| MempoolError::Tx(TxError::Malformed(e.to_string())))?;

        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&id) {
            return Err(MempoolError::Duplicate);
        }
        for u in &tx.unlockers {
            if inner.spent_inputs.contains_key(&u.box_id) {
                return Err(MempoolError::DoubleSpend(format!("{:?}", u.box_id)));
            }
        }

        if inner.by_id.len() >= self.config.max_size {
            let worst = *inner
                .order
                .iter()
                .next_back()
                .ok_or(MempoolError::PoolFull {
                    capacity: self.config.max_size,
                })?;
            if tx.fee <= worst.fee_desc.0 {
                return Err(MempoolError::PoolFull {
                    capacity: self.config.max_size,
                });
            }
            Self::evict(&mut inner, worst);
        }

        let key = OrderKey {
            fee_desc: Reverse(tx.fee),
            timestamp: tx.timestamp,
            id,
        };
        for u in &tx.unlockers {
            inner.spent_inputs.insert(u.box_id, id);
        }
        inner.order.insert(key);
        inner.keys_by_id.insert(id, key);
        inner.by_id.insert(id, tx);
        tracing::debug!(?id, "admitted transaction to mempool");
        Ok(())
    }

    /// Returns up to `limit` transactions, highest fee first, without
    /// removing them. Used by candidate-block assembly.
    pub fn take(&self, limit: usize) -> Vec<Transaction> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .take(limit)
            .filter_map(|key| inner.by_id.get(&key.id).cloned())
            .collect()
    }

    /// Removes every transaction in `ids` from the pool, if present. Used
    /// once a block application confirms them, or to drop transactions that
    /// a rollback found to be no longer valid.
    pub fn remove(&self, ids: &[ModifierId]) {
        let mut inner = self.inner.write();
        for id in ids {
            if let Some(key) = inner.keys_by_id.remove(id) {
                Self::evict(&mut inner, key);
            }
        }
    }

    fn evict(inner: &mut Inner, key: OrderKey) {
        inner.order.remove(&key);
        inner.keys_by_id.remove(&key.id);
        if let Some(tx) = inner.by_id.remove(&key.id) {
            for u in &tx.unlockers {
                inner.spent_inputs.remove(&u.box_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_crypto::sign::Ed25519KeyPair;
    use nyx_types::boxes::{AssetBox, AssetId, CoinbaseBox};
    use nyx_types::error::TxError;
    use nyx_types::proposition::Proposition;
    use nyx_types::tx::{Directive, Unlocker};
    use std::collections::HashMap as StdHashMap;

    struct MapLookup(StdHashMap<BoxId, nyx_types::boxes::Box>);

    impl BoxLookup for MapLookup {
        fn get_box(&self, id: &BoxId) -> Result<Option<nyx_types::boxes::Box>, TxError> {
            Ok(self.0.get(id).cloned())
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext {
            height: 0,
            last_block_timestamp: 0,
            root_hash: ModifierId::new([0u8; 32]),
            min_fee: 1,
        }
    }

    /// Every fixture in this module spends a `CoinbaseBox` minted to the
    /// same deterministic key, so a transaction's signature can unlock it.
    fn test_miner() -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed(&[3u8; 32]).expect("keypair")
    }

    fn spendable_tx(box_id: BoxId, fee: u64, timestamp: u64) -> Transaction {
        sign(Transaction {
            fee,
            timestamp,
            unlockers: vec![Unlocker { box_id, proof: None }],
            directives: vec![Directive::Transfer(AssetBox {
                amount: 1,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            })],
            signature: [0u8; 64],
        })
    }

    fn sign(mut tx: Transaction) -> Transaction {
        tx.signature = test_miner()
            .sign(&tx.signing_digest().expect("digest"))
            .expect("sign");
        tx
    }

    fn lookup_with(box_id: BoxId, amount: u64) -> MapLookup {
        let mut m = StdHashMap::new();
        m.insert(
            box_id,
            nyx_types::boxes::Box::Coinbase(CoinbaseBox {
                height_lock: 0,
                nonce: 0,
                amount,
                pubkey: test_miner().public_key(),
            }),
        );
        MapLookup(m)
    }

    #[test]
    fn admits_and_orders_by_fee_descending() {
        let pool = Mempool::new(MempoolConfig { max_size: 10 });
        let box_a = BoxId::new(0x02, [1u8; 32]);
        let box_b = BoxId::new(0x02, [2u8; 32]);
        let lookup_a = lookup_with(box_a, 100);
        let lookup_b = lookup_with(box_b, 100);

        let tx_low = spendable_tx(box_a, 1, 0);
        let tx_high = spendable_tx(box_b, 10, 1);
        pool.put(tx_low.clone(), &lookup_a, &ctx()).expect("put low");
        pool.put(tx_high.clone(), &lookup_b, &ctx()).expect("put high");

        let taken = pool.take(10);
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].fee, 10);
        assert_eq!(taken[1].fee, 1);
    }

    #[test]
    fn rejects_double_spend_against_pooled_transaction() {
        let pool = Mempool::new(MempoolConfig { max_size: 10 });
        let box_a = BoxId::new(0x02, [3u8; 32]);
        let lookup = lookup_with(box_a, 100);

        let tx1 = spendable_tx(box_a, 5, 0);
        let mut tx2 = spendable_tx(box_a, 5, 1);
        tx2.directives = vec![Directive::Transfer(AssetBox {
            amount: 2,
            asset: AssetId::Intrinsic,
            proposition: Proposition::HeightProposition { min_height: 1 },
        })];
        let tx2 = sign(tx2);

        pool.put(tx1, &lookup, &ctx()).expect("put first");
        let err = pool.put(tx2, &lookup, &ctx()).unwrap_err();
        assert!(matches!(err, MempoolError::DoubleSpend(_)));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn evicts_lowest_fee_when_full_and_outbid() {
        let pool = Mempool::new(MempoolConfig { max_size: 1 });
        let box_a = BoxId::new(0x02, [4u8; 32]);
        let box_b = BoxId::new(0x02, [5u8; 32]);
        let lookup_a = lookup_with(box_a, 100);
        let lookup_b = lookup_with(box_b, 100);

        let tx_low = spendable_tx(box_a, 1, 0);
        let low_id = tx_low.id().expect("id");
        pool.put(tx_low, &lookup_a, &ctx()).expect("put low");

        let tx_high = spendable_tx(box_b, 50, 1);
        pool.put(tx_high, &lookup_b, &ctx()).expect("put high");

        assert_eq!(pool.size(), 1);
        assert!(!pool.contains(&low_id));
    }

    #[test]
    fn full_pool_rejects_a_non_outbidding_transaction() {
        let pool = Mempool::new(MempoolConfig { max_size: 1 });
        let box_a = BoxId::new(0x02, [6u8; 32]);
        let box_b = BoxId::new(0x02, [7u8; 32]);
        let lookup_a = lookup_with(box_a, 100);
        let lookup_b = lookup_with(box_b, 100);

        pool.put(spendable_tx(box_a, 50, 0), &lookup_a, &ctx()).expect("put high");
        let err = pool.put(spendable_tx(box_b, 1, 1), &lookup_b, &ctx()).unwrap_err();
        assert!(matches!(err, MempoolError::PoolFull { .. }));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn remove_drops_confirmed_transactions() {
        let pool = Mempool::new(MempoolConfig { max_size: 10 });
        let box_a = BoxId::new(0x02, [8u8; 32]);
        let lookup = lookup_with(box_a, 100);
        let tx = spendable_tx(box_a, 5, 0);
        let id = tx.id().expect("id");
        pool.put(tx, &lookup, &ctx()).expect("put");
        pool.remove(&[id]);
        assert!(!pool.contains(&id));
        assert_eq!(pool.size(), 0);
    }
}
