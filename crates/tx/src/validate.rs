// Path: crates/tx/src/validate.rs
//! The `ASE.validate` algorithm: structural checks, per-unlocker proposition
//! checks, and the balance check. State access (resolving a `BoxId` to its
//! current content) is supplied by the caller through [`BoxLookup`], since
//! this crate has no storage dependency of its own.

use nyx_types::boxes::{AssetId, Box as UtxoBox, BoxId};
use nyx_types::error::TxError;
use nyx_types::proposition::UnlockContext;
use nyx_types::{Height, ModifierId, Transaction};
use std::collections::HashMap;

/// Read access to the boxes a transaction's unlockers reference.
pub trait BoxLookup {
    /// Looks up a box by id, returning `None` if it is absent or already
    /// spent at the snapshot this lookup is scoped to.
    fn get_box(&self, id: &BoxId) -> Result<Option<UtxoBox>, TxError>;
}

/// The height, timestamp and root-hash context unlock checks run against,
/// plus the minimum fee a non-coinbase transaction must meet.
pub struct ValidationContext {
    /// The height `tx` is being validated at.
    pub height: Height,
    /// The timestamp of the most recently applied block.
    pub last_block_timestamp: u64,
    /// The state root the referenced boxes were read at.
    pub root_hash: ModifierId,
    /// The minimum fee a non-coinbase transaction must pay.
    pub min_fee: u64,
}

/// Runs the three-step `ASE.validate` algorithm against `tx`.
pub fn validate_transaction<L: BoxLookup>(
    tx: &Transaction,
    lookup: &L,
    ctx: &ValidationContext,
) -> Result<(), TxError> {
    let required_fee = if tx.is_coinbase() { 0 } else { ctx.min_fee };
    tx.semantic_validity(required_fee)?;

    let unlock_ctx = UnlockContext {
        tx,
        height: ctx.height,
        last_block_timestamp: ctx.last_block_timestamp,
        root_hash: ctx.root_hash,
    };

    let mut spent = Vec::with_capacity(tx.unlockers.len());
    for (index, u) in tx.unlockers.iter().enumerate() {
        let box_value = lookup
            .get_box(&u.box_id)?
            .ok_or_else(|| TxError::UnknownInput(format!("{:?}", u.box_id)))?;
        unlock_one(&box_value, index, u.proof.as_deref(), &unlock_ctx)?;
        spent.push(box_value);
    }

    check_balance(tx, &spent)
}

fn unlock_one(
    box_value: &UtxoBox,
    index: usize,
    proof: Option<&[u8]>,
    ctx: &UnlockContext<'_>,
) -> Result<(), TxError> {
    match box_value {
        UtxoBox::Coinbase(cb) => {
            if ctx.height < cb.height_lock {
                return Err(TxError::UnlockFailed {
                    index,
                    reason: format!(
                        "coinbase box locked until height {}, current height {}",
                        cb.height_lock, ctx.height
                    ),
                });
            }
            let digest = ctx.tx.signing_digest().map_err(|e| TxError::UnlockFailed {
                index,
                reason: e.to_string(),
            })?;
            let sig_bytes = proof.unwrap_or(&ctx.tx.signature);
            nyx_crypto::sign::verify(&cb.pubkey, &digest, sig_bytes).map_err(|e| TxError::UnlockFailed {
                index,
                reason: format!("coinbase spend signature does not verify against the minting miner's key: {e}"),
            })
        }
        UtxoBox::PubKeyInfo(_) => Err(TxError::UnlockFailed {
            index,
            reason: "a PubKeyInfo box is not spendable".into(),
        }),
        UtxoBox::Asset(asset_box) => asset_box
            .proposition
            .unlock(proof, ctx)
            .map_err(|e| TxError::UnlockFailed {
                index,
                reason: e.to_string(),
            }),
    }
}

fn assets_of(b: &UtxoBox) -> Option<AssetId> {
    match b {
        UtxoBox::Asset(a) => Some(a.asset),
        UtxoBox::Coinbase(_) => Some(AssetId::Intrinsic),
        UtxoBox::PubKeyInfo(_) => None,
    }
}

/// For each asset id touched, spent amounts must be at least created
/// amounts; the surplus on the intrinsic id is the implicit fee. Coinbase
/// transactions mint supply and are exempt.
fn check_balance(tx: &Transaction, spent: &[UtxoBox]) -> Result<(), TxError> {
    if tx.is_coinbase() {
        return Ok(());
    }

    let mut spent_totals: HashMap<AssetId, u128> = HashMap::new();
    for b in spent {
        if let Some(asset) = assets_of(b) {
            *spent_totals.entry(asset).or_insert(0) += u128::from(b.amount_for(asset));
        }
    }

    let mut created_totals: HashMap<AssetId, u128> = HashMap::new();
    for d in &tx.directives {
        let created = d.to_box();
        if let Some(asset) = assets_of(&created) {
            *created_totals.entry(asset).or_insert(0) += u128::from(created.amount_for(asset));
        }
    }

    for (asset, created) in &created_totals {
        let spent_amount = spent_totals.get(asset).copied().unwrap_or(0);
        if spent_amount < *created {
            return Err(TxError::BalanceViolation {
                asset: format!("{:?}", asset),
                spent: u64::try_from(spent_amount).unwrap_or(u64::MAX),
                created: u64::try_from(*created).unwrap_or(u64::MAX),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_crypto::sign::Ed25519KeyPair;
    use nyx_types::boxes::{AssetBox, CoinbaseBox};
    use nyx_types::proposition::Proposition;
    use nyx_types::tx::{Directive, Unlocker};

    struct MapLookup(HashMap<BoxId, UtxoBox>);

    impl BoxLookup for MapLookup {
        fn get_box(&self, id: &BoxId) -> Result<Option<UtxoBox>, TxError> {
            Ok(self.0.get(id).cloned())
        }
    }

    fn ctx(height: Height) -> ValidationContext {
        ValidationContext {
            height,
            last_block_timestamp: 0,
            root_hash: ModifierId::new([0u8; 32]),
            min_fee: 1,
        }
    }

    #[test]
    fn coinbase_transaction_requires_no_lookup() {
        let tx = Transaction {
            fee: 0,
            timestamp: 0,
            unlockers: vec![],
            directives: vec![Directive::Coinbase(CoinbaseBox {
                height_lock: 0,
                nonce: 0,
                amount: 50,
                pubkey: [0u8; 32],
            })],
            signature: [0u8; 64],
        };
        let lookup = MapLookup(HashMap::new());
        assert!(validate_transaction(&tx, &lookup, &ctx(0)).is_ok());
    }

    #[test]
    fn unknown_input_is_rejected() {
        let box_id = BoxId::new(0x01, [9u8; 32]);
        let tx = Transaction {
            fee: 5,
            timestamp: 0,
            unlockers: vec![Unlocker { box_id, proof: None }],
            directives: vec![Directive::Transfer(AssetBox {
                amount: 10,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            })],
            signature: [0u8; 64],
        };
        let lookup = MapLookup(HashMap::new());
        let err = validate_transaction(&tx, &lookup, &ctx(0)).unwrap_err();
        assert!(matches!(err, TxError::UnknownInput(_)));
    }

    #[test]
    fn balance_violation_is_rejected() {
        let box_id = BoxId::new(0x01, [9u8; 32]);
        let mut store = HashMap::new();
        store.insert(
            box_id,
            UtxoBox::Asset(AssetBox {
                amount: 5,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            }),
        );
        let tx = Transaction {
            fee: 0,
            timestamp: 0,
            unlockers: vec![Unlocker { box_id, proof: None }],
            directives: vec![Directive::Transfer(AssetBox {
                amount: 10,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            })],
            signature: [0u8; 64],
        };
        let lookup = MapLookup(store);
        let err = validate_transaction(&tx, &lookup, &ctx(0)).unwrap_err();
        assert!(matches!(err, TxError::BalanceViolation { .. }));
    }

    #[test]
    fn locked_coinbase_input_is_rejected_before_maturity() {
        let box_id = BoxId::new(0x02, [3u8; 32]);
        let mut store = HashMap::new();
        store.insert(
            box_id,
            UtxoBox::Coinbase(CoinbaseBox {
                height_lock: 100,
                nonce: 0,
                amount: 10,
                pubkey: [0u8; 32],
            }),
        );
        let tx = Transaction {
            fee: 1,
            timestamp: 0,
            unlockers: vec![Unlocker { box_id, proof: None }],
            directives: vec![Directive::Transfer(AssetBox {
                amount: 9,
                asset: AssetId::Intrinsic,
                proposition: Proposition::HeightProposition { min_height: 0 },
            })],
            signature: [0u8; 64],
        };
        let lookup = MapLookup(store);
        let err = validate_transaction(&tx, &lookup, &ctx(10)).unwrap_err();
        assert!(matches!(err, TxError::UnlockFailed { .. }));
    }

    #[test]
    fn matured_coinbase_input_requires_the_minting_miners_signature() {
        let box_id = BoxId::new(0x02, [4u8; 32]);
        let miner = Ed25519KeyPair::from_seed(&[5u8; 32]).expect("keypair");
        let other = Ed25519KeyPair::from_seed(&[6u8; 32]).expect("keypair");
        let mut store = HashMap::new();
        store.insert(
            box_id,
            UtxoBox::Coinbase(CoinbaseBox {
                height_lock: 0,
                nonce: 0,
                amount: 10,
                pubkey: miner.public_key(),
            }),
        );

        let spend = |signer: &Ed25519KeyPair| {
            let mut tx = Transaction {
                fee: 1,
                timestamp: 0,
                unlockers: vec![Unlocker { box_id, proof: None }],
                directives: vec![Directive::Transfer(AssetBox {
                    amount: 9,
                    asset: AssetId::Intrinsic,
                    proposition: Proposition::HeightProposition { min_height: 0 },
                })],
                signature: [0u8; 64],
            };
            tx.signature = signer.sign(&tx.signing_digest().expect("digest")).expect("sign");
            tx
        };

        let lookup = MapLookup(store.clone());
        let err = validate_transaction(&spend(&other), &lookup, &ctx(1)).unwrap_err();
        assert!(matches!(err, TxError::UnlockFailed { .. }));

        let lookup = MapLookup(store);
        validate_transaction(&spend(&miner), &lookup, &ctx(1)).expect("minting miner's signature unlocks it");
    }
}
