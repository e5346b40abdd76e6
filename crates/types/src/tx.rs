//! Transactions and their constituent unlockers and directives.

use crate::boxes::{AssetBox, BoxId, CoinbaseBox, PubKeyInfoBox};
use crate::error::{CryptoError, TxError};
use crate::ids::ModifierId;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

fn sha256(data: &[u8]) -> Result<[u8; 32], CryptoError> {
    use dcrypt::algorithms::hash::sha2::Sha256;
    use dcrypt::algorithms::hash::HashFunction;
    use dcrypt::algorithms::ByteSerializable;
    let digest = Sha256::digest(data).map_err(dcrypt::Error::from)?;
    let bytes = digest.to_bytes();
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidHashLength { expected: 32, got })
}

/// A claim against one existing box: the box being spent, and an optional
/// proof. When `proof` is absent, `Proposition::unlock` falls back to the
/// transaction's own `signature`.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unlocker {
    /// The box this unlocker claims to spend.
    pub box_id: BoxId,
    /// An explicit unlock proof, required by propositions such as
    /// `AddressProposition` that need more than the transaction signature.
    pub proof: Option<Vec<u8>>,
}

/// One output of a transaction: the box it creates.
///
/// Dispatch is an exhaustive match on the variant tag rather than dynamic
/// dispatch, per the tagged-sum-type design note.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Creates a spendable, proposition-guarded value box.
    Transfer(AssetBox),
    /// Creates a height-locked coinbase output.
    Coinbase(CoinbaseBox),
    /// Registers a public key for address-based unlock checks.
    RegisterPubKey(PubKeyInfoBox),
}

impl Directive {
    /// The concrete box this directive creates.
    pub fn to_box(&self) -> crate::boxes::Box {
        match self {
            Directive::Transfer(b) => crate::boxes::Box::Asset(b.clone()),
            Directive::Coinbase(b) => crate::boxes::Box::Coinbase(b.clone()),
            Directive::RegisterPubKey(b) => crate::boxes::Box::PubKeyInfo(b.clone()),
        }
    }
}

/// A transaction: an ordered claim on existing boxes and an ordered set of
/// new boxes to create.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The intrinsic-coin fee paid to the miner. Ignored for coinbase
    /// transactions, which instead mint the block reward.
    pub fee: u64,
    /// Construction time, used only for mempool tie-breaking.
    pub timestamp: u64,
    /// Inputs: boxes this transaction claims to spend. Empty for a coinbase
    /// transaction.
    pub unlockers: Vec<Unlocker>,
    /// Outputs: boxes this transaction creates.
    pub directives: Vec<Directive>,
    /// Signature over [`Transaction::signing_digest`], used as the default
    /// unlock proof by propositions that don't require an explicit one.
    pub signature: [u8; 64],
}

impl Transaction {
    /// True iff this transaction has no inputs and creates exactly one
    /// coinbase output, per the data-model invariant.
    pub fn is_coinbase(&self) -> bool {
        self.unlockers.is_empty()
            && self.directives.len() == 1
            && matches!(self.directives[0], Directive::Coinbase(_))
    }

    /// The message `signature` is computed over: the canonical encoding of
    /// every field except `signature` itself.
    pub fn signing_digest(&self) -> Result<[u8; 32], CryptoError> {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&self.fee.to_le_bytes());
        preimage.extend_from_slice(&self.timestamp.to_le_bytes());
        for u in &self.unlockers {
            preimage.extend_from_slice(u.box_id.as_ref());
            if let Some(proof) = &u.proof {
                preimage.push(1);
                preimage.extend_from_slice(proof);
            } else {
                preimage.push(0);
            }
        }
        for d in &self.directives {
            preimage.extend_from_slice(&d.encode());
        }
        sha256(&preimage)
    }

    /// This transaction's [`ModifierId`]: the hash of its full canonical
    /// encoding, including `signature`.
    pub fn id(&self) -> Result<ModifierId, CryptoError> {
        let mut preimage = self.signing_digest()?.to_vec();
        preimage.extend_from_slice(&self.signature);
        Ok(ModifierId::new(sha256(&preimage)?))
    }

    /// Structural checks and the fee floor, per step 1 of `ASE.validate`.
    /// Per-unlocker proposition checks and the balance check are performed
    /// by the caller, which has state access this crate does not.
    pub fn semantic_validity(&self, min_fee: u64) -> Result<(), TxError> {
        if self.is_coinbase() {
            if !self.unlockers.is_empty() {
                return Err(TxError::Malformed(
                    "coinbase transaction must not spend any box".into(),
                ));
            }
            return Ok(());
        }

        if self.unlockers.is_empty() {
            return Err(TxError::Malformed(
                "non-coinbase transaction must spend at least one box".into(),
            ));
        }
        if self.directives.is_empty() {
            return Err(TxError::Malformed(
                "transaction must create at least one box".into(),
            ));
        }
        if self
            .directives
            .iter()
            .any(|d| matches!(d, Directive::Coinbase(_)))
        {
            return Err(TxError::Malformed(
                "only a coinbase transaction may create a coinbase box".into(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for u in &self.unlockers {
            if !seen.insert(u.box_id) {
                return Err(TxError::DuplicateInput(format!("{:?}", u.box_id)));
            }
        }

        if self.fee < min_fee {
            return Err(TxError::FeeTooLow {
                got: self.fee,
                min: min_fee,
            });
        }

        Ok(())
    }
}
