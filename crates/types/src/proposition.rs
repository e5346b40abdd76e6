//! Spending conditions ("propositions") and the context `unlock` checks run against.

use crate::error::TxError;
use crate::{Height, ModifierId};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Everything a [`Proposition::unlock`] check may need beyond the proof
/// itself: the spending transaction, the height it is being validated at,
/// the previous block's timestamp, and the state root the check runs
/// against.
pub struct UnlockContext<'a> {
    /// The transaction attempting to spend the box.
    pub tx: &'a crate::Transaction,
    /// The height `tx` is being validated against.
    pub height: Height,
    /// The timestamp of the most recently applied block.
    pub last_block_timestamp: u64,
    /// The state root the box being spent was read at.
    pub root_hash: ModifierId,
}

/// A spending condition attached to an [`crate::boxes::AssetBox`].
///
/// Dispatch is an exhaustive match on the variant tag rather than dynamic
/// dispatch, per the tagged-sum-type design note.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proposition {
    /// Spendable by whoever holds the matching Ed25519 private key; `proof`
    /// is ignored, the transaction's own signature is checked instead.
    PublicKey25519 {
        /// The Ed25519 public key authorized to spend this box.
        pubkey: [u8; 32],
    },
    /// Spendable by whoever holds the private key behind a Base58-style
    /// address (the SHA-256 digest of a public key), requiring the spender
    /// to additionally reveal the public key in the proof.
    AddressProposition {
        /// The address this box is locked to (hash of the authorized pubkey).
        address: [u8; 32],
    },
    /// Spendable only once `context.height` has reached `min_height`.
    HeightProposition {
        /// The minimum height at which this box may be spent.
        min_height: Height,
    },
}

impl Proposition {
    /// Attempts to unlock this proposition. `proof` is the unlocker's
    /// optional proof bytes, falling back to the transaction's own signature
    /// when absent, matching the `validate` algorithm in the Authenticated
    /// State Engine.
    pub fn unlock(&self, proof: Option<&[u8]>, ctx: &UnlockContext<'_>) -> Result<(), TxError> {
        match self {
            Proposition::PublicKey25519 { pubkey } => {
                let sig_bytes = proof.unwrap_or(&ctx.tx.signature);
                verify_ed25519(pubkey, &ctx.tx.signing_digest(), sig_bytes)
            }
            Proposition::AddressProposition { address } => {
                let proof = proof.ok_or_else(|| TxError::UnlockFailed {
                    index: 0,
                    reason: "address proposition requires a revealed pubkey proof".into(),
                })?;
                if proof.len() < 32 {
                    return Err(TxError::UnlockFailed {
                        index: 0,
                        reason: "proof too short to contain a pubkey".into(),
                    });
                }
                let (pubkey_bytes, sig_bytes) = proof.split_at(32);
                let derived = nyx_sha256(pubkey_bytes)?;
                if &derived != address {
                    return Err(TxError::UnlockFailed {
                        index: 0,
                        reason: "revealed pubkey does not hash to the locked address".into(),
                    });
                }
                let mut pubkey = [0u8; 32];
                pubkey.copy_from_slice(pubkey_bytes);
                verify_ed25519(&pubkey, &ctx.tx.signing_digest(), sig_bytes)
            }
            Proposition::HeightProposition { min_height } => {
                if ctx.height >= *min_height {
                    Ok(())
                } else {
                    Err(TxError::UnlockFailed {
                        index: 0,
                        reason: format!(
                            "box locked until height {}, current height {}",
                            min_height, ctx.height
                        ),
                    })
                }
            }
        }
    }
}

fn nyx_sha256(data: &[u8]) -> Result<[u8; 32], TxError> {
    use dcrypt::algorithms::hash::sha2::Sha256;
    use dcrypt::algorithms::hash::HashFunction;
    use dcrypt::algorithms::ByteSerializable;
    let digest = Sha256::digest(data)
        .map_err(dcrypt::Error::from)
        .map_err(|e| TxError::Malformed(e.to_string()))?;
    digest
        .to_bytes()
        .try_into()
        .map_err(|_| TxError::Malformed("sha256 digest not 32 bytes".into()))
}

fn verify_ed25519(pubkey: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<(), TxError> {
    use dcrypt::api::Signature as _;
    use dcrypt::sign::eddsa::{self, Ed25519PublicKey, Ed25519Signature};

    let pk = Ed25519PublicKey::from_bytes(pubkey)
        .map_err(|e| TxError::InvalidSignature(format!("invalid pubkey: {e:?}")))?;
    let sig = Ed25519Signature::from_bytes(signature)
        .map_err(|e| TxError::InvalidSignature(format!("invalid signature encoding: {e:?}")))?;
    eddsa::Ed25519::verify(message, &sig, &pk)
        .map_err(|_| TxError::InvalidSignature("ed25519 verification failed".into()))
}
