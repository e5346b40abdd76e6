//! UTXO boxes: the units the Authenticated State Engine stores and spends.

use crate::proposition::Proposition;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 33-byte box identifier: one type-tag byte plus a 32-byte content hash,
/// per the glossary.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub [u8; 33]);

impl BoxId {
    /// Builds a box id from a type tag and a 32-byte content hash.
    pub fn new(type_tag: u8, content_hash: [u8; 32]) -> Self {
        let mut bytes = [0u8; 33];
        bytes[0] = type_tag;
        bytes[1..].copy_from_slice(&content_hash);
        Self(bytes)
    }

    /// The type tag this box id was minted with.
    pub fn type_tag(&self) -> u8 {
        self.0[0]
    }
}

impl AsRef<[u8]> for BoxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxId({})", hex::encode(self.0))
    }
}

/// Identifies which fungible unit an amount is denominated in.
///
/// The intrinsic coin id is four `0xFF` bytes per the balance-check rule in
/// the Authenticated State Engine; anything else is an explicit 32-byte
/// token id.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum AssetId {
    /// The chain's native coin.
    Intrinsic,
    /// A user-issued token, identified by its minting transaction's digest.
    Token([u8; 32]),
}

impl AssetId {
    /// The four `0xFF` bytes used to key the intrinsic coin id on the wire.
    pub const INTRINSIC_TAG: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
}

/// A locked coinbase output: unlockable only once `current_height >=
/// height_lock`, and only by whoever holds the private key behind `pubkey`
/// (the miner who minted it), enforcing coinbase maturity and ownership
/// together.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseBox {
    /// The height at which this box becomes spendable.
    pub height_lock: u64,
    /// Disambiguates boxes minted with identical amount/height within one
    /// coinbase transaction.
    pub nonce: u64,
    /// The amount of intrinsic coin this box carries.
    pub amount: u64,
    /// The miner's Ed25519 public key; only a signature verifying under
    /// this key may spend the box.
    pub pubkey: [u8; 32],
}

/// A general-purpose value box guarded by a spending condition.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBox {
    /// The amount this box carries, denominated in `asset`.
    pub amount: u64,
    /// Which fungible unit `amount` is denominated in.
    pub asset: AssetId,
    /// The condition that must be satisfied to spend this box.
    pub proposition: Proposition,
}

/// A box recording a public key's association with account metadata, used by
/// `PublicKey25519`/`AddressProposition` unlock checks that need to resolve a
/// key independently of the spending transaction's signature.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyInfoBox {
    /// The raw Ed25519 public key.
    pub pubkey: [u8; 32],
}

/// The union of box variants the Authenticated State Engine can store.
/// Dispatch over variants is exhaustive-match on the discriminant rather
/// than dynamic dispatch, per the tagged-sum-type design note.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Box {
    /// A spendable value box.
    Asset(AssetBox),
    /// A height-locked coinbase output.
    Coinbase(CoinbaseBox),
    /// A public-key registration box.
    PubKeyInfo(PubKeyInfoBox),
}

impl Box {
    /// The wire type tag for this box variant, used as the first byte of its
    /// [`BoxId`].
    pub fn type_tag(&self) -> u8 {
        match self {
            Box::Asset(_) => 0x01,
            Box::Coinbase(_) => 0x02,
            Box::PubKeyInfo(_) => 0x03,
        }
    }

    /// The proposition guarding this box, if it has one. Coinbase boxes are
    /// guarded by their own `pubkey` field plus the height lock, checked
    /// directly in `nyx-tx`'s `unlock_one` rather than through a
    /// `Proposition`.
    pub fn proposition(&self) -> Option<&Proposition> {
        match self {
            Box::Asset(b) => Some(&b.proposition),
            Box::Coinbase(_) | Box::PubKeyInfo(_) => None,
        }
    }

    /// The intrinsic-coin-denominated amount carried by this box, or `None`
    /// if it carries none (e.g. a [`PubKeyInfoBox`]), used by the balance
    /// check keyed on [`AssetId`].
    pub fn amount_for(&self, asset: AssetId) -> u64 {
        match self {
            Box::Asset(b) if b.asset == asset => b.amount,
            Box::Coinbase(b) if asset == AssetId::Intrinsic => b.amount,
            _ => 0,
        }
    }
}

/// Derives the [`BoxId`] for a box created at a given output index of a
/// creating transaction, so that boxes with identical content but different
/// positions never collide.
pub fn derive_box_id(
    creating_tx: crate::ModifierId,
    index: u32,
    box_value: &Box,
) -> Result<BoxId, crate::error::StateError> {
    let mut preimage = creating_tx.as_bytes().to_vec();
    preimage.extend_from_slice(&index.to_le_bytes());
    preimage.extend_from_slice(
        &crate::codec::to_bytes_canonical(box_value)
            .map_err(crate::error::StateError::Decode)?,
    );
    let digest = dcrypt::algorithms::hash::sha2::Sha256::digest(&preimage)
        .map_err(dcrypt::Error::from)
        .map_err(|e| crate::error::StateError::Backend(e.to_string()))?;
    let bytes: [u8; 32] = dcrypt::algorithms::ByteSerializable::to_bytes(&digest)
        .try_into()
        .map_err(|_| crate::error::StateError::Backend("sha256 digest not 32 bytes".into()))?;
    Ok(BoxId::new(box_value.type_tag(), bytes))
}
