//! Block headers and payloads, and the authenticated-dictionary digest and
//! proof types a header's `stateRoot`/`adProofsRoot` commit to.

use crate::error::CryptoError;
use crate::ids::{Height, ModifierId};
use crate::tx::Transaction;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

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

/// The authenticated dictionary's root commitment: a 32-byte root hash plus
/// the tree's height, encoded as a single byte per the glossary.
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ADDigest(pub [u8; 33]);

impl ADDigest {
    /// Builds a digest from a root hash and tree height.
    pub fn new(root_hash: [u8; 32], tree_height: u8) -> Self {
        let mut bytes = [0u8; 33];
        bytes[..32].copy_from_slice(&root_hash);
        bytes[32] = tree_height;
        Self(bytes)
    }

    /// The 32-byte root hash component.
    pub fn root_hash(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[..32]);
        out
    }

    /// The tree-height component.
    pub fn tree_height(&self) -> u8 {
        self.0[32]
    }

    /// Hashes this digest's bytes, used as the key into the state store's
    /// `hash(stateRoot) -> versionId` reverse index.
    pub fn hash(&self) -> Result<[u8; 32], CryptoError> {
        sha256(&self.0)
    }
}

impl fmt::Debug for ADDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADDigest({})", hex::encode(self.0))
    }
}

/// A serialized proof sequence witnessing a batch of authenticated-dictionary
/// insertions/removals that produced one [`ADDigest`] from another.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ADProof(pub Vec<u8>);

impl ADProof {
    /// The hash committed to by a header's `adProofsRoot`.
    pub fn hash(&self) -> Result<[u8; 32], CryptoError> {
        sha256(&self.0)
    }
}

/// A block header: the consensus-critical unit headers form a DAG over.
///
/// Self-identifies via [`BlockHeader::id`], the hash of its full canonical
/// encoding (including `nonce` and `signature`). The message actually signed
/// by `minerPubKey`, and the one nonce search iterates over, is
/// [`BlockHeader::pre_hash`] — the encoding of every field *except* `nonce`
/// and `signature`.
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// The wire/format version of this header.
    pub version: u8,
    /// The parent header's id, or `None` only for genesis.
    pub parent_id: Option<ModifierId>,
    /// The Authenticated State Engine's digest after applying this header's
    /// payload to the state at `parent_id`'s digest.
    pub state_root: ADDigest,
    /// The hash of the [`ADProof`] justifying the `state_root` transition.
    pub ad_proofs_root: [u8; 32],
    /// The hash of the ordered transaction ids in this header's payload.
    pub transactions_root: [u8; 32],
    /// Strictly greater than the parent's timestamp, within allowed skew.
    pub timestamp: u64,
    /// Chain height; genesis is `0`.
    pub height: Height,
    /// The proof-of-work target this header's `pow_hash` must not exceed.
    pub difficulty: u64,
    /// The value the mining worker searched for.
    pub nonce: u64,
    /// The Ed25519 public key this header's `signature` must verify under.
    pub miner_pub_key: [u8; 32],
    /// Signature over [`BlockHeader::pre_hash`] by the miner's secret key.
    pub signature: [u8; 64],
}

impl BlockHeader {
    /// The canonical encoding of every field except `nonce` and `signature`:
    /// the message the miner signs and the nonce search hashes alongside
    /// each candidate nonce.
    pub fn pre_hash(&self) -> Result<[u8; 32], CryptoError> {
        let mut preimage = Vec::new();
        preimage.push(self.version);
        preimage.extend_from_slice(&self.parent_id.map_or([0u8; 32], |id| *id.as_bytes()));
        preimage.push(self.parent_id.is_some() as u8);
        preimage.extend_from_slice(&self.state_root.0);
        preimage.extend_from_slice(&self.ad_proofs_root);
        preimage.extend_from_slice(&self.transactions_root);
        preimage.extend_from_slice(&self.timestamp.to_le_bytes());
        preimage.extend_from_slice(&self.height.to_le_bytes());
        preimage.extend_from_slice(&self.difficulty.to_le_bytes());
        preimage.extend_from_slice(&self.miner_pub_key);
        sha256(&preimage)
    }

    /// The proof-of-work hash: `pre_hash` combined with `nonce`. A header is
    /// proof-of-work-valid iff this, read as a big-endian integer, is no
    /// greater than the target derived from `difficulty`.
    pub fn pow_hash(&self) -> Result<[u8; 32], CryptoError> {
        let mut preimage = self.pre_hash()?.to_vec();
        preimage.extend_from_slice(&self.nonce.to_le_bytes());
        sha256(&preimage)
    }

    /// Whether `pow_hash` satisfies `difficulty`, using the leading 8 bytes
    /// of the hash (big-endian) scaled against `u64::MAX`.
    pub fn satisfies_difficulty(&self) -> Result<bool, CryptoError> {
        let hash = self.pow_hash()?;
        let mut leading = [0u8; 8];
        leading.copy_from_slice(&hash[..8]);
        let value = u64::from_be_bytes(leading);
        let target = u64::MAX / self.difficulty.max(1);
        Ok(value <= target)
    }

    /// This header's [`ModifierId`]: the hash of its full canonical
    /// encoding, including `nonce` and `signature`.
    pub fn id(&self) -> Result<ModifierId, CryptoError> {
        let mut preimage = self.pre_hash()?.to_vec();
        preimage.extend_from_slice(&self.nonce.to_le_bytes());
        preimage.extend_from_slice(&self.signature);
        Ok(ModifierId::new(sha256(&preimage)?))
    }
}

/// A block's transaction sequence, back-referencing the header it belongs to.
/// Present in storage iff the referenced header is marked "full".
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    /// The header this payload completes.
    pub header_id: ModifierId,
    /// Transactions in block order; by convention the last one is the
    /// coinbase transaction when one is present.
    pub transactions: Vec<Transaction>,
}

impl BlockPayload {
    /// This payload's [`ModifierId`]: the hash of its canonical encoding.
    pub fn id(&self) -> Result<ModifierId, CryptoError> {
        let mut preimage = self.header_id.as_bytes().to_vec();
        for tx in &self.transactions {
            preimage.extend_from_slice(tx.id()?.as_bytes());
        }
        Ok(ModifierId::new(sha256(&preimage)?))
    }

    /// The hash a header's `transactions_root` commits to: the hash of the
    /// ordered sequence of transaction ids.
    pub fn transactions_root(&self) -> Result<[u8; 32], CryptoError> {
        let mut preimage = Vec::new();
        for tx in &self.transactions {
            preimage.extend_from_slice(tx.id()?.as_bytes());
        }
        sha256(&preimage)
    }

    /// Whether exactly one transaction in this payload is a coinbase
    /// transaction, per the single-coinbase-per-block invariant.
    pub fn has_single_coinbase(&self) -> bool {
        self.transactions.iter().filter(|tx| tx.is_coinbase()).count() == 1
    }
}
