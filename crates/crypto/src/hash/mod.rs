// Path: crates/crypto/src/hash/mod.rs
//! Hash functions used for modifier identity and the authenticated
//! dictionary's root digest.
//!
//! `sha256` backs [`nyx_types::boxes::derive_box_id`] and modifier-id
//! derivation; `blake2b256` backs the PBAVL node digests in `nyx-state`,
//! matching the "parametric in a cryptographic hash" wording in the spec's
//! purpose-and-scope section — the AD commitment scheme is not tied to one
//! hash, but the workspace picks one per use.

use nyx_types::error::CryptoError;

/// A hash function that reduces an arbitrary byte string to a fixed-width
/// digest. Implemented for the two primitives the node uses; new
/// implementations are added here rather than scattered across crates.
pub trait HashFunction {
    /// The digest width in bytes.
    const OUTPUT_LEN: usize;

    /// Hashes `data`, returning the digest.
    fn digest(data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// SHA-256, used for box-id and modifier-id derivation.
pub struct Sha256;

impl HashFunction for Sha256 {
    const OUTPUT_LEN: usize = 32;

    fn digest(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use dcrypt::algorithms::hash::sha2::Sha256 as DcryptSha256;
        use dcrypt::algorithms::hash::HashFunction as _;
        use dcrypt::algorithms::ByteSerializable;

        let digest = DcryptSha256::digest(data).map_err(dcrypt::Error::from)?;
        Ok(digest.to_bytes())
    }
}

/// BLAKE2b, truncated to 256 bits, used for the AD's node digests.
pub struct Blake2b256;

impl HashFunction for Blake2b256 {
    const OUTPUT_LEN: usize = 32;

    fn digest(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use dcrypt::algorithms::hash::blake2::Blake2b;
        use dcrypt::algorithms::hash::HashFunction as _;
        use dcrypt::algorithms::ByteSerializable;

        let digest = Blake2b::digest(data).map_err(dcrypt::Error::from)?;
        let mut full = digest.to_bytes();
        full.truncate(32);
        Ok(full)
    }
}

/// Hashes `data` with SHA-256 and returns a fixed-size array.
pub fn sha256(data: &[u8]) -> Result<[u8; 32], CryptoError> {
    fixed::<Sha256>(data)
}

/// Hashes `data` with BLAKE2b-256 and returns a fixed-size array.
pub fn blake2b256(data: &[u8]) -> Result<[u8; 32], CryptoError> {
    fixed::<Blake2b256>(data)
}

fn fixed<H: HashFunction>(data: &[u8]) -> Result<[u8; 32], CryptoError> {
    let bytes = H::digest(data)?;
    bytes
        .try_into()
        .map_err(|got: Vec<u8>| CryptoError::InvalidHashLength {
            expected: 32,
            got: got.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_deterministic_and_sensitive_to_input() {
        let a = sha256(b"nyx").expect("hash");
        let b = sha256(b"nyx").expect("hash");
        let c = sha256(b"nyx ").expect("hash");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn blake2b256_is_deterministic_and_sensitive_to_input() {
        let a = blake2b256(b"nyx-state-root").expect("hash");
        let b = blake2b256(b"nyx-state-root").expect("hash");
        let c = blake2b256(b"nyx-state-roo").expect("hash");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn sha256_and_blake2b256_disagree() {
        let a = sha256(b"nyx").expect("hash");
        let b = blake2b256(b"nyx").expect("hash");
        assert_ne!(a, b);
    }
}
