// Path: crates/crypto/src/sign/mod.rs
//! Ed25519 signing and verification, used for header and transaction
//! signatures (`minerPubKey`/`signature`, `proposition.pubkey`/unlocker
//! proofs) throughout the workspace.

use dcrypt::api::Signature as _;
use dcrypt::sign::eddsa::{self, Ed25519PublicKey, Ed25519SecretKey, Ed25519Signature};
use nyx_types::error::CryptoError;
use rand::rngs::OsRng;
use zeroize::Zeroize;

/// An Ed25519 keypair. The secret key's seed is zeroized on drop.
pub struct Ed25519KeyPair {
    public: [u8; 32],
    secret: Ed25519SecretKey,
}

impl Ed25519KeyPair {
    /// Generates a fresh keypair from the OS RNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut rng = OsRng;
        let (public, secret) = eddsa::Ed25519::keypair(&mut rng)
            .map_err(|e| CryptoError::OperationFailed(format!("keypair generation: {e:?}")))?;
        Ok(Self {
            public: public_bytes(&public)?,
            secret,
        })
    }

    /// Reconstructs a keypair from a 32-byte seed, e.g. loaded from a
    /// miner's key file.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = Ed25519SecretKey::from_seed(seed)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid seed: {e:?}")))?;
        let public = secret
            .public_key()
            .map_err(|e| CryptoError::InvalidKey(format!("deriving public key: {e:?}")))?;
        Ok(Self {
            public: public_bytes(&public)?,
            secret,
        })
    }

    /// The raw 32-byte public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.public
    }

    /// Signs `message`, returning a 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64], CryptoError> {
        let sig = eddsa::Ed25519::sign(message, &self.secret)
            .map_err(|e| CryptoError::OperationFailed(format!("signing: {e:?}")))?;
        signature_bytes(&sig)
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        self.public.zeroize();
    }
}

/// Verifies a 64-byte Ed25519 `signature` over `message` under `pubkey`.
pub fn verify(pubkey: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let pk = Ed25519PublicKey::from_bytes(pubkey)
        .map_err(|e| CryptoError::InvalidKey(format!("invalid public key: {e:?}")))?;
    let sig = Ed25519Signature::from_bytes(signature)
        .map_err(|e| CryptoError::InvalidSignature(format!("invalid signature encoding: {e:?}")))?;
    eddsa::Ed25519::verify(message, &sig, &pk).map_err(|_| CryptoError::VerificationFailed)
}

fn public_bytes(key: &Ed25519PublicKey) -> Result<[u8; 32], CryptoError> {
    key.to_bytes()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey("public key not 32 bytes".into()))
}

fn signature_bytes(sig: &Ed25519Signature) -> Result<[u8; 64], CryptoError> {
    sig.to_bytes()
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature("signature not 64 bytes".into()))
}
