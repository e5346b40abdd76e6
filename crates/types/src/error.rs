//! Core error types for the Nyx node.
//!
//! Every domain error implements [`ErrorCode`] so that any layer presenting
//! errors externally (logs, an eventual HTTP API) can attach a stable,
//! machine-readable string without matching on the error's `Display` text.
//! Each domain error also classifies itself into one of the propagation
//! kinds from the error-handling design: [`Kind::Malformed`],
//! [`Kind::SemanticInvalid`], [`Kind::StateInvalid`], [`Kind::NotApplicable`],
//! [`Kind::Transient`], [`Kind::Fatal`].

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The propagation class an error belongs to, per the error-handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Parse/structural failure at ingress.
    Malformed,
    /// Signature, balance, or duplicate-input failure.
    SemanticInvalid,
    /// Unknown input, proof mismatch, or digest mismatch against current state.
    StateInvalid,
    /// The modifier's prerequisite is not yet known; it should be queued.
    NotApplicable,
    /// I/O or store failure; the caller may retry a bounded number of times.
    Transient,
    /// An invariant was violated; the process must abort and recover from disk.
    Fatal,
}

/// Errors from cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The signature failed cryptographic verification.
    #[error("signature verification failed")]
    VerificationFailed,
    /// The provided key material is malformed or invalid for the algorithm.
    #[error("invalid cryptographic key: {0}")]
    InvalidKey(String),
    /// The provided signature material is malformed or invalid.
    #[error("invalid signature format: {0}")]
    InvalidSignature(String),
    /// A hash digest had an unexpected length.
    #[error("invalid hash length: expected {expected}, got {got}")]
    InvalidHashLength {
        /// The expected length in bytes.
        expected: usize,
        /// The actual length in bytes.
        got: usize,
    },
    /// A generic failure in the underlying cryptographic library.
    #[error("cryptographic operation failed: {0}")]
    OperationFailed(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::VerificationFailed => "CRYPTO_VERIFICATION_FAILED",
            Self::InvalidKey(_) => "CRYPTO_INVALID_KEY",
            Self::InvalidSignature(_) => "CRYPTO_INVALID_SIGNATURE",
            Self::InvalidHashLength { .. } => "CRYPTO_INVALID_HASH_LENGTH",
            Self::OperationFailed(_) => "CRYPTO_OPERATION_FAILED",
        }
    }
}

impl From<dcrypt::Error> for CryptoError {
    fn from(e: dcrypt::Error) -> Self {
        CryptoError::OperationFailed(e.to_string())
    }
}

/// Errors related to the state tree / Authenticated State Engine.
#[derive(Error, Debug)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("key not found in state")]
    KeyNotFound,
    /// An error occurred in the state backend (tree or store).
    #[error("state backend error: {0}")]
    Backend(String),
    /// An error occurred while encoding/decoding a tree node or proof.
    #[error("state codec error: {0}")]
    Decode(String),
    /// The post-apply digest did not match the header's declared `stateRoot`.
    #[error("digest mismatch: expected {expected}, got {got}")]
    DigestMismatch {
        /// The header's declared `stateRoot`, hex-encoded.
        expected: String,
        /// The digest actually produced by applying the payload, hex-encoded.
        got: String,
    },
    /// The hash of the produced AD-proof did not match `header.adProofsRoot`.
    #[error("AD-proof hash mismatch")]
    ProofHashMismatch,
    /// The requested rollback version is not within the retained window.
    #[error("version {0} is outside the retained rollback window")]
    NotApplicableVersion(String),
    /// An invariant between the prover digest and the store's rollback
    /// versions was violated; this should never happen.
    #[error("fatal state invariant violation: {0}")]
    Invariant(String),
    /// A transaction failed validation while being applied against the state.
    #[error(transparent)]
    TxValidation(#[from] TxError),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "STATE_KEY_NOT_FOUND",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::Decode(_) => "STATE_DECODE_ERROR",
            Self::DigestMismatch { .. } => "STATE_DIGEST_MISMATCH",
            Self::ProofHashMismatch => "STATE_PROOF_HASH_MISMATCH",
            Self::NotApplicableVersion(_) => "STATE_VERSION_NOT_APPLICABLE",
            Self::Invariant(_) => "STATE_FATAL_INVARIANT",
            Self::TxValidation(e) => e.code(),
        }
    }
}

impl StateError {
    /// Classifies this error per the error-handling design.
    pub fn kind(&self) -> Kind {
        match self {
            Self::KeyNotFound | Self::Decode(_) => Kind::Malformed,
            Self::DigestMismatch { .. } | Self::ProofHashMismatch => Kind::StateInvalid,
            Self::NotApplicableVersion(_) => Kind::NotApplicable,
            Self::Backend(_) => Kind::Transient,
            Self::Invariant(_) => Kind::Fatal,
            Self::TxValidation(e) => match e.kind() {
                Kind::Malformed => Kind::Malformed,
                _ => Kind::StateInvalid,
            },
        }
    }
}

/// Errors related to transaction validation.
#[derive(Error, Debug)]
pub enum TxError {
    /// The transaction failed a structural/parse check.
    #[error("malformed transaction: {0}")]
    Malformed(String),
    /// The transaction's signature did not verify.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// The transaction's fee was below the configured minimum.
    #[error("fee {got} below minimum {min}")]
    FeeTooLow {
        /// The fee attached to the transaction.
        got: u64,
        /// The minimum fee required.
        min: u64,
    },
    /// A referenced input box does not exist in the current state.
    #[error("unknown input box: {0}")]
    UnknownInput(String),
    /// A proposition's `unlock` check failed for one of the transaction's inputs.
    #[error("unlock failed for input {index}: {reason}")]
    UnlockFailed {
        /// The index of the failing unlocker within the transaction.
        index: usize,
        /// A description of the failure.
        reason: String,
    },
    /// The sum of spent amounts for an asset id was less than the sum created.
    #[error("balance violation for asset {asset}: spent {spent}, created {created}")]
    BalanceViolation {
        /// Hex-encoded asset id.
        asset: String,
        /// Total amount spent on this asset id.
        spent: u64,
        /// Total amount created on this asset id.
        created: u64,
    },
    /// Two inputs within the same transaction reference the same box id.
    #[error("duplicate input box id: {0}")]
    DuplicateInput(String),
    /// Amount arithmetic overflowed while summing inputs or outputs.
    #[error("amount overflow")]
    AmountOverflow,
}

impl ErrorCode for TxError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "TX_MALFORMED",
            Self::InvalidSignature(_) => "TX_INVALID_SIGNATURE",
            Self::FeeTooLow { .. } => "TX_FEE_TOO_LOW",
            Self::UnknownInput(_) => "TX_UNKNOWN_INPUT",
            Self::UnlockFailed { .. } => "TX_UNLOCK_FAILED",
            Self::BalanceViolation { .. } => "TX_BALANCE_VIOLATION",
            Self::DuplicateInput(_) => "TX_DUPLICATE_INPUT",
            Self::AmountOverflow => "TX_AMOUNT_OVERFLOW",
        }
    }
}

impl TxError {
    /// Classifies this error per the error-handling design. Every `TxError`
    /// variant is either a structural `Malformed` failure or a
    /// `SemanticInvalid` one; state-dependent failures like `UnknownInput`
    /// are reported as `SemanticInvalid` here but are promoted to
    /// `StateInvalid` by `nyx-state` when they occur post-acceptance.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Malformed(_) => Kind::Malformed,
            _ => Kind::SemanticInvalid,
        }
    }
}

/// Errors related to header/payload/chain processing in the History Engine.
#[derive(Error, Debug)]
pub enum ChainError {
    /// The header failed a structural check.
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    /// The header's parent id does not resolve to a stored header.
    #[error("unknown parent: {0}")]
    UnknownParent(String),
    /// The header's timestamp was not strictly greater than its parent's,
    /// or fell outside the allowed network-time skew.
    #[error("invalid timestamp")]
    InvalidTimestamp,
    /// The header's difficulty did not match the recomputed target.
    #[error("difficulty mismatch: expected {expected}, got {got}")]
    DifficultyMismatch {
        /// The recomputed target difficulty.
        expected: u64,
        /// The difficulty declared in the header.
        got: u64,
    },
    /// The header's PoW hash exceeded its declared target.
    #[error("proof of work does not satisfy target")]
    PowNotSatisfied,
    /// The header's signature did not verify under `minerPubKey`.
    #[error("invalid header signature")]
    InvalidSignature,
    /// The block's serialized size exceeded `BlockMaxSize`.
    #[error("block size {got} exceeds maximum {max}")]
    BlockTooLarge {
        /// The block's actual serialized size.
        got: usize,
        /// The configured maximum.
        max: usize,
    },
    /// An error from the state layer propagated during block application.
    #[error(transparent)]
    State(#[from] StateError),
    /// An error from transaction validation propagated during block application.
    #[error(transparent)]
    Tx(#[from] TxError),
    /// The history store reported a persistence failure.
    #[error("history store error: {0}")]
    Storage(String),
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedHeader(_) => "CHAIN_MALFORMED_HEADER",
            Self::UnknownParent(_) => "CHAIN_UNKNOWN_PARENT",
            Self::InvalidTimestamp => "CHAIN_INVALID_TIMESTAMP",
            Self::DifficultyMismatch { .. } => "CHAIN_DIFFICULTY_MISMATCH",
            Self::PowNotSatisfied => "CHAIN_POW_NOT_SATISFIED",
            Self::InvalidSignature => "CHAIN_INVALID_SIGNATURE",
            Self::BlockTooLarge { .. } => "CHAIN_BLOCK_TOO_LARGE",
            Self::State(e) => e.code(),
            Self::Tx(e) => e.code(),
            Self::Storage(_) => "CHAIN_STORAGE_ERROR",
        }
    }
}

impl ChainError {
    /// Classifies this error per the error-handling design.
    pub fn kind(&self) -> Kind {
        match self {
            Self::MalformedHeader(_) | Self::BlockTooLarge { .. } => Kind::Malformed,
            Self::UnknownParent(_) => Kind::NotApplicable,
            Self::InvalidTimestamp
            | Self::DifficultyMismatch { .. }
            | Self::PowNotSatisfied
            | Self::InvalidSignature => Kind::SemanticInvalid,
            Self::State(e) => e.kind(),
            Self::Tx(e) => match e.kind() {
                Kind::Malformed => Kind::Malformed,
                _ => Kind::StateInvalid,
            },
            Self::Storage(_) => Kind::Transient,
        }
    }
}

/// Errors from mempool admission.
#[derive(Error, Debug)]
pub enum MempoolError {
    /// The transaction failed the same validation a block application would run.
    #[error(transparent)]
    Tx(#[from] TxError),
    /// A transaction with this id is already pooled.
    #[error("transaction already present in the pool")]
    Duplicate,
    /// One of this transaction's inputs is already claimed by a pooled transaction.
    #[error("input already claimed by a pooled transaction: {0}")]
    DoubleSpend(String),
    /// The pool is at capacity and the incoming transaction's fee does not
    /// exceed the lowest-fee transaction currently pooled.
    #[error("pool is full at capacity {capacity}")]
    PoolFull {
        /// The pool's configured maximum size.
        capacity: usize,
    },
}

impl ErrorCode for MempoolError {
    fn code(&self) -> &'static str {
        match self {
            Self::Tx(e) => e.code(),
            Self::Duplicate => "MEMPOOL_DUPLICATE",
            Self::DoubleSpend(_) => "MEMPOOL_DOUBLE_SPEND",
            Self::PoolFull { .. } => "MEMPOOL_FULL",
        }
    }
}

impl MempoolError {
    /// Classifies this error per the error-handling design.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Tx(e) => match e.kind() {
                Kind::Malformed => Kind::Malformed,
                _ => Kind::SemanticInvalid,
            },
            Self::Duplicate | Self::DoubleSpend(_) => Kind::SemanticInvalid,
            Self::PoolFull { .. } => Kind::Transient,
        }
    }
}

/// Errors related to consensus and candidate-block assembly.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// The state or history snapshot needed for assembly could not be read.
    #[error("snapshot unavailable: {0}")]
    SnapshotUnavailable(String),
    /// Building the coinbase transaction failed.
    #[error("coinbase assembly failed: {0}")]
    CoinbaseAssembly(String),
    /// `proofsForTransactions` failed while assembling a candidate.
    #[error(transparent)]
    State(#[from] StateError),
    /// Deriving an id, hashing a digest, or signing the header pre-hash failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// A history-engine query needed to resolve the parent/difficulty failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// No miner key is configured; mining cannot proceed.
    #[error("no miner key configured")]
    NoMinerKey,
}

impl ErrorCode for ConsensusError {
    fn code(&self) -> &'static str {
        match self {
            Self::SnapshotUnavailable(_) => "CONSENSUS_SNAPSHOT_UNAVAILABLE",
            Self::CoinbaseAssembly(_) => "CONSENSUS_COINBASE_ASSEMBLY_FAILED",
            Self::State(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Chain(e) => e.code(),
            Self::NoMinerKey => "CONSENSUS_NO_MINER_KEY",
        }
    }
}

impl ConsensusError {
    /// Candidate-assembly failures are never fatal: they are logged and
    /// retried on the next trigger.
    pub fn kind(&self) -> Kind {
        Kind::Transient
    }
}

/// The top-level error returned by the Node View Orchestrator, unifying every
/// domain error so a single propagation policy can be applied at the point
/// where modifiers are accepted from the outside world.
#[derive(Error, Debug)]
pub enum NodeError {
    /// A chain/header/payload processing error.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// A state engine error.
    #[error(transparent)]
    State(#[from] StateError),
    /// A transaction validation error.
    #[error(transparent)]
    Tx(#[from] TxError),
    /// A consensus/mining error.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    /// A cryptographic error.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// A mempool admission error.
    #[error(transparent)]
    Mempool(#[from] MempoolError),
}

impl ErrorCode for NodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Chain(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Tx(e) => e.code(),
            Self::Consensus(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Mempool(e) => e.code(),
        }
    }
}

impl NodeError {
    /// Classifies this error per the error-handling design.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Chain(e) => e.kind(),
            Self::State(e) => e.kind(),
            Self::Tx(e) => match e.kind() {
                Kind::Malformed => Kind::Malformed,
                _ => Kind::SemanticInvalid,
            },
            Self::Consensus(e) => e.kind(),
            Self::Crypto(_) => Kind::SemanticInvalid,
            Self::Mempool(e) => e.kind(),
        }
    }
}
