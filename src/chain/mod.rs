//! Chain integration subsystem (origination path).
//!
//! # Data Flow
//! ```text
//! TransactionSpec
//!     → transaction.rs (shape check, instruction data, message compile)
//!     → submit.rs (resolve signers, stamp blockhash, sign)
//!     → client.rs (sendTransaction to the primary endpoint, with timeout)
//!     → signature | classified error
//! ```
//!
//! Reads such as `getLatestBlockhash` fail over across endpoints; a send
//! is never retried on another endpoint.
//!
//! # Security Constraints
//! - Secret keys ONLY from environment variables
//! - Never log secret keys
//! - All RPC calls have configurable timeouts
//! - A partially signed transaction is never sent

pub mod client;
pub mod submit;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{ChainRpc, RpcClient};
pub use submit::Submitter;
pub use transaction::{ShieldAccounts, TransactionSpec, TxBuilder, UnsignedTransaction};
pub use types::{ChainConfig, ChainError, Commitment, Hash, Pubkey, Signature};
pub use wallet::{keypair_from_base58, keypair_from_env, SignerHandle, SignerSet};
