//! Signer handles and key loading.
//!
//! # Security
//! - Secret keys are loaded ONLY from environment variables or caller-supplied bytes
//! - Keys are never logged or serialized
//! - Callers see signers through the SDK's `Signer` trait, never the raw key

use std::sync::Arc;

use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::keypair::keypair_from_seed;

use crate::chain::types::{ChainError, ChainResult, Pubkey};

/// Environment variable holding the fee payer's base58 secret key.
pub const FEE_PAYER_KEY_ENV_VAR: &str = "RELAY_FEE_PAYER_KEY";

/// Environment variable holding the shield maker's base58 secret key.
pub const SHIELD_MAKER_KEY_ENV_VAR: &str = "RELAY_SHIELD_MAKER_KEY";

/// A signing handle usable from any task.
pub type SignerHandle = Arc<dyn Signer + Send + Sync>;

/// Parse a base58 secret key.
///
/// Accepts the 64-byte `secret || public` export format used by cluster
/// tooling as well as a bare 32-byte seed. For the 64-byte form the
/// embedded public half must match the derived key.
pub fn keypair_from_base58(secret: &str) -> ChainResult<Keypair> {
    let bytes = bs58::decode(secret.trim())
        .into_vec()
        .map_err(|e| ChainError::InvalidKey(format!("Invalid secret key encoding: {}", e)))?;

    let (seed, public) = match bytes.len() {
        64 => (&bytes[..32], Some(&bytes[32..])),
        32 => (&bytes[..], None),
        n => {
            return Err(ChainError::InvalidKey(format!(
                "Invalid secret key length: expected 64 or 32 bytes, got {}",
                n
            )))
        }
    };

    let keypair = keypair_from_seed(seed)
        .map_err(|e| ChainError::InvalidKey(format!("Invalid secret seed: {}", e)))?;
    if let Some(public) = public {
        if keypair.pubkey().as_ref() != public {
            return Err(ChainError::InvalidKey(
                "Secret key does not match its embedded public key".to_string(),
            ));
        }
    }

    tracing::info!(pubkey = %keypair.pubkey(), "Keypair loaded");
    Ok(keypair)
}

/// Load a keypair from the named environment variable.
pub fn keypair_from_env(var: &str) -> ChainResult<Keypair> {
    let secret = std::env::var(var)
        .map_err(|_| ChainError::InvalidKey(format!("Environment variable {} not set", var)))?;
    keypair_from_base58(&secret)
}

/// The signer handles available to a submission. Read-only while in use.
#[derive(Clone, Default)]
pub struct SignerSet {
    signers: Vec<SignerHandle>,
}

impl SignerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, signer: SignerHandle) -> Self {
        self.signers.push(signer);
        self
    }

    /// Find the handle for a public identity. Linear scan; signer sets are small.
    pub fn resolve(&self, pubkey: &Pubkey) -> Option<&dyn Signer> {
        self.signers
            .iter()
            .find(|s| s.pubkey() == *pubkey)
            .map(|s| s.as_ref() as &dyn Signer)
    }

    pub fn pubkeys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|s| s.pubkey()).collect()
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

impl std::fmt::Debug for SignerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.pubkeys()).finish()
    }
}
