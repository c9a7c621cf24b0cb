//! Signing and submission of built transactions.
//!
//! Every required signature slot must resolve to a signer handle before
//! anything touches the network. Failures are classified and returned
//! without retry; retry policy belongs to the caller.

use std::sync::Arc;

use solana_sdk::signature::Signer;
use solana_sdk::transaction::Transaction;

use crate::chain::client::ChainRpc;
use crate::chain::transaction::UnsignedTransaction;
use crate::chain::types::{ChainError, ChainResult, Hash, Signature};
use crate::chain::wallet::SignerSet;
use crate::observability::metrics;

/// Sign with the given blockhash. Fails with `MissingSigner` on the first
/// required key that has no handle.
pub fn sign_transaction(
    tx: UnsignedTransaction,
    signers: &SignerSet,
    blockhash: Hash,
) -> ChainResult<Transaction> {
    let handles = resolve_signers(&tx, signers)?;
    let mut tx = tx.into_transaction();
    tx.try_sign(&handles, blockhash)
        .map_err(|e| ChainError::Signing(e.to_string()))?;
    Ok(tx)
}

fn resolve_signers<'a>(
    tx: &UnsignedTransaction,
    signers: &'a SignerSet,
) -> ChainResult<Vec<&'a dyn Signer>> {
    tx.required_signers()
        .iter()
        .map(|key| signers.resolve(key).ok_or(ChainError::MissingSigner(*key)))
        .collect()
}

/// Signs and submits transactions through a network handle.
#[derive(Clone)]
pub struct Submitter {
    rpc: Arc<dyn ChainRpc>,
}

impl Submitter {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self { rpc }
    }

    /// Sign `tx` with `signers` and submit it; returns the transaction signature.
    pub async fn submit(
        &self,
        tx: UnsignedTransaction,
        signers: &SignerSet,
    ) -> ChainResult<Signature> {
        // Resolve up front so a missing signer never costs a network round trip.
        if let Err(e) = resolve_signers(&tx, signers) {
            tracing::error!(error = %e, "Refusing to submit partially signed transaction");
            metrics::record_submission("missing_signer");
            return Err(e);
        }

        let result = async {
            let blockhash = self.rpc.get_latest_blockhash().await?;
            let signed = sign_transaction(tx, signers, blockhash)?;
            let local_sig = signed.signatures.first().copied().unwrap_or_default();
            let chain_sig = self.rpc.send_transaction(&signed).await?;
            if chain_sig != local_sig {
                tracing::warn!(
                    local = %local_sig,
                    returned = %chain_sig,
                    "Cluster returned a different signature than the one signed"
                );
            }
            Ok::<_, ChainError>(chain_sig)
        }
        .await;

        match &result {
            Ok(sig) => {
                tracing::info!(signature = %sig, "Transaction submitted");
                metrics::record_submission("ok");
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(error = %e, "Transaction submission failed: transport");
                metrics::record_submission("transport_error");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transaction submission rejected");
                metrics::record_submission("rejected");
            }
        }
        result
    }
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::transaction::tests::{builder, key, shield_spec};
    use async_trait::async_trait;
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::keypair::keypair_from_seed;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Accept,
        Reject,
        Drop,
    }

    struct MockRpc {
        reply: Reply,
        sends: AtomicU32,
        last_tx: Mutex<Option<Transaction>>,
    }

    impl MockRpc {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sends: AtomicU32::new(0),
                last_tx: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ChainRpc for MockRpc {
        async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
            Ok(Hash::new_from_array([7u8; 32]))
        }

        async fn send_transaction(&self, tx: &Transaction) -> ChainResult<Signature> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            *self.last_tx.lock().unwrap() = Some(tx.clone());
            match self.reply {
                Reply::Accept => Ok(tx.signatures[0]),
                Reply::Reject => Err(ChainError::SubmissionRejected {
                    code: -32002,
                    message: "insufficient funds".into(),
                }),
                Reply::Drop => Err(ChainError::Transport("connection reset".into())),
            }
        }
    }

    fn seeded(byte: u8) -> Arc<Keypair> {
        Arc::new(keypair_from_seed(&[byte; 32]).unwrap())
    }

    fn build(payer: &Keypair, maker: &Keypair) -> UnsignedTransaction {
        builder()
            .build(&shield_spec(payer.pubkey(), maker.pubkey()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_signs_all_positions() {
        let payer = seeded(1);
        let maker = seeded(2);
        let signers = SignerSet::new().with(maker.clone()).with(payer.clone());

        let rpc = MockRpc::new(Reply::Accept);
        let submitter = Submitter::new(rpc.clone());
        let sig = submitter.submit(build(&payer, &maker), &signers).await.unwrap();

        assert_eq!(rpc.sends.load(Ordering::SeqCst), 1);
        let sent = rpc.last_tx.lock().unwrap().clone().unwrap();

        // Blockhash was stamped before signing.
        assert_eq!(sent.message.recent_blockhash, Hash::new_from_array([7u8; 32]));
        assert_eq!(sent.signatures.len(), 2);
        let message = sent.message_data();
        for (slot, signer) in [payer.pubkey(), maker.pubkey()].iter().enumerate() {
            assert!(sent.signatures[slot].verify(signer.as_ref(), &message));
        }
        assert_eq!(sig, sent.signatures[0]);
    }

    #[tokio::test]
    async fn test_missing_signer_never_sends() {
        let payer = seeded(1);
        let maker = seeded(2);
        let signers = SignerSet::new().with(payer.clone());

        let rpc = MockRpc::new(Reply::Accept);
        let submitter = Submitter::new(rpc.clone());
        let err = submitter
            .submit(build(&payer, &maker), &signers)
            .await
            .unwrap_err();

        match err {
            ChainError::MissingSigner(k) => assert_eq!(k, maker.pubkey()),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(rpc.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejection_and_transport_are_distinct() {
        let payer = seeded(1);
        let maker = seeded(2);
        let signers = SignerSet::new().with(payer.clone()).with(maker.clone());

        let rejected = Submitter::new(MockRpc::new(Reply::Reject))
            .submit(build(&payer, &maker), &signers)
            .await
            .unwrap_err();
        assert!(matches!(rejected, ChainError::SubmissionRejected { .. }));
        assert!(!rejected.is_transport());

        let dropped = Submitter::new(MockRpc::new(Reply::Drop))
            .submit(build(&payer, &maker), &signers)
            .await
            .unwrap_err();
        assert!(dropped.is_transport());
    }

    #[test]
    fn test_sign_transaction_missing_payer() {
        let maker = seeded(2);
        let signers = SignerSet::new().with(maker.clone());
        let tx = builder().build(&shield_spec(key(9), maker.pubkey())).unwrap();
        let err = sign_transaction(tx, &signers, Hash::default()).unwrap_err();
        assert!(matches!(err, ChainError::MissingSigner(k) if k == key(9)));
    }
}
