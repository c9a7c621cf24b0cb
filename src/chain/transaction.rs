//! Shield transaction construction.
//!
//! # Responsibilities
//! - Validate the shield instruction's account list against the program's expected shape
//! - Encode the instruction data
//! - Compile a legacy message through the SDK
//!
//! Building is pure: no network access, no signing. The blockhash is
//! stamped later by the submitter.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::Message;
use solana_sdk::sysvar;
use solana_sdk::transaction::Transaction;

use crate::chain::types::{ChainError, ChainResult, Pubkey};

/// SPL token program.
pub const TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// Instruction discriminant of `Shield` in the bridge program.
pub const SHIELD_INSTRUCTION_TAG: u8 = 0;

/// Accounts the shield instruction expects, in order.
pub const SHIELD_ACCOUNT_COUNT: usize = 6;

/// Typed parameters of a shield transaction.
///
/// `accounts` order is protocol-significant: position encodes role.
#[derive(Debug, Clone)]
pub struct TransactionSpec {
    /// Fee payer; always signature slot 0.
    pub payer: Pubkey,
    /// Other keys that must sign (typically the shield maker).
    pub additional_signers: Vec<Pubkey>,
    /// Instruction accounts in program order.
    pub accounts: Vec<AccountMeta>,
    /// Token amount in base units.
    pub amount: u64,
    /// Incognito payment address receiving the minted tokens.
    pub destination_address: String,
}

/// Per-shield accounts supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ShieldAccounts {
    pub maker: Pubkey,
    pub maker_token_account: Pubkey,
    pub vault_token_account: Pubkey,
    pub incognito_proxy: Pubkey,
}

impl TransactionSpec {
    /// Spec in the bridge program's account order. The maker co-signs.
    pub fn shield(
        payer: Pubkey,
        accounts: ShieldAccounts,
        amount: u64,
        destination_address: impl Into<String>,
    ) -> Self {
        Self {
            payer,
            additional_signers: if accounts.maker == payer {
                Vec::new()
            } else {
                vec![accounts.maker]
            },
            accounts: vec![
                AccountMeta::new_readonly(accounts.maker, true),
                AccountMeta::new(accounts.maker_token_account, false),
                AccountMeta::new(accounts.vault_token_account, false),
                AccountMeta::new_readonly(sysvar::rent::id(), false),
                AccountMeta::new_readonly(accounts.incognito_proxy, false),
                AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            ],
            amount,
            destination_address: destination_address.into(),
        }
    }
}

/// A compiled transaction awaiting a blockhash and signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    tx: Transaction,
}

impl UnsignedTransaction {
    pub fn new(message: Message) -> Self {
        Self {
            tx: Transaction::new_unsigned(message),
        }
    }

    pub fn message(&self) -> &Message {
        &self.tx.message
    }

    /// Keys whose signatures the message requires, in signature-slot order.
    pub fn required_signers(&self) -> &[Pubkey] {
        let message = &self.tx.message;
        let n = usize::from(message.header.num_required_signatures).min(message.account_keys.len());
        &message.account_keys[..n]
    }

    pub fn into_transaction(self) -> Transaction {
        self.tx
    }
}

/// Builder for bridge shield transactions.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    program_id: Pubkey,
}

impl TxBuilder {
    /// Create a builder targeting the given bridge program.
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    /// Check the account list against the shield instruction layout:
    /// maker (signer), maker token account (writable), vault token account
    /// (writable), rent sysvar, incognito proxy, token program.
    pub fn validate_shape(&self, spec: &TransactionSpec) -> ChainResult<()> {
        let accounts = &spec.accounts;
        if accounts.len() != SHIELD_ACCOUNT_COUNT {
            return Err(ChainError::InvalidInstructionShape(format!(
                "expected {} accounts, got {}",
                SHIELD_ACCOUNT_COUNT,
                accounts.len()
            )));
        }
        if !accounts[0].is_signer {
            return Err(ChainError::InvalidInstructionShape(
                "account 0 (shield maker) must be a signer".to_string(),
            ));
        }
        for (idx, role) in [(1, "shield maker token account"), (2, "vault token account")] {
            if !accounts[idx].is_writable {
                return Err(ChainError::InvalidInstructionShape(format!(
                    "account {} ({}) must be writable",
                    idx, role
                )));
            }
        }
        if accounts[3].pubkey != sysvar::rent::id() {
            return Err(ChainError::InvalidInstructionShape(format!(
                "account 3 must be the rent sysvar, got {}",
                accounts[3].pubkey
            )));
        }
        if accounts[5].pubkey != TOKEN_PROGRAM_ID {
            return Err(ChainError::InvalidInstructionShape(format!(
                "account 5 must be the token program, got {}",
                accounts[5].pubkey
            )));
        }
        for signer in &spec.additional_signers {
            if !accounts.iter().any(|a| a.pubkey == *signer && a.is_signer) {
                return Err(ChainError::InvalidInstructionShape(format!(
                    "additional signer {} is not a signing account",
                    signer
                )));
            }
        }
        if spec.destination_address.is_empty() {
            return Err(ChainError::InvalidInstructionShape(
                "destination address is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Instruction data: tag, little-endian amount, destination bytes.
    pub fn encode_shield_data(amount: u64, destination_address: &str) -> Vec<u8> {
        let mut data = Vec::with_capacity(9 + destination_address.len());
        data.push(SHIELD_INSTRUCTION_TAG);
        data.extend_from_slice(&amount.to_le_bytes());
        data.extend_from_slice(destination_address.as_bytes());
        data
    }

    pub fn shield_instruction(&self, spec: &TransactionSpec) -> ChainResult<Instruction> {
        self.validate_shape(spec)?;
        Ok(Instruction::new_with_bytes(
            self.program_id,
            &Self::encode_shield_data(spec.amount, &spec.destination_address),
            spec.accounts.clone(),
        ))
    }

    /// Build the unsigned shield transaction.
    pub fn build(&self, spec: &TransactionSpec) -> ChainResult<UnsignedTransaction> {
        let instruction = self.shield_instruction(spec)?;
        let message = Message::new(&[instruction], Some(&spec.payer));

        tracing::debug!(
            payer = %spec.payer,
            amount = spec.amount,
            signers = message.header.num_required_signatures,
            "Shield transaction built"
        );

        Ok(UnsignedTransaction::new(message))
    }
}
