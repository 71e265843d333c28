use async_trait::async_trait;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_commitment_config::CommitmentLevel;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use solana_transaction_status_client_types::{TransactionConfirmationStatus, TransactionStatus};
use std::{fs, sync::Arc};

#[cfg(test)]
use mockall::automock;

use crate::{error::ReclaimError, sanitize_error};

const KEYPAIR_LEN: usize = 64;

/// Signs and submits one close transaction. May suspend until the user approves; declining
/// must surface as an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn sign_and_submit(&self, transaction: Transaction) -> Result<Signature, ReclaimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Seen by the cluster but not yet at `confirmed`
    Pending,
    Confirmed,
    /// Not known to the queried node yet
    Unknown,
}

impl ConfirmationStatus {
    pub fn from_transaction_status(status: Option<&TransactionStatus>) -> Self {
        match status.and_then(|s| s.confirmation_status.as_ref()) {
            Some(TransactionConfirmationStatus::Confirmed)
            | Some(TransactionConfirmationStatus::Finalized) => ConfirmationStatus::Confirmed,
            Some(TransactionConfirmationStatus::Processed) => ConfirmationStatus::Pending,
            None if status.is_some() => ConfirmationStatus::Pending,
            None => ConfirmationStatus::Unknown,
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SignatureStatusProvider: Send + Sync {
    async fn query_status(&self, signature: &Signature) -> Result<ConfirmationStatus, ReclaimError>;
}

/// Local keypair wallet that signs with a recent blockhash and submits over RPC
pub struct KeypairWallet {
    keypair: Keypair,
    rpc_client: Arc<RpcClient>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, rpc_client: Arc<RpcClient>) -> Self {
        Self { keypair, rpc_client }
    }

    /// Loads the keypair from a JSON keypair file path, an inline `[1, 2, ...]` byte array or a
    /// base58 secret key
    pub fn from_private_key_string(
        private_key: &str,
        rpc_client: Arc<RpcClient>,
    ) -> Result<Self, ReclaimError> {
        Ok(Self::new(parse_keypair(private_key)?, rpc_client))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl TransactionSubmitter for KeypairWallet {
    async fn sign_and_submit(&self, mut transaction: Transaction) -> Result<Signature, ReclaimError> {
        let blockhash = self.rpc_client.get_latest_blockhash().await?;
        transaction.try_sign(&[&self.keypair], blockhash)?;

        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..Default::default()
        };

        self.rpc_client.send_transaction_with_config(&transaction, config).await.map_err(|e| {
            ReclaimError::TransactionRejected(format!(
                "Failed to send transaction: {}",
                sanitize_error!(e)
            ))
        })
    }
}

#[async_trait]
impl SignatureStatusProvider for KeypairWallet {
    async fn query_status(&self, signature: &Signature) -> Result<ConfirmationStatus, ReclaimError> {
        let response = self.rpc_client.get_signature_statuses(&[*signature]).await?;
        let status = response.value.into_iter().next().flatten();

        // A confirmed transaction that failed on chain closed nothing. It is not reported as
        // confirmed and ends the run, even though its confirmation level is reached.
        if let Some(err) = status.as_ref().and_then(|s| s.err.as_ref()) {
            return Err(ReclaimError::TransactionRejected(format!(
                "Transaction {signature} failed on chain: {err}"
            )));
        }

        Ok(ConfirmationStatus::from_transaction_status(status.as_ref()))
    }
}

pub fn parse_keypair(private_key: &str) -> Result<Keypair, ReclaimError> {
    if let Ok(contents) = fs::read_to_string(private_key) {
        return keypair_from_json_bytes(&contents);
    }

    let trimmed = private_key.trim();
    if trimmed.starts_with('[') {
        return keypair_from_json_bytes(trimmed);
    }

    let decoded = bs58::decode(trimmed).into_vec().map_err(|e| {
        ReclaimError::SigningError(format!("Invalid base58 private key: {}", sanitize_error!(e)))
    })?;
    keypair_from_bytes(&decoded)
}

fn keypair_from_json_bytes(json: &str) -> Result<Keypair, ReclaimError> {
    let bytes: Vec<u8> = serde_json::from_str(json).map_err(|e| {
        ReclaimError::SigningError(format!(
            "Keypair must be a JSON array of {KEYPAIR_LEN} bytes: {}",
            sanitize_error!(e)
        ))
    })?;
    keypair_from_bytes(&bytes)
}

fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair, ReclaimError> {
    if bytes.len() != KEYPAIR_LEN {
        return Err(ReclaimError::SigningError(format!(
            "Private key must be exactly {KEYPAIR_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Keypair::try_from(bytes).map_err(|e| {
        ReclaimError::SigningError(format!("Invalid private key bytes: {}", sanitize_error!(e)))
    })
}
