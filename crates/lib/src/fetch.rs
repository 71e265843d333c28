use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_account_decoder::{UiAccountData, UiAccountEncoding};
use solana_client::{
    nonblocking::rpc_client::RpcClient, rpc_request::TokenAccountsFilter,
    rpc_response::RpcKeyedAccount,
};
use solana_sdk::pubkey::Pubkey;
use std::{str::FromStr, sync::Arc};

#[cfg(test)]
use mockall::automock;

use crate::{account::RawTokenAccount, error::ReclaimError, sanitize_error, token::TokenProgram};

/// Lists the zero-balance token accounts an owner holds under one token program
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch_closable_accounts(
        &self,
        owner: &Pubkey,
        program: TokenProgram,
    ) -> Result<Vec<RawTokenAccount>, ReclaimError>;
}

pub struct RpcAccountSource {
    rpc_client: Arc<RpcClient>,
}

impl RpcAccountSource {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }
}

#[async_trait]
impl AccountSource for RpcAccountSource {
    async fn fetch_closable_accounts(
        &self,
        owner: &Pubkey,
        program: TokenProgram,
    ) -> Result<Vec<RawTokenAccount>, ReclaimError> {
        let keyed_accounts = self
            .rpc_client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(program.program_id()))
            .await
            .map_err(|e| {
                ReclaimError::FetchError(format!(
                    "Failed to list {program} accounts of {owner}: {}",
                    sanitize_error!(e)
                ))
            })?;

        let mut closable = Vec::new();
        for keyed in &keyed_accounts {
            match parse_keyed_account(keyed, program) {
                Ok(Some(account)) => closable.push(account),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping token account {}: {e}", keyed.pubkey),
            }
        }

        log::debug!(
            "{} of {} {program} accounts owned by {owner} are empty",
            closable.len(),
            keyed_accounts.len()
        );
        Ok(closable)
    }
}

/// Returns the account when its token balance is zero, `None` when it still holds tokens
pub fn parse_keyed_account(
    keyed: &RpcKeyedAccount,
    program: TokenProgram,
) -> Result<Option<RawTokenAccount>, ReclaimError> {
    let address = Pubkey::from_str(&keyed.pubkey).map_err(|e| {
        ReclaimError::SerializationError(format!("Invalid account address {}: {e}", keyed.pubkey))
    })?;

    let (mint, amount) = parse_token_account_data(&keyed.account.data, program)?;
    if amount != 0 {
        return Ok(None);
    }

    Ok(Some(RawTokenAccount { address, program, mint, lamports: keyed.account.lamports }))
}

/// Extracts `(mint, amount)` from either the `jsonParsed` or the binary account encoding
fn parse_token_account_data(
    data: &UiAccountData,
    program: TokenProgram,
) -> Result<(Pubkey, u64), ReclaimError> {
    match data {
        UiAccountData::Json(parsed) => {
            let info = parsed.parsed.get("info").ok_or_else(|| {
                ReclaimError::SerializationError("Parsed account is missing `info`".to_string())
            })?;
            let mint = info
                .get("mint")
                .and_then(|m| m.as_str())
                .and_then(|m| Pubkey::from_str(m).ok())
                .ok_or_else(|| {
                    ReclaimError::SerializationError("Parsed account has no valid mint".to_string())
                })?;
            let amount = info
                .get("tokenAmount")
                .and_then(|t| t.get("amount"))
                .and_then(|a| a.as_str())
                .and_then(|a| a.parse::<u64>().ok())
                .ok_or_else(|| {
                    ReclaimError::SerializationError(
                        "Parsed account has no valid token amount".to_string(),
                    )
                })?;
            Ok((mint, amount))
        }
        UiAccountData::Binary(encoded, UiAccountEncoding::Base64) => {
            let bytes = STANDARD.decode(encoded).map_err(|e| {
                ReclaimError::SerializationError(format!("Invalid base64 account data: {e}"))
            })?;
            program.unpack_account(&bytes)
        }
        _ => Err(ReclaimError::SerializationError("Unsupported account data encoding".to_string())),
    }
}
