use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

use crate::{
    config::Network,
    constant::{EXPLORER_TOKEN_URL, LAMPORTS_PER_SOL, UNKNOWN_TOKEN_NAME},
    token::TokenProgram,
};

/// A zero-balance token account as returned by the account source, before metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTokenAccount {
    pub address: Pubkey,
    pub program: TokenProgram,
    pub mint: Pubkey,
    pub lamports: u64,
}

/// One closable token account. Records are immutable snapshots of a single fetch and are
/// shared as [`RecordRef`]; two fetches of the same on-chain account produce distinct records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountRecord {
    pub account_address: Pubkey,
    pub owner_program: TokenProgram,
    pub mint: Pubkey,
    pub display_name: Option<String>,
    pub image_uri: Option<String>,
    pub reclaimable_lamports: u64,
}

pub type RecordRef = Arc<AccountRecord>;

impl AccountRecord {
    pub fn from_raw(raw: &RawTokenAccount) -> Self {
        Self {
            account_address: raw.address,
            owner_program: raw.program,
            mint: raw.mint,
            display_name: None,
            image_uri: None,
            reclaimable_lamports: raw.lamports,
        }
    }

    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(UNKNOWN_TOKEN_NAME)
    }

    pub fn explorer_url(&self, network: Network) -> String {
        match network.explorer_cluster() {
            Some(cluster) => format!("{EXPLORER_TOKEN_URL}/{}?cluster={cluster}", self.mint),
            None => format!("{EXPLORER_TOKEN_URL}/{}", self.mint),
        }
    }
}

pub fn total_lamports<'a>(records: impl IntoIterator<Item = &'a RecordRef>) -> u64 {
    records.into_iter().map(|r| r.reclaimable_lamports).sum()
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
