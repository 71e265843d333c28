use serde::{Deserialize, Serialize};
use solana_program_pack::Pack;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::fmt;

use crate::error::ReclaimError;

/// The two token programs whose accounts can be closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenProgram {
    Spl,
    Token2022,
}

impl TokenProgram {
    /// Fetch order used by the refresh: legacy SPL Token first, then Token-2022
    pub const ALL: [TokenProgram; 2] = [TokenProgram::Spl, TokenProgram::Token2022];

    pub fn program_id(&self) -> Pubkey {
        match self {
            TokenProgram::Spl => spl_token_interface::id(),
            TokenProgram::Token2022 => spl_token_2022_interface::id(),
        }
    }

    pub fn from_owner(owner: &Pubkey) -> Result<Self, ReclaimError> {
        if *owner == spl_token_interface::id() {
            Ok(TokenProgram::Spl)
        } else if *owner == spl_token_2022_interface::id() {
            Ok(TokenProgram::Token2022)
        } else {
            Err(ReclaimError::TokenOperationError(format!("Invalid token program owner: {owner}")))
        }
    }

    /// `CloseAccount` sending the rent to `destination`, authorized by `owner` alone
    pub fn close_account_instruction(
        &self,
        account: &Pubkey,
        destination: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Instruction, ReclaimError> {
        let program_id = self.program_id();
        let ix = match self {
            TokenProgram::Spl => spl_token_interface::instruction::close_account(
                &program_id,
                account,
                destination,
                owner,
                &[],
            )?,
            TokenProgram::Token2022 => spl_token_2022_interface::instruction::close_account(
                &program_id,
                account,
                destination,
                owner,
                &[],
            )?,
        };
        Ok(ix)
    }

    /// Returns `(mint, amount)` from raw account bytes owned by this program
    pub fn unpack_account(&self, data: &[u8]) -> Result<(Pubkey, u64), ReclaimError> {
        match self {
            TokenProgram::Spl => {
                let account = spl_token_interface::state::Account::unpack(data)?;
                Ok((account.mint, account.amount))
            }
            TokenProgram::Token2022 => {
                // Token-2022 accounts may carry extensions past the base layout
                let base = data.get(..spl_token_2022_interface::state::Account::LEN).ok_or_else(
                    || {
                        ReclaimError::TokenOperationError(format!(
                            "Token-2022 account data too short: {} bytes",
                            data.len()
                        ))
                    },
                )?;
                let account = spl_token_2022_interface::state::Account::unpack_from_slice(base)?;
                Ok((account.mint, account.amount))
            }
        }
    }
}

impl fmt::Display for TokenProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenProgram::Spl => f.write_str("Token"),
            TokenProgram::Token2022 => f.write_str("Token-2022"),
        }
    }
}
