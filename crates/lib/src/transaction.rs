use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_message::Message;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    transaction::Transaction,
};

use crate::{
    batch::Batch, config::Config, constant::COMPUTE_UNIT_LIMIT_IX_INDEX, error::ReclaimError,
};

/// Appends the attribution marker to an instruction's account list as a read-only,
/// non-signer reference. Program semantics and the required signer set are unchanged.
pub fn attach_tracking_reference(ix: &mut Instruction, tracking_address: &Pubkey) {
    ix.accounts.push(AccountMeta::new_readonly(*tracking_address, false));
}

/// Builds one unsigned close transaction per batch:
/// `[SetComputeUnitPrice, SetComputeUnitLimit + tracking ref, CloseAccount * n]`
#[derive(Debug, Clone)]
pub struct CloseTransactionBuilder {
    unit_price_micro_lamports: u64,
    tracking_address: Pubkey,
}

impl CloseTransactionBuilder {
    pub fn new(unit_price_micro_lamports: u64, tracking_address: Pubkey) -> Self {
        Self { unit_price_micro_lamports, tracking_address }
    }

    pub fn from_config(config: &Config) -> Result<Self, ReclaimError> {
        Ok(Self::new(config.compute_budget.unit_price_micro_lamports, config.tracking.pubkey()?))
    }

    pub fn tracking_address(&self) -> &Pubkey {
        &self.tracking_address
    }

    pub fn build_instructions(
        &self,
        batch: &Batch,
        wallet: &Pubkey,
    ) -> Result<Vec<Instruction>, ReclaimError> {
        let mut instructions = Vec::with_capacity(batch.len() + 2);
        instructions
            .push(ComputeBudgetInstruction::set_compute_unit_price(self.unit_price_micro_lamports));
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(batch.units_requested));

        attach_tracking_reference(
            &mut instructions[COMPUTE_UNIT_LIMIT_IX_INDEX],
            &self.tracking_address,
        );

        for record in &batch.records {
            instructions.push(record.owner_program.close_account_instruction(
                &record.account_address,
                wallet,
                wallet,
            )?);
        }

        Ok(instructions)
    }

    /// Unsigned legacy transaction paid by `wallet`. The blockhash is left for the signer.
    pub fn build(&self, batch: &Batch, wallet: &Pubkey) -> Result<Transaction, ReclaimError> {
        let instructions = self.build_instructions(batch, wallet)?;
        let message = Message::new(&instructions, Some(wallet));
        Ok(Transaction::new_unsigned(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        batch::BatchPlanner,
        config::ComputeBudgetConfig,
        constant::{MAX_ACCOUNTS_PER_TRANSACTION, PACKET_DATA_SIZE},
        tests::account_mock::{create_record_refs, AccountRecordBuilder},
        token::TokenProgram,
    };

    fn single_batch(records: usize) -> Batch {
        let planner = BatchPlanner::new(20, ComputeBudgetConfig::default()).unwrap();
        planner.plan(&create_record_refs(records)).unwrap().batches()[0].clone()
    }

    fn builder() -> (CloseTransactionBuilder, Pubkey) {
        let tracking = Pubkey::new_unique();
        (CloseTransactionBuilder::new(1000, tracking), tracking)
    }

    #[test]
    fn test_instruction_order() {
        let (builder, _) = builder();
        let wallet = Pubkey::new_unique();
        let batch = single_batch(3);

        let ixs = builder.build_instructions(&batch, &wallet).unwrap();
        assert_eq!(ixs.len(), 5);

        let price = ComputeBudgetInstruction::set_compute_unit_price(1000);
        assert_eq!(ixs[0], price);

        let limit = ComputeBudgetInstruction::set_compute_unit_limit(batch.units_requested);
        assert_eq!(ixs[1].program_id, limit.program_id);
        assert_eq!(ixs[1].data, limit.data);

        for (ix, record) in ixs[2..].iter().zip(&batch.records) {
            assert_eq!(ix.program_id, record.owner_program.program_id());
            assert_eq!(ix.accounts[0].pubkey, record.account_address);
            assert_eq!(ix.accounts[1].pubkey, wallet);
            assert_eq!(ix.accounts[2].pubkey, wallet);
        }
    }

    #[test]
    fn test_tracking_reference_only_on_limit_instruction() {
        let (builder, tracking) = builder();
        let wallet = Pubkey::new_unique();
        let ixs = builder.build_instructions(&single_batch(4), &wallet).unwrap();

        assert_eq!(ixs[1].accounts, vec![AccountMeta::new_readonly(tracking, false)]);
        assert!(ixs[0].accounts.is_empty());
        for close in &ixs[2..] {
            assert!(close.accounts.iter().all(|meta| meta.pubkey != tracking));
        }
    }

    #[test]
    fn test_close_instructions_follow_program_variant() {
        let (builder, _) = builder();
        let wallet = Pubkey::new_unique();
        let records = vec![
            AccountRecordBuilder::new().with_program(TokenProgram::Spl).build_ref(),
            AccountRecordBuilder::new().with_program(TokenProgram::Token2022).build_ref(),
        ];
        let batch = BatchPlanner::new(20, ComputeBudgetConfig::default())
            .unwrap()
            .plan(&records)
            .unwrap()
            .batches()[0]
            .clone();

        let ixs = builder.build_instructions(&batch, &wallet).unwrap();
        assert_eq!(ixs[2].program_id, spl_token_interface::id());
        assert_eq!(ixs[3].program_id, spl_token_2022_interface::id());
    }

    #[test]
    fn test_transaction_requires_only_wallet_signature() {
        let (builder, tracking) = builder();
        let wallet = Pubkey::new_unique();
        let tx = builder.build(&single_batch(20), &wallet).unwrap();

        let message = &tx.message;
        assert_eq!(message.header.num_required_signatures, 1);
        assert_eq!(message.account_keys[0], wallet);
        assert_eq!(message.instructions.len(), 22);

        let tracking_idx = message.account_keys.iter().position(|k| *k == tracking).unwrap();
        let readonly_unsigned_start =
            message.account_keys.len() - message.header.num_readonly_unsigned_accounts as usize;
        assert!(tracking_idx >= readonly_unsigned_start);
        assert!(tx.signatures.iter().all(|s| *s == Default::default()));
    }

    fn mixed_batch(records: usize) -> Batch {
        let refs: Vec<_> = (0..records)
            .map(|i| {
                let program = if i % 2 == 0 { TokenProgram::Spl } else { TokenProgram::Token2022 };
                AccountRecordBuilder::new().with_program(program).build_ref()
            })
            .collect();
        BatchPlanner::new(records, ComputeBudgetConfig::default())
            .unwrap()
            .plan(&refs)
            .unwrap()
            .batches()[0]
            .clone()
    }

    fn wire_size(tx: &Transaction) -> usize {
        // compact-u16 signature count, then the signatures, then the message
        1 + tx.signatures.len() * 64 + tx.message_data().len()
    }

    #[test]
    fn test_largest_allowed_batch_fits_one_packet() {
        let (builder, _) = builder();
        let wallet = Pubkey::new_unique();

        let tx = builder.build(&mixed_batch(MAX_ACCOUNTS_PER_TRANSACTION), &wallet).unwrap();
        assert!(wire_size(&tx) <= PACKET_DATA_SIZE, "wire size {}", wire_size(&tx));

        let tx = builder.build(&mixed_batch(MAX_ACCOUNTS_PER_TRANSACTION + 1), &wallet).unwrap();
        assert!(wire_size(&tx) > PACKET_DATA_SIZE);
    }

    #[test]
    fn test_default_batch_wire_size() {
        let (builder, _) = builder();
        let tx = builder.build(&single_batch(20), &Pubkey::new_unique()).unwrap();
        assert_eq!(wire_size(&tx), 1031);
    }
}
