use crate::{
    account::{total_lamports, RecordRef},
    config::{ComputeBudgetConfig, Config},
    error::ReclaimError,
};

/// One transaction's worth of records, `records == input[lower_bound..upper_bound]`
#[derive(Debug, Clone)]
pub struct Batch {
    pub index: usize,
    pub lower_bound: usize,
    pub upper_bound: usize,
    pub records: Vec<RecordRef>,
    pub units_requested: u32,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_lamports(&self) -> u64 {
        total_lamports(&self.records)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    batches: Vec<Batch>,
}

impl BatchPlan {
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    pub fn total_lamports(&self) -> u64 {
        self.batches.iter().map(Batch::total_lamports).sum()
    }
}

impl<'a> IntoIterator for &'a BatchPlan {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

/// Number of transactions needed for `total` records, `ceil(total / per_tx)`
pub fn batch_count(total: usize, per_tx: usize) -> usize {
    total.div_ceil(per_tx)
}

/// Compute-unit limit for the batch ending at `upper_bound`.
///
/// The close cost is multiplied by the batch's upper bound (its end offset in the whole run),
/// not by the number of close instructions it holds, so every batch after the first asks for
/// more units than it needs. Kept as-is to match the deployed behaviour.
pub fn units_requested(upper_bound: usize, costs: &ComputeBudgetConfig) -> Result<u32, ReclaimError> {
    let units = (upper_bound as u64)
        .checked_mul(u64::from(costs.close_account_cu))
        .and_then(|u| u.checked_add(u64::from(costs.set_compute_unit_price_cu)))
        .and_then(|u| u.checked_add(u64::from(costs.set_compute_unit_limit_cu)))
        .ok_or_else(|| {
            ReclaimError::ValidationError(format!(
                "Compute unit request overflows for batch ending at {upper_bound}"
            ))
        })?;

    u32::try_from(units).map_err(|_| {
        ReclaimError::ValidationError(format!(
            "Compute unit request {units} for batch ending at {upper_bound} exceeds u32"
        ))
    })
}

#[derive(Debug, Clone)]
pub struct BatchPlanner {
    per_tx: usize,
    costs: ComputeBudgetConfig,
}

impl BatchPlanner {
    pub fn new(per_tx: usize, costs: ComputeBudgetConfig) -> Result<Self, ReclaimError> {
        if per_tx == 0 {
            return Err(ReclaimError::ConfigError(
                "accounts per transaction must be greater than 0".to_string(),
            ));
        }
        Ok(Self { per_tx, costs })
    }

    pub fn from_config(config: &Config) -> Result<Self, ReclaimError> {
        Self::new(config.batching.accounts_per_transaction, config.compute_budget.clone())
    }

    pub fn per_tx(&self) -> usize {
        self.per_tx
    }

    /// Splits `records` into consecutive batches of at most `per_tx`, preserving order.
    /// An empty input yields an empty plan.
    pub fn plan(&self, records: &[RecordRef]) -> Result<BatchPlan, ReclaimError> {
        let total = records.len();
        let count = batch_count(total, self.per_tx);

        let mut batches = Vec::with_capacity(count);
        for index in 0..count {
            let lower_bound = self.per_tx * index;
            let upper_bound = if index == count - 1 { total } else { self.per_tx * (index + 1) };

            batches.push(Batch {
                index,
                lower_bound,
                upper_bound,
                records: records[lower_bound..upper_bound].to_vec(),
                units_requested: units_requested(upper_bound, &self.costs)?,
            });
        }

        Ok(BatchPlan { batches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::account_mock::create_record_refs;
    use std::sync::Arc;

    fn planner() -> BatchPlanner {
        BatchPlanner::new(20, ComputeBudgetConfig::default()).unwrap()
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        assert_eq!(batch_count(0, 20), 0);
        assert_eq!(batch_count(1, 20), 1);
        assert_eq!(batch_count(19, 20), 1);
        assert_eq!(batch_count(20, 20), 1);
        assert_eq!(batch_count(21, 20), 2);
        assert_eq!(batch_count(45, 20), 3);
        assert_eq!(batch_count(60, 20), 3);
        for n in 0..200 {
            let expected = if n % 20 == 0 { n / 20 } else { n / 20 + 1 };
            assert_eq!(batch_count(n, 20), expected);
        }
    }

    #[test]
    fn test_plan_45_records() {
        let records = create_record_refs(45);
        let plan = planner().plan(&records).unwrap();

        let sizes: Vec<_> = plan.batches().iter().map(Batch::len).collect();
        let uppers: Vec<_> = plan.batches().iter().map(|b| b.upper_bound).collect();
        let lowers: Vec<_> = plan.batches().iter().map(|b| b.lower_bound).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(uppers, vec![20, 40, 45]);
        assert_eq!(lowers, vec![0, 20, 40]);
    }

    #[test]
    fn test_plan_empty_input() {
        let plan = planner().plan(&[]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_records(), 0);
    }

    #[test]
    fn test_plan_is_order_preserving_partition() {
        for n in [1, 7, 20, 39, 40, 41, 100, 133] {
            let records = create_record_refs(n);
            let plan = planner().plan(&records).unwrap();

            let flattened: Vec<_> = plan.batches().iter().flat_map(|b| b.records.iter()).collect();
            assert_eq!(flattened.len(), n);
            for (original, planned) in records.iter().zip(flattened) {
                assert!(Arc::ptr_eq(original, planned));
            }
            assert!(plan.batches().iter().all(|b| !b.is_empty() && b.len() <= 20));
        }
    }

    #[test]
    fn test_units_requested_formula() {
        let costs = ComputeBudgetConfig {
            unit_price_micro_lamports: 1000,
            close_account_cu: 3000,
            set_compute_unit_price_cu: 150,
            set_compute_unit_limit_cu: 200,
        };
        assert_eq!(units_requested(20, &costs).unwrap(), 20 * 3000 + 150 + 200);
        assert_eq!(units_requested(45, &costs).unwrap(), 45 * 3000 + 150 + 200);
    }

    #[test]
    fn test_units_use_upper_bound_not_batch_size() {
        let costs = ComputeBudgetConfig::default();
        let records = create_record_refs(45);
        let plan = planner().plan(&records).unwrap();

        let last = &plan.batches()[2];
        assert_eq!(last.len(), 5);
        assert_eq!(
            last.units_requested,
            45 * costs.close_account_cu + costs.set_compute_unit_price_cu + costs.set_compute_unit_limit_cu
        );
    }

    #[test]
    fn test_units_requested_overflow() {
        let costs = ComputeBudgetConfig { close_account_cu: u32::MAX, ..Default::default() };
        assert!(matches!(units_requested(2, &costs), Err(ReclaimError::ValidationError(_))));
    }

    #[test]
    fn test_planner_rejects_zero_per_tx() {
        assert!(BatchPlanner::new(0, ComputeBudgetConfig::default()).is_err());
    }

    #[test]
    fn test_plan_totals() {
        let records = create_record_refs(3);
        let plan = BatchPlanner::new(2, ComputeBudgetConfig::default()).unwrap().plan(&records).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.total_records(), 3);
        assert_eq!(plan.total_lamports(), total_lamports(&records));
    }
}
