//! Reconciliation engine for ledger transactions and bank statements
//!
//! Records of both sides are bucketed by [`MatchKey`], the union of keys is
//! split into contiguous chunks, and each chunk is reduced concurrently.

pub mod dispatcher;
pub mod grouper;
pub mod match_key;
pub mod reducer;
pub mod summary;

pub use dispatcher::*;
pub use grouper::*;
pub use match_key::*;
pub use reducer::*;
pub use summary::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Everything a single reconciliation run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub unmatched_transactions: Vec<UnmatchedResult>,
    pub unmatched_bank_statements: Vec<UnmatchedResult>,
    pub summary: ReconciliationSummary,
}

impl ReconciliationReport {
    /// All unmatched records, transaction side first
    pub fn unmatched(&self) -> Vec<UnmatchedResult> {
        self.unmatched_transactions
            .iter()
            .chain(&self.unmatched_bank_statements)
            .cloned()
            .collect()
    }
}

/// Runs grouping, parallel reduction and summarising over in-memory records
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine {
    boundary: ExcessBoundary,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that selects excess records with `boundary`
    pub fn with_boundary(boundary: ExcessBoundary) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> ExcessBoundary {
        self.boundary
    }

    /// Reconcile both record sets using `concurrency` reduction workers
    pub async fn reconcile(
        &self,
        transactions: Vec<Transaction>,
        bank_statements: Vec<BankStatement>,
        concurrency: usize,
    ) -> ReconResult<ReconciliationReport> {
        let tx_groups = Arc::new(group_by_key(transactions.iter().cloned()));
        let bank_groups = Arc::new(group_by_key(bank_statements.iter().cloned()));
        let keys: Arc<[String]> = combine_keys(tx_groups.keys(), bank_groups.keys()).into();

        tracing::debug!(
            transactions = transactions.len(),
            bank_statements = bank_statements.len(),
            keys = keys.len(),
            "records grouped"
        );

        let unmatched = dispatch(keys, tx_groups, bank_groups, concurrency, self.boundary)
            .await?
            .into_result()?;
        let summary = summarize(&transactions, &bank_statements, &unmatched);

        Ok(ReconciliationReport {
            unmatched_transactions: unmatched.transactions,
            unmatched_bank_statements: unmatched.bank_statements,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_two_transactions_against_one_statement() {
        let txs = vec![
            Transaction::new(
                "t1",
                BigDecimal::from(100),
                TransactionType::Credit,
                jan(1).and_hms_opt(9, 0, 0).unwrap(),
            ),
            Transaction::new(
                "t2",
                BigDecimal::from(100),
                TransactionType::Credit,
                jan(1).and_hms_opt(10, 0, 0).unwrap(),
            ),
        ];
        let statements = vec![BankStatement::new("b1", BigDecimal::from(100), jan(1), "BCA")];

        let report = ReconciliationEngine::new()
            .reconcile(txs, statements, 2)
            .await
            .unwrap();

        assert_eq!(report.unmatched_transactions.len(), 1);
        assert!(report.unmatched_bank_statements.is_empty());
        assert_eq!(report.summary.total_matched_transactions, 1);
        assert_eq!(report.summary.total_discrepancies, BigDecimal::from(100));
    }

    #[tokio::test]
    async fn test_no_bank_statements_leaves_everything_unmatched() {
        let txs: Vec<_> = (0..5)
            .map(|n| {
                Transaction::new(
                    format!("t{n}"),
                    BigDecimal::from(10 * (n + 1)),
                    TransactionType::Debit,
                    jan(4).and_hms_opt(n, 0, 0).unwrap(),
                )
            })
            .collect();

        let report = ReconciliationEngine::new()
            .reconcile(txs, Vec::new(), 3)
            .await
            .unwrap();

        assert_eq!(report.unmatched_transactions.len(), 5);
        assert_eq!(report.summary.total_matched_transactions, 0);
        assert_eq!(report.summary.total_unmatched_transactions, 5);
    }

    #[tokio::test]
    async fn test_unmatched_lists_transactions_first() {
        let txs = vec![Transaction::new(
            "t1",
            BigDecimal::from(1),
            TransactionType::Credit,
            jan(2).and_hms_opt(0, 0, 0).unwrap(),
        )];
        let statements = vec![BankStatement::new("b1", BigDecimal::from(2), jan(2), "BRI")];

        let report = ReconciliationEngine::with_boundary(ExcessBoundary::Legacy)
            .reconcile(txs, statements, 1)
            .await
            .unwrap();

        let sides: Vec<_> = report.unmatched().iter().map(UnmatchedResult::side).collect();
        assert_eq!(sides, vec![MatchSide::Transaction, MatchSide::Bank]);
    }
}
