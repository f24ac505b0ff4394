//! Aggregate figures for a reconciliation run

use bigdecimal::BigDecimal;

use super::reducer::ReduceOutput;
use crate::types::{BankStatement, ReconciliationSummary, Transaction};

/// Sum of ledger transaction amounts
pub fn total_transaction_amount(transactions: &[Transaction]) -> BigDecimal {
    transactions.iter().map(|tx| &tx.amount).sum()
}

/// Sum of bank statement amounts
pub fn total_bank_amount(bank_statements: &[BankStatement]) -> BigDecimal {
    bank_statements.iter().map(|bs| &bs.amount).sum()
}

/// Build the run summary from the loaded records and the reduction output
pub fn summarize(
    transactions: &[Transaction],
    bank_statements: &[BankStatement],
    unmatched: &ReduceOutput,
) -> ReconciliationSummary {
    let processed = transactions.len();
    let unmatched_transactions = unmatched.transactions.len();

    ReconciliationSummary {
        total_transactions_processed: processed,
        total_matched_transactions: processed.saturating_sub(unmatched_transactions),
        total_unmatched_transactions: unmatched_transactions + unmatched.bank_statements.len(),
        total_discrepancies: total_transaction_amount(transactions)
            - total_bank_amount(bank_statements),
    }
}
