//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an internal ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TransactionType {
    /// Money coming in (encoded as `1` in flat files)
    Credit,
    /// Money going out (encoded as `2` in flat files)
    Debit,
}

impl TransactionType {
    /// Infer the direction of a bank-side amount from its sign
    pub fn from_signed_amount(amount: &BigDecimal) -> Self {
        if *amount < BigDecimal::from(0) {
            TransactionType::Debit
        } else {
            TransactionType::Credit
        }
    }
}

impl TryFrom<u8> for TransactionType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TransactionType::Credit),
            2 => Ok(TransactionType::Debit),
            other => Err(format!("unknown transaction type code {other}")),
        }
    }
}

impl From<TransactionType> for u8 {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Credit => 1,
            TransactionType::Debit => 2,
        }
    }
}

/// Internal ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger transaction identifier
    pub trx_id: String,
    /// Signed amount
    pub amount: BigDecimal,
    /// Credit or debit
    pub transaction_type: TransactionType,
    /// When the transaction was booked
    pub transaction_time: NaiveDateTime,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(
        trx_id: impl Into<String>,
        amount: BigDecimal,
        transaction_type: TransactionType,
        transaction_time: NaiveDateTime,
    ) -> Self {
        Self {
            trx_id: trx_id.into(),
            amount,
            transaction_type,
            transaction_time,
        }
    }

    /// Calendar date the transaction belongs to
    pub fn date(&self) -> NaiveDate {
        self.transaction_time.date()
    }
}

/// External bank statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankStatement {
    /// Identifier assigned by the bank
    pub unique_identifier: String,
    /// Signed amount
    pub amount: BigDecimal,
    /// Statement date
    pub date: NaiveDate,
    /// Name of the bank that issued the statement
    pub bank: String,
}

impl BankStatement {
    /// Create a new bank statement line
    pub fn new(
        unique_identifier: impl Into<String>,
        amount: BigDecimal,
        date: NaiveDate,
        bank: impl Into<String>,
    ) -> Self {
        Self {
            unique_identifier: unique_identifier.into(),
            amount,
            date,
            bank: bank.into(),
        }
    }
}

/// Which record set an unmatched result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSide {
    Transaction,
    Bank,
}

/// A record that could not be matched against the other side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnmatchedResult {
    /// Populated for transaction-side results
    pub trx_id: Option<String>,
    /// Populated for bank-side results
    pub unique_identifier: Option<String>,
    pub amount: BigDecimal,
    pub transaction_type: TransactionType,
    pub transaction_time: NaiveDateTime,
    /// Originating bank, bank-side only
    pub bank_name: Option<String>,
}

impl UnmatchedResult {
    /// Which side this result belongs to, derived from the populated identifier
    pub fn side(&self) -> MatchSide {
        if self.trx_id.is_some() {
            MatchSide::Transaction
        } else {
            MatchSide::Bank
        }
    }

    /// Identifier of the source record, whichever side it came from
    pub fn record_id(&self) -> &str {
        self.trx_id
            .as_deref()
            .or(self.unique_identifier.as_deref())
            .unwrap_or_default()
    }
}

impl From<&Transaction> for UnmatchedResult {
    fn from(tx: &Transaction) -> Self {
        Self {
            trx_id: Some(tx.trx_id.clone()),
            unique_identifier: None,
            amount: tx.amount.clone(),
            transaction_type: tx.transaction_type,
            transaction_time: tx.transaction_time,
            bank_name: None,
        }
    }
}

impl From<&BankStatement> for UnmatchedResult {
    fn from(statement: &BankStatement) -> Self {
        Self {
            trx_id: None,
            unique_identifier: Some(statement.unique_identifier.clone()),
            amount: statement.amount.clone(),
            transaction_type: TransactionType::from_signed_amount(&statement.amount),
            transaction_time: statement.date.and_time(NaiveTime::MIN),
            bank_name: Some(statement.bank.clone()),
        }
    }
}

/// Aggregate counts for one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Number of ledger transactions loaded for the period
    pub total_transactions_processed: usize,
    /// Transactions that found a counterpart
    pub total_matched_transactions: usize,
    /// Unmatched records on both sides combined
    pub total_unmatched_transactions: usize,
    /// Sum of transaction amounts minus sum of bank amounts
    pub total_discrepancies: BigDecimal,
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to load records: {0}")]
    Load(String),
    #[error("Failed to persist report: {0}")]
    Persist(String),
    #[error("Job already exists: {0}")]
    DuplicateJob(String),
    #[error("Job not found: {0}")]
    JobNotFound(String),
    #[error("Invalid job transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },
    #[error("Reduction failed in {failed} of {total} chunks")]
    Dispatch { failed: usize, total: usize },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;

/// Inclusive calendar range a job reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day in the range, in order. Empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Number of days covered, zero for an inverted range
    pub fn len_days(&self) -> i64 {
        ((self.end - self.start).num_days() + 1).max(0)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_transaction_type_codes() {
        assert_eq!(TransactionType::try_from(1).unwrap(), TransactionType::Credit);
        assert_eq!(TransactionType::try_from(2).unwrap(), TransactionType::Debit);
        assert!(TransactionType::try_from(3).is_err());
        assert_eq!(u8::from(TransactionType::Debit), 2);
    }

    #[test]
    fn test_bank_side_result_uses_sign_for_type() {
        let outgoing = BankStatement::new(
            "bs-1",
            BigDecimal::from_str("-25.50").unwrap(),
            date(2021, 1, 1),
            "BCA",
        );
        let result = UnmatchedResult::from(&outgoing);

        assert_eq!(result.side(), MatchSide::Bank);
        assert_eq!(result.transaction_type, TransactionType::Debit);
        assert_eq!(result.bank_name.as_deref(), Some("BCA"));
        assert_eq!(result.record_id(), "bs-1");
        assert_eq!(result.transaction_time.date(), date(2021, 1, 1));
    }

    #[test]
    fn test_transaction_side_result() {
        let tx = Transaction::new(
            "trx-9",
            BigDecimal::from(100),
            TransactionType::Credit,
            date(2021, 1, 2).and_hms_opt(10, 30, 0).unwrap(),
        );
        let result = UnmatchedResult::from(&tx);

        assert_eq!(result.side(), MatchSide::Transaction);
        assert_eq!(result.record_id(), "trx-9");
        assert!(result.bank_name.is_none());
    }

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(date(2021, 1, 30), date(2021, 2, 2));
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(range.len_days(), 4);
        assert!(range.contains(date(2021, 2, 1)));
        assert!(!range.contains(date(2021, 2, 3)));

        let inverted = DateRange::new(date(2021, 2, 2), date(2021, 1, 30));
        assert_eq!(inverted.days().count(), 0);
        assert_eq!(inverted.len_days(), 0);
    }
}
