//! Per-key matching decision
//!
//! Matching is decided on group cardinality only: when both sides carry the
//! same number of records for a (date, amount) key they are declared matched
//! without any pairwise field comparison. Correctness of matching is
//! guaranteed only up to group cardinality, not per-record pairing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::grouper::Grouping;
use crate::types::{BankStatement, ReconError, Transaction, UnmatchedResult};

/// Where the excess slice of an oversized group begins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcessBoundary {
    /// Excess starts at the shorter group's length
    #[default]
    Exact,
    /// Excess starts one element earlier, reproducing output of older
    /// releases that reported one extra record on the longer side
    Legacy,
}

impl ExcessBoundary {
    /// Index of the first excess record in a group whose counterpart holds
    /// `matched` records
    fn start(self, matched: usize) -> usize {
        match self {
            ExcessBoundary::Exact => matched,
            ExcessBoundary::Legacy => matched.saturating_sub(1),
        }
    }
}

impl FromStr for ExcessBoundary {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(ExcessBoundary::Exact),
            "legacy" => Ok(ExcessBoundary::Legacy),
            other => Err(ReconError::Config(format!(
                "unknown excess boundary '{other}', expected 'exact' or 'legacy'"
            ))),
        }
    }
}

/// Unmatched records produced by one reduction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReduceOutput {
    pub transactions: Vec<UnmatchedResult>,
    pub bank_statements: Vec<UnmatchedResult>,
}

impl ReduceOutput {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.bank_statements.is_empty()
    }

    /// Append another output, keeping this one's records first
    pub fn extend(&mut self, other: ReduceOutput) {
        self.transactions.extend(other.transactions);
        self.bank_statements.extend(other.bank_statements);
    }
}

/// Apply the matching policy to every key in `keys`
///
/// Keys are processed in the given order and the results keep that order.
pub fn reduce(
    keys: &[String],
    transactions: &Grouping<Transaction>,
    bank_statements: &Grouping<BankStatement>,
    boundary: ExcessBoundary,
) -> ReduceOutput {
    let mut output = ReduceOutput::default();

    for key in keys {
        let txs = transactions.get(key);
        let statements = bank_statements.get(key);

        if statements.is_empty() {
            output
                .transactions
                .extend(txs.iter().map(UnmatchedResult::from));
        } else if txs.is_empty() {
            output
                .bank_statements
                .extend(statements.iter().map(UnmatchedResult::from));
        } else if txs.len() > statements.len() {
            let start = boundary.start(statements.len());
            output
                .transactions
                .extend(txs[start..].iter().map(UnmatchedResult::from));
        } else if statements.len() > txs.len() {
            let start = boundary.start(txs.len());
            output
                .bank_statements
                .extend(statements[start..].iter().map(UnmatchedResult::from));
        }
        // equal cardinality: fully matched
    }

    output
}
