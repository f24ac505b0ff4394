//! Canonical (date, amount) grouping key

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BankStatement, Transaction};

/// Decimal places kept when building the key string
pub const KEY_AMOUNT_SCALE: i64 = 2;

/// Key that buckets records from both sides before comparison
///
/// Two records match structurally iff their keys are equal. The amount is
/// normalised to a fixed scale so `100`, `100.0` and `100.00` share a key.
/// Digits beyond the second decimal place are rounded half-even before
/// keying, so `100.004` and `100.001` also share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub amount: BigDecimal,
}

impl MatchKey {
    pub fn new(date: NaiveDate, amount: &BigDecimal) -> Self {
        Self {
            date,
            amount: amount.with_scale_round(KEY_AMOUNT_SCALE, RoundingMode::HalfEven),
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.date.format("%Y-%m-%d"), self.amount)
    }
}

/// Records that can be bucketed by [`MatchKey`]
pub trait Keyed {
    fn match_key(&self) -> MatchKey;
}

impl Keyed for Transaction {
    fn match_key(&self) -> MatchKey {
        MatchKey::new(self.date(), &self.amount)
    }
}

impl Keyed for BankStatement {
    fn match_key(&self) -> MatchKey {
        MatchKey::new(self.date, &self.amount)
    }
}
