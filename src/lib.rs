//! # Reconciliation Core
//!
//! Batch reconciliation of internal ledger transactions against external bank
//! statements, with a single-flight job scheduler driving the engine.
//!
//! ## Features
//!
//! - **Exact matching**: records are bucketed by a `(date, amount)` match key
//! - **Parallel reduction**: the key set is split into contiguous chunks reduced concurrently
//! - **Job queue**: submitted jobs run one at a time, `pending -> running -> finished | failed`
//! - **Storage abstraction**: records, reports and jobs sit behind async traits
//! - **Flat files**: CSV record source and report sink for per-day directories
//!
//! Matching is decided on group cardinality only. Correctness of matching is
//! guaranteed only up to group cardinality, not per-record pairing.
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{BankStatement, ReconciliationEngine, Transaction, TransactionType};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn run() -> reconciliation_core::ReconResult<()> {
//! let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
//! let txs = vec![Transaction::new(
//!     "T1",
//!     BigDecimal::from(100),
//!     TransactionType::Credit,
//!     day.and_hms_opt(9, 0, 0).unwrap(),
//! )];
//! let statements = vec![BankStatement::new("B1", BigDecimal::from(100), day, "BCA")];
//!
//! let report = ReconciliationEngine::new().reconcile(txs, statements, 2).await?;
//! assert_eq!(report.summary.total_matched_transactions, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod flatfile;
pub mod jobs;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::ReconcilerConfig;
pub use jobs::*;
pub use reconciliation::{
    ExcessBoundary, MatchKey, ReconciliationEngine, ReconciliationReport, ReduceOutput,
};
pub use traits::*;
pub use types::*;
