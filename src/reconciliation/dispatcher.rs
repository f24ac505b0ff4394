//! Parallel reduction over contiguous key chunks

use std::any::Any;
use std::collections::BTreeSet;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinSet;

use super::grouper::Grouping;
use super::reducer::{reduce, ExcessBoundary, ReduceOutput};
use crate::types::{BankStatement, ReconError, ReconResult, Transaction};

/// A chunk whose worker did not report a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub chunk: usize,
    pub reason: String,
}

/// Merged result of a dispatch
///
/// Within one chunk's contribution the key order is preserved. Across chunks
/// records appear in worker completion order, which varies between runs.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub unmatched: ReduceOutput,
    pub chunks: usize,
    pub failures: Vec<ChunkFailure>,
}

impl DispatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Unmatched output, or a dispatch error if any chunk failed
    pub fn into_result(self) -> ReconResult<ReduceOutput> {
        if self.failures.is_empty() {
            Ok(self.unmatched)
        } else {
            Err(ReconError::Dispatch {
                failed: self.failures.len(),
                total: self.chunks,
            })
        }
    }
}

/// Split `len` items into `chunks` contiguous ranges
///
/// Ranges are non-overlapping and cover `0..len`; the last one absorbs the
/// remainder of the integer division. Earlier ranges are empty when there
/// are fewer items than chunks.
pub fn partition(len: usize, chunks: usize) -> ReconResult<Vec<Range<usize>>> {
    if chunks == 0 {
        return Err(ReconError::Validation(
            "Concurrency must be at least 1".to_string(),
        ));
    }

    let size = len / chunks;
    Ok((0..chunks)
        .map(|i| {
            let start = i * size;
            let end = if i == chunks - 1 { len } else { start + size };
            start..end
        })
        .collect())
}

/// Run one reducer per chunk of `keys` concurrently and merge their output
///
/// Workers share the groupings read-only and run on the blocking pool. The
/// call returns once every worker has reported; a worker that panics is
/// recorded as a [`ChunkFailure`] while the other chunks' results are kept.
pub async fn dispatch(
    keys: Arc<[String]>,
    transactions: Arc<Grouping<Transaction>>,
    bank_statements: Arc<Grouping<BankStatement>>,
    concurrency: usize,
    boundary: ExcessBoundary,
) -> ReconResult<DispatchOutcome> {
    dispatch_with(keys, transactions, bank_statements, concurrency, boundary, reduce).await
}

pub(crate) async fn dispatch_with<F>(
    keys: Arc<[String]>,
    transactions: Arc<Grouping<Transaction>>,
    bank_statements: Arc<Grouping<BankStatement>>,
    concurrency: usize,
    boundary: ExcessBoundary,
    reducer: F,
) -> ReconResult<DispatchOutcome>
where
    F: Fn(&[String], &Grouping<Transaction>, &Grouping<BankStatement>, ExcessBoundary) -> ReduceOutput
        + Send
        + Sync
        + 'static,
{
    let ranges = partition(keys.len(), concurrency)?;
    let chunks = ranges.len();
    let reducer = Arc::new(reducer);

    tracing::debug!(keys = keys.len(), chunks, "dispatching reduction");

    let mut workers = JoinSet::new();
    for (chunk, range) in ranges.into_iter().enumerate() {
        let keys = Arc::clone(&keys);
        let transactions = Arc::clone(&transactions);
        let bank_statements = Arc::clone(&bank_statements);
        let reducer = Arc::clone(&reducer);
        workers.spawn_blocking(move || {
            let output = panic::catch_unwind(AssertUnwindSafe(|| {
                (*reducer)(&keys[range], &transactions, &bank_statements, boundary)
            }))
            .map_err(|payload| panic_reason(payload.as_ref()));
            (chunk, output)
        });
    }

    let mut outcome = DispatchOutcome {
        chunks,
        ..DispatchOutcome::default()
    };
    let mut reported = BTreeSet::new();

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((chunk, Ok(output))) => {
                reported.insert(chunk);
                outcome.unmatched.extend(output);
            }
            Ok((chunk, Err(reason))) => {
                reported.insert(chunk);
                tracing::error!(chunk, reason = %reason, "reduction worker failed");
                outcome.failures.push(ChunkFailure { chunk, reason });
            }
            // only reachable if the runtime cancels the task
            Err(err) => tracing::error!(error = %err, "reduction worker did not complete"),
        }
    }

    for chunk in (0..chunks).filter(|chunk| !reported.contains(chunk)) {
        outcome.failures.push(ChunkFailure {
            chunk,
            reason: "worker cancelled".to_string(),
        });
    }
    outcome.failures.sort_by_key(|failure| failure.chunk);

    Ok(outcome)
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("worker panicked: {msg}")
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::grouper::{combine_keys, group_by_key};
    use crate::types::{TransactionType, UnmatchedResult};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn sample() -> (Arc<[String]>, Arc<Grouping<Transaction>>, Arc<Grouping<BankStatement>>) {
        let mut txs = Vec::new();
        let mut statements = Vec::new();
        for d in 1..=9u32 {
            let date = NaiveDate::from_ymd_opt(2021, 1, d).unwrap();
            // d transactions vs (d % 4) statements per day
            for n in 0..d {
                txs.push(Transaction::new(
                    format!("t{d}-{n}"),
                    BigDecimal::from(100),
                    TransactionType::Credit,
                    date.and_hms_opt(n, 0, 0).unwrap(),
                ));
            }
            for n in 0..(d % 4) {
                statements.push(BankStatement::new(
                    format!("b{d}-{n}"),
                    BigDecimal::from(100),
                    date,
                    "BRI",
                ));
            }
            statements.push(BankStatement::new(format!("bx{d}"), BigDecimal::from(7), date, "BCA"));
        }
        let txs = group_by_key(txs);
        let statements = group_by_key(statements);
        let keys: Arc<[String]> = combine_keys(txs.keys(), statements.keys()).into();
        (keys, Arc::new(txs), Arc::new(statements))
    }

    fn sorted_ids(results: &[UnmatchedResult]) -> Vec<String> {
        let mut ids: Vec<_> = results.iter().map(|r| r.record_id().to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_partition_covers_all_items() {
        let ranges = partition(10, 3).unwrap();
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);

        let ranges = partition(2, 4).unwrap();
        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..2]);

        assert_eq!(partition(0, 1).unwrap(), vec![0..0]);
    }

    #[test]
    fn test_partition_rejects_zero_chunks() {
        assert!(matches!(partition(5, 0), Err(ReconError::Validation(_))));
    }

    #[tokio::test]
    async fn test_partitioning_does_not_change_results() {
        let (keys, txs, statements) = sample();
        let single = reduce(&keys, &txs, &statements, ExcessBoundary::Exact);

        for concurrency in [1, 2, 3, 5, 8, 20] {
            let outcome = dispatch(
                Arc::clone(&keys),
                Arc::clone(&txs),
                Arc::clone(&statements),
                concurrency,
                ExcessBoundary::Exact,
            )
            .await
            .unwrap();

            assert!(outcome.is_complete());
            assert_eq!(outcome.chunks, concurrency);
            let merged = outcome.into_result().unwrap();
            assert_eq!(sorted_ids(&merged.transactions), sorted_ids(&single.transactions));
            assert_eq!(
                sorted_ids(&merged.bank_statements),
                sorted_ids(&single.bank_statements)
            );
        }
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let (keys, txs, statements) = sample();
        let result = dispatch(keys, txs, statements, 0, ExcessBoundary::Exact).await;
        assert!(matches!(result, Err(ReconError::Validation(_))));
    }

    #[tokio::test]
    async fn test_panicking_chunk_is_reported_and_others_survive() {
        let (keys, txs, statements) = sample();
        let ranges = partition(keys.len(), 3).unwrap();
        let doomed = keys[ranges[1].start].clone();

        let outcome = dispatch_with(
            Arc::clone(&keys),
            Arc::clone(&txs),
            Arc::clone(&statements),
            3,
            ExcessBoundary::Exact,
            move |chunk: &[String], t: &Grouping<Transaction>, b: &Grouping<BankStatement>, boundary| {
                if chunk.contains(&doomed) {
                    panic!("corrupt group");
                }
                reduce(chunk, t, b, boundary)
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].chunk, 1);
        assert!(outcome.failures[0].reason.contains("corrupt group"));

        let survivors: Vec<String> = keys[ranges[0].clone()]
            .iter()
            .chain(&keys[ranges[2].clone()])
            .cloned()
            .collect();
        let kept = reduce(&survivors, &txs, &statements, ExcessBoundary::Exact);
        assert!(!kept.is_empty());
        assert_eq!(sorted_ids(&outcome.unmatched.transactions), sorted_ids(&kept.transactions));
        assert_eq!(
            sorted_ids(&outcome.unmatched.bank_statements),
            sorted_ids(&kept.bank_statements)
        );

        assert!(matches!(
            outcome.into_result(),
            Err(ReconError::Dispatch { failed: 1, total: 3 })
        ));
    }

    #[test]
    fn test_incomplete_outcome_becomes_dispatch_error() {
        let outcome = DispatchOutcome {
            unmatched: ReduceOutput::default(),
            chunks: 4,
            failures: vec![ChunkFailure {
                chunk: 2,
                reason: "panicked".to_string(),
            }],
        };
        assert!(!outcome.is_complete());
        assert!(matches!(
            outcome.into_result(),
            Err(ReconError::Dispatch { failed: 1, total: 4 })
        ));
    }
}
