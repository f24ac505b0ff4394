//! CSV report sink writing one file per artifact

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::traits::ReportSink;
use crate::types::*;

const UNMATCHED_HEADER: [&str; 6] = [
    "trxID",
    "unique_identifier",
    "amount",
    "type",
    "transactionTime",
    "bank_name",
];

const SUMMARY_HEADER: [&str; 4] = [
    "total_transactions_processed",
    "total_matched_transactions",
    "total_unmatched_transactions",
    "total_discrepancies",
];

#[derive(Debug, Serialize)]
struct UnmatchedRow<'a> {
    #[serde(rename = "trxID")]
    trx_id: &'a str,
    unique_identifier: &'a str,
    amount: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(rename = "transactionTime")]
    transaction_time: String,
    bank_name: &'a str,
}

impl<'a> From<&'a UnmatchedResult> for UnmatchedRow<'a> {
    fn from(result: &'a UnmatchedResult) -> Self {
        Self {
            trx_id: result.trx_id.as_deref().unwrap_or_default(),
            unique_identifier: result.unique_identifier.as_deref().unwrap_or_default(),
            amount: result.amount.to_string(),
            kind: result.transaction_type.into(),
            transaction_time: format_time(&result.transaction_time),
            bank_name: result.bank_name.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    total_transactions_processed: usize,
    total_matched_transactions: usize,
    total_unmatched_transactions: usize,
    total_discrepancies: String,
}

fn format_time(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Report sink writing `unmatched_<id>.csv` and `summary_<id>.csv`
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    report_dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn unmatched_path(&self, destination_id: &str) -> PathBuf {
        self.report_dir.join(format!("unmatched_{destination_id}.csv"))
    }

    pub fn summary_path(&self, destination_id: &str) -> PathBuf {
        self.report_dir.join(format!("summary_{destination_id}.csv"))
    }

    /// Write `header` followed by `rows`; the header is written even when
    /// there are no rows
    async fn write_rows<T: Serialize>(
        &self,
        path: &Path,
        header: &[&str],
        rows: &[T],
    ) -> ReconResult<String> {
        let persist = |e: &dyn std::fmt::Display| {
            ReconError::Persist(format!("{}: {e}", path.display()))
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(header).map_err(|e| persist(&e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| persist(&e))?;
        }
        let bytes = writer.into_inner().map_err(|e| persist(&e))?;

        tokio::fs::create_dir_all(&self.report_dir)
            .await
            .map_err(|e| persist(&e))?;
        tokio::fs::write(path, bytes).await.map_err(|e| persist(&e))?;

        tracing::debug!(file = %path.display(), rows = rows.len(), "report written");
        Ok(path.display().to_string())
    }
}

#[async_trait]
impl ReportSink for CsvReportSink {
    async fn write_unmatched(
        &self,
        results: &[UnmatchedResult],
        destination_id: &str,
    ) -> ReconResult<String> {
        let rows: Vec<UnmatchedRow<'_>> = results.iter().map(UnmatchedRow::from).collect();
        self.write_rows(&self.unmatched_path(destination_id), &UNMATCHED_HEADER, &rows)
            .await
    }

    async fn write_summary(
        &self,
        summary: &ReconciliationSummary,
        destination_id: &str,
    ) -> ReconResult<String> {
        let row = SummaryRow {
            total_transactions_processed: summary.total_transactions_processed,
            total_matched_transactions: summary.total_matched_transactions,
            total_unmatched_transactions: summary.total_unmatched_transactions,
            total_discrepancies: summary.total_discrepancies.to_string(),
        };
        self.write_rows(&self.summary_path(destination_id), &SUMMARY_HEADER, &[row])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_writes_unmatched_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvReportSink::new(dir.path().join("report"));
        let statement = BankStatement::new(
            "B9",
            BigDecimal::from(-40),
            NaiveDate::from_ymd_opt(2021, 1, 5).unwrap(),
            "BCA",
        );

        let location = sink
            .write_unmatched(&[UnmatchedResult::from(&statement)], "job-1")
            .await
            .unwrap();
        let written = std::fs::read_to_string(&location).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("trxID,unique_identifier,amount,type,transactionTime,bank_name")
        );
        assert_eq!(lines.next(), Some(",B9,-40,2,2021-01-05T00:00:00,BCA"));

        let summary = ReconciliationSummary {
            total_transactions_processed: 3,
            total_matched_transactions: 2,
            total_unmatched_transactions: 2,
            total_discrepancies: BigDecimal::from(40),
        };
        let location = sink.write_summary(&summary, "job-1").await.unwrap();
        assert!(location.ends_with("summary_job-1.csv"));
        let written = std::fs::read_to_string(&location).unwrap();
        assert!(written.contains("3,2,2,40"));
    }

    #[tokio::test]
    async fn test_empty_unmatched_report_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvReportSink::new(dir.path());

        let location = sink.write_unmatched(&[], "job-3").await.unwrap();
        let written = std::fs::read_to_string(&location).unwrap();
        assert_eq!(
            written,
            "trxID,unique_identifier,amount,type,transactionTime,bank_name\n"
        );
    }

    #[tokio::test]
    async fn test_summary_header_matches_columns() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvReportSink::new(dir.path());
        let summary = ReconciliationSummary {
            total_transactions_processed: 0,
            total_matched_transactions: 0,
            total_unmatched_transactions: 0,
            total_discrepancies: BigDecimal::from(0),
        };

        let location = sink.write_summary(&summary, "job-4").await.unwrap();
        let written = std::fs::read_to_string(&location).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some(SUMMARY_HEADER.join(",").as_str()));
        assert_eq!(lines.next(), Some("0,0,0,0"));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_a_persist_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let sink = CsvReportSink::new(&blocker);
        let result = sink.write_unmatched(&[], "job-2").await;
        assert!(matches!(result, Err(ReconError::Persist(_))));
    }
}
