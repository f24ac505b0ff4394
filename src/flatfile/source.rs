//! CSV record source over per-day directories
//!
//! Layout, one directory per day named `DDMMYYYY`:
//!
//! ```text
//! <data_dir>/01012021/transaction_1.csv
//! <data_dir>/01012021/BCA_1.csv
//! <data_dir>/01012021/BRI_1.csv
//! ```
//!
//! Transaction files start with `transaction`. Any other CSV whose name
//! contains a configured bank name is a statement file of that bank; files
//! matching no bank are skipped.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::traits::RecordSource;
use crate::types::*;

/// Directory name format for a day
pub const DAY_DIR_FORMAT: &str = "%d%m%Y";
pub const TRANSACTION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const STATEMENT_DATE_FORMAT: &str = "%Y-%m-%d";

const TRANSACTION_FILE_PREFIX: &str = "transaction";

#[derive(Debug, Deserialize)]
struct TransactionRow {
    #[serde(rename = "trxID")]
    trx_id: String,
    amount: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(rename = "transactionTime")]
    transaction_time: String,
}

#[derive(Debug, Deserialize)]
struct BankStatementRow {
    unique_identifier: String,
    amount: String,
    date: String,
}

/// Record source reading CSV files from a data directory
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    data_dir: PathBuf,
    bank_names: Vec<String>,
}

impl CsvRecordSource {
    pub fn new(data_dir: impl Into<PathBuf>, bank_names: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            bank_names,
        }
    }

    /// Directory holding the files for `day`
    pub fn day_dir(&self, day: NaiveDate) -> PathBuf {
        self.data_dir.join(day.format(DAY_DIR_FORMAT).to_string())
    }

    /// Bank a file belongs to, judged by its name
    pub fn bank_for_file(&self, file_name: &str) -> Option<&str> {
        self.bank_names
            .iter()
            .map(String::as_str)
            .find(|bank| file_name.contains(bank))
    }

    /// CSV files of one day, sorted by name
    async fn csv_files(&self, day: NaiveDate) -> ReconResult<Vec<(String, PathBuf)>> {
        let dir = self.day_dir(day);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ReconError::Load(format!("{}: {e}", dir.display())))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReconError::Load(format!("{}: {e}", dir.display())))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".csv") {
                files.push((name, entry.path()));
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    async fn load_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconResult<Vec<Transaction>> {
        let mut transactions = Vec::new();

        for day in DateRange::new(start, end).days() {
            let files: Vec<_> = self
                .csv_files(day)
                .await?
                .into_iter()
                .filter(|(name, _)| name.starts_with(TRANSACTION_FILE_PREFIX))
                .collect();
            if files.is_empty() {
                return Err(ReconError::Load(format!(
                    "no transaction file in {}",
                    self.day_dir(day).display()
                )));
            }

            for (_, path) in files {
                let data = read_file(&path).await?;
                transactions.extend(parse_transactions(&data).map_err(|e| at(&path, e))?);
            }
        }

        tracing::debug!(count = transactions.len(), %start, %end, "transactions loaded");
        Ok(transactions)
    }

    async fn load_bank_statements(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconResult<Vec<BankStatement>> {
        let mut statements = Vec::new();

        for day in DateRange::new(start, end).days() {
            for (name, path) in self.csv_files(day).await? {
                if name.starts_with(TRANSACTION_FILE_PREFIX) {
                    continue;
                }
                let Some(bank) = self.bank_for_file(&name) else {
                    tracing::debug!(file = %path.display(), "skipping file with unknown bank");
                    continue;
                };

                let data = read_file(&path).await?;
                statements.extend(parse_bank_statements(&data, bank).map_err(|e| at(&path, e))?);
            }
        }

        tracing::debug!(count = statements.len(), %start, %end, "bank statements loaded");
        Ok(statements)
    }
}

async fn read_file(path: &Path) -> ReconResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReconError::Load(format!("{}: {e}", path.display())))
}

fn at(path: &Path, err: ReconError) -> ReconError {
    match err {
        ReconError::Load(msg) => ReconError::Load(format!("{}: {msg}", path.display())),
        other => other,
    }
}

fn parse_amount(raw: &str) -> ReconResult<BigDecimal> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| ReconError::Load(format!("invalid amount '{raw}': {e}")))
}

/// Parse ledger transactions from CSV text with a header row
pub fn parse_transactions(data: &str) -> ReconResult<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    reader
        .deserialize::<TransactionRow>()
        .map(|row| -> ReconResult<Transaction> {
            let row = row.map_err(|e| ReconError::Load(e.to_string()))?;
            let transaction_type =
                TransactionType::try_from(row.kind).map_err(ReconError::Load)?;
            let transaction_time =
                NaiveDateTime::parse_from_str(&row.transaction_time, TRANSACTION_TIME_FORMAT)
                    .map_err(|e| {
                        ReconError::Load(format!(
                            "invalid transaction time '{}': {e}",
                            row.transaction_time
                        ))
                    })?;

            Ok(Transaction::new(
                row.trx_id,
                parse_amount(&row.amount)?,
                transaction_type,
                transaction_time,
            ))
        })
        .collect()
}

/// Parse statement lines of `bank` from CSV text with a header row
pub fn parse_bank_statements(data: &str, bank: &str) -> ReconResult<Vec<BankStatement>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    reader
        .deserialize::<BankStatementRow>()
        .map(|row| -> ReconResult<BankStatement> {
            let row = row.map_err(|e| ReconError::Load(e.to_string()))?;
            let date = NaiveDate::parse_from_str(&row.date, STATEMENT_DATE_FORMAT)
                .map_err(|e| ReconError::Load(format!("invalid date '{}': {e}", row.date)))?;

            Ok(BankStatement::new(
                row.unique_identifier,
                parse_amount(&row.amount)?,
                date,
                bank,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transactions() {
        let data = "trxID,amount,type,transactionTime\n\
                    T1,100.50,1,2021-01-01T10:00:00\n\
                    T2,-20,2,2021-01-01T11:30:15\n";
        let txs = parse_transactions(data).unwrap();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].trx_id, "T1");
        assert_eq!(txs[0].amount, BigDecimal::from_str("100.50").unwrap());
        assert_eq!(txs[1].transaction_type, TransactionType::Debit);
        assert_eq!(txs[1].transaction_time.to_string(), "2021-01-01 11:30:15");
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        let bad_type = "trxID,amount,type,transactionTime\nT1,1,7,2021-01-01T10:00:00\n";
        assert!(matches!(parse_transactions(bad_type), Err(ReconError::Load(_))));

        let bad_amount = "unique_identifier,amount,date\nB1,abc,2021-01-01\n";
        assert!(parse_bank_statements(bad_amount, "BCA").is_err());

        let bad_date = "unique_identifier,amount,date\nB1,1,01/01/2021\n";
        assert!(parse_bank_statements(bad_date, "BCA").is_err());
    }

    #[test]
    fn test_parse_bank_statements_tags_bank() {
        let data = "unique_identifier,amount,date\nB1,100,2021-01-01\nB2,-3.25,2021-01-01\n";
        let statements = parse_bank_statements(data, "BRI").unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.bank == "BRI"));
        assert_eq!(statements[1].amount, BigDecimal::from_str("-3.25").unwrap());
    }

    #[test]
    fn test_day_dir_and_bank_detection() {
        let source = CsvRecordSource::new("data", vec!["BCA".to_string(), "BRI".to_string()]);
        let day = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!(source.day_dir(day), PathBuf::from("data").join("02012021"));

        let day = NaiveDate::from_ymd_opt(2021, 2, 3).unwrap();
        assert_eq!(source.day_dir(day), PathBuf::from("data").join("03022021"));
        assert_eq!(source.bank_for_file("BRI_1.csv"), Some("BRI"));
        assert_eq!(source.bank_for_file("MANDIRI_1.csv"), None);
    }
}
