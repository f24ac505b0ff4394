//! Validation utilities for job submission

use chrono::NaiveDate;

use crate::config::ReconcilerConfig;
use crate::types::*;

/// Validate that a date range is well formed and not too wide
pub fn validate_date_range(start: NaiveDate, end: NaiveDate, max_days: i64) -> ReconResult<()> {
    if start > end {
        return Err(ReconError::Validation(format!(
            "Start date {start} is after end date {end}"
        )));
    }

    let days = DateRange::new(start, end).len_days();
    if days > max_days {
        return Err(ReconError::Validation(format!(
            "Date range covers {days} days, at most {max_days} allowed"
        )));
    }

    Ok(())
}

/// Validate a requested worker count
pub fn validate_concurrency(concurrency: i64, max: usize) -> ReconResult<usize> {
    if concurrency < 1 {
        return Err(ReconError::Validation(
            "Concurrency must be at least 1".to_string(),
        ));
    }

    let concurrency = usize::try_from(concurrency)
        .map_err(|_| ReconError::Validation("Concurrency is too large".to_string()))?;
    if concurrency > max {
        return Err(ReconError::Validation(format!(
            "Concurrency cannot exceed {max}"
        )));
    }

    Ok(concurrency)
}

/// Validate a full submission request against the configured limits
pub fn validate_submission(
    start: NaiveDate,
    end: NaiveDate,
    concurrency: i64,
    config: &ReconcilerConfig,
) -> ReconResult<usize> {
    validate_date_range(start, end, config.max_range_days)?;
    validate_concurrency(concurrency, config.max_concurrency)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    #[test]
    fn test_date_range() {
        assert!(validate_date_range(jan(1), jan(1), 1).is_ok());
        assert!(validate_date_range(jan(1), jan(31), 31).is_ok());
        assert!(validate_date_range(jan(2), jan(1), 31).is_err());
        assert!(validate_date_range(jan(1), jan(3), 2).is_err());
    }

    #[test]
    fn test_concurrency() {
        assert_eq!(validate_concurrency(1, 4).unwrap(), 1);
        assert_eq!(validate_concurrency(4, 4).unwrap(), 4);
        assert!(validate_concurrency(0, 4).is_err());
        assert!(validate_concurrency(-3, 4).is_err());
        assert!(validate_concurrency(5, 4).is_err());
    }

    #[test]
    fn test_submission_uses_config_limits() {
        let config = ReconcilerConfig {
            max_concurrency: 2,
            max_range_days: 7,
            ..ReconcilerConfig::default()
        };
        assert_eq!(validate_submission(jan(1), jan(7), 2, &config).unwrap(), 2);
        assert!(validate_submission(jan(1), jan(8), 2, &config).is_err());
        assert!(validate_submission(jan(1), jan(7), 3, &config).is_err());
    }
}
