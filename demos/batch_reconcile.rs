//! Batch reconciliation over flat files, driven by the background scheduler

use std::time::Duration;

use chrono::NaiveDate;
use reconciliation_core::flatfile::{CsvRecordSource, CsvReportSink, DAY_DIR_FORMAT};
use reconciliation_core::utils::MemoryJobStore;
use reconciliation_core::{
    JobQueue, ReconcilerConfig, ReconciliationEngine, ReconciliationPipeline,
    ReconciliationService,
};
use tracing_subscriber::EnvFilter;

fn write_sample_day(config: &ReconcilerConfig, day: NaiveDate) -> std::io::Result<()> {
    let dir = config.data_dir.join(day.format(DAY_DIR_FORMAT).to_string());
    std::fs::create_dir_all(&dir)?;

    std::fs::write(
        dir.join("transaction_1.csv"),
        format!(
            "trxID,amount,type,transactionTime\n\
             TRX-{d}-1,150000,1,{day}T08:15:00\n\
             TRX-{d}-2,150000,1,{day}T09:40:00\n\
             TRX-{d}-3,-25000,2,{day}T13:05:00\n",
            d = day.format("%d"),
        ),
    )?;
    std::fs::write(
        dir.join("BCA_1.csv"),
        format!("unique_identifier,amount,date\nBCA-{d}-1,150000,{day}\n", d = day.format("%d")),
    )?;
    std::fs::write(
        dir.join("BRI_1.csv"),
        format!(
            "unique_identifier,amount,date\nBRI-{d}-1,-25000,{day}\nBRI-{d}-2,5000,{day}\n",
            d = day.format("%d"),
        ),
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let workspace = tempfile::tempdir()?;
    let config = ReconcilerConfig {
        data_dir: workspace.path().join("data"),
        report_dir: workspace.path().join("report"),
        poll_interval_ms: 100,
        ..ReconcilerConfig::from_env()?
    };

    let start = NaiveDate::from_ymd_opt(2021, 1, 1).ok_or("invalid start date")?;
    let end = NaiveDate::from_ymd_opt(2021, 1, 3).ok_or("invalid end date")?;
    for day in start.iter_days().take_while(|day| *day <= end) {
        write_sample_day(&config, day)?;
    }

    let pipeline = ReconciliationPipeline::with_engine(
        CsvRecordSource::new(&config.data_dir, config.bank_names.clone()),
        CsvReportSink::new(&config.report_dir),
        ReconciliationEngine::with_boundary(config.excess_boundary),
    );
    let queue = JobQueue::new(MemoryJobStore::new(), pipeline)
        .with_poll_interval(config.poll_interval());
    let service = ReconciliationService::new(queue, config);
    let scheduler = service.queue().start();

    service.submit_job(start, end, 2).await?;
    service.submit_job(end, end, 1).await?;
    if let Err(err) = service.submit_job(end, start, 1).await {
        println!("rejected: {err}");
    }

    loop {
        let jobs = service.list_jobs().await?;
        if jobs.iter().all(|job| job.status.is_terminal()) {
            for job in &jobs {
                println!(
                    "{} {} summary={} unmatched={}",
                    job.id,
                    job.status,
                    job.report_location.as_deref().unwrap_or("-"),
                    job.unmatched_location.as_deref().unwrap_or("-"),
                );
            }
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    scheduler.shutdown().await;

    let first = &service.list_jobs().await?[0];
    if let Some(path) = &first.unmatched_location {
        println!("\n{}", std::fs::read_to_string(path)?);
    }
    Ok(())
}
