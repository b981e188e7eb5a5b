use std::{env, fs::File, path::Path, sync::Arc};

use futures::StreamExt;

use wallet_engine::dlq::StdErrDLQ;
use wallet_engine::domain::{DeadLetterQueue, JournalStream, SystemClock};
use wallet_engine::ingestion::CsvReader;
use wallet_engine::ledger::LedgerStore;
use wallet_engine::report::CsvBalanceReport;

/// Audit tool: replays a wallet journal export through a fresh ledger and
/// prints the per-tenant balance sheet. Rows that fail validation are
/// reported on stderr and excluded; they are never silently zeroed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args();
    let file_path = args
        .nth(1)
        .ok_or("usage: wallet_engine <journal.csv>")?;
    let file = File::open(Path::new(&file_path))?;

    let ledger = Arc::new(LedgerStore::new(Arc::new(SystemClock)));
    let dlq = StdErrDLQ::default();
    let mut ingestion = CsvReader::new(file)?;

    let mut records = ingestion.stream();
    while let Some(record) = records.next().await {
        match record.and_then(|r| ledger.apply_journal(r)) {
            Ok(_) => {}
            Err(e) => dlq.report(&e),
        }
    }

    let mut report = CsvBalanceReport::new(std::io::stdout());
    report.write(&ledger)?;

    Ok(())
}
