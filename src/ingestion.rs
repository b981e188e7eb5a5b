use std::io::Read;
use std::pin::Pin;

use futures::stream::{self, Stream};
use serde::Deserialize;

use crate::domain::{Error, JournalKind, JournalRecord, JournalStream, Money, TenantId};

/// Reads a wallet journal export, one ledger movement per row:
/// `tenant, kind, reference, amount` (amount empty for hold_release /
/// hold_commit rows).
pub struct CsvReader<R: Read> {
    reader: Option<csv::Reader<R>>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R) -> Result<Self, Error> {
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Ok(Self { reader: Some(rdr) })
    }
}

/// Internal shape used only for CSV deserialization.
#[derive(Debug, Deserialize)]
struct CsvRow {
    tenant: u32,
    kind: String,
    reference: String,
    amount: Option<Money>,
}

impl TryFrom<CsvRow> for JournalRecord {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self, Self::Error> {
        let kind = match (row.kind.trim().to_ascii_lowercase().as_str(), row.amount) {
            ("credit_fee", Some(amount)) => JournalKind::CreditFee { amount },
            ("debit_usage", Some(amount)) => JournalKind::DebitUsage { amount },
            ("hold", Some(amount)) => JournalKind::Hold { amount },
            ("hold_release", None) => JournalKind::HoldRelease,
            ("hold_commit", None) => JournalKind::HoldCommit,
            ("credit_fee" | "debit_usage" | "hold", None) => {
                return Err(Error::Ingestion(format!(
                    "Missing amount for {} entry (ref {})",
                    row.kind, row.reference
                )));
            }
            ("hold_release" | "hold_commit", Some(_)) => {
                return Err(Error::Ingestion(format!(
                    "Unexpected amount on {} entry (ref {})",
                    row.kind, row.reference
                )));
            }
            (other, _) => {
                return Err(Error::Ingestion(format!("Invalid entry kind: {}", other)));
            }
        };

        Ok(JournalRecord {
            kind,
            tenant_id: TenantId(row.tenant),
            reference: row.reference.into(),
        })
    }
}

impl<R: Read + Send + 'static> JournalStream for CsvReader<R> {
    type RecordStream = Pin<Box<dyn Stream<Item = Result<JournalRecord, Error>> + Send>>;

    fn stream(&mut self) -> Self::RecordStream {
        // Take ownership of the reader so the iterator we build owns all data and is 'static.
        let reader = match self.reader.take() {
            Some(r) => r,
            None => {
                // Already consumed; return an empty stream.
                return Box::pin(stream::iter(Vec::<Result<JournalRecord, Error>>::new()));
            }
        };

        let iter = reader
            .into_deserialize::<CsvRow>()
            .map(|row_res| match row_res {
                Ok(row) => JournalRecord::try_from(row),
                Err(e) => Err(Error::Ingestion(format!(
                    "CSV deserialization error: {}",
                    e
                ))),
            });

        Box::pin(stream::iter(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(input: &str) -> Vec<Result<JournalRecord, Error>> {
        let mut reader = CsvReader::new(std::io::Cursor::new(input.as_bytes().to_vec())).unwrap();
        reader.stream().collect().await
    }

    #[test]
    fn parses_all_kinds() {
        let rows = futures::executor::block_on(collect(
            "tenant, kind, reference, amount\n\
             1, credit_fee, fee-1, 250.00\n\
             1, debit_usage, usage-1, 10.5\n\
             1, hold, wd-1, 100\n\
             1, hold_release, wd-1,\n\
             1, hold_commit, wd-2,",
        ));
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn bad_amount_is_an_error_not_zero() {
        let rows = futures::executor::block_on(collect(
            "tenant, kind, reference, amount\n\
             1, credit_fee, fee-1, not-a-number",
        ));
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], Err(Error::Ingestion(_))));
    }

    #[test]
    fn missing_amount_on_hold_is_an_error() {
        let rows = futures::executor::block_on(collect(
            "tenant, kind, reference, amount\n\
             1, hold, wd-1,",
        ));
        assert!(matches!(rows[0], Err(Error::Ingestion(_))));
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let rows = futures::executor::block_on(collect(
            "tenant, kind, reference, amount\n\
             1, chargeback, x-1, 5",
        ));
        assert!(matches!(rows[0], Err(Error::Ingestion(_))));
    }
}
