use crate::domain::{DeadLetterQueue, Error};

/// Stderr dead-letter sink for the audit binary: rejected journal rows are
/// printed, never silently dropped or zeroed.
#[derive(Default, Debug)]
pub struct StdErrDLQ {}

impl DeadLetterQueue for StdErrDLQ {
    fn report(&self, error: &Error) {
        eprintln!("journal DLQ - rejected record: {}", error);
    }
}
