use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use futures::Stream;

use crate::domain::{Error, JournalRecord};

/// Source of journal records for the audit replay pipeline.
pub trait JournalStream {
    type RecordStream: Stream<Item = Result<JournalRecord, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::RecordStream;
}

/// Sink for records that could not be applied. Nothing affecting money is
/// ever swallowed; every rejected record goes through here.
pub trait DeadLetterQueue {
    fn report(&self, error: &Error);
}

/// Time source, injected so expiry and backoff windows are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Hand-advanced clock for exercising retry and expiry windows.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
