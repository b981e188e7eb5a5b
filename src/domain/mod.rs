pub mod attempt;
pub mod entry;
pub mod error;
pub mod ids;
pub mod money;
pub mod traits;

pub use attempt::{AttemptState, Destination, WithdrawalAttempt};
pub use entry::{EntryKind, JournalKind, JournalRecord, LedgerEntry};
pub use error::Error;
pub use ids::{AttemptId, EntryId, GatewayReference, ReferenceId, TenantId};
pub use money::Money;
pub use traits::{Clock, DeadLetterQueue, JournalStream, ManualClock, SystemClock};
