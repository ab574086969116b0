mod cycle;
mod page;
mod scheduler;

pub use cycle::{JournalSaveCycle, SaveStatus, SessionSlot};
pub use page::{JournalPage, LoadSource};
pub use scheduler::{AutosaveScheduler, SaveCycle};
