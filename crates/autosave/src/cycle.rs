use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use entry_store::{EntryStore, StoreError};
use form_codec::{DATE_FIELD, FormSurface};
use journal_types::{Account, Entry, EntryDate, RemoteMirror};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::scheduler::SaveCycle;

/// Outcome of the most recent save cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saved { date: EntryDate, updated_at: i64 },
    Failed { message: String },
}

pub type SessionSlot = Arc<RwLock<Option<Account>>>;

pub struct JournalSaveCycle<F> {
    store: Arc<EntryStore>,
    form: Arc<Mutex<F>>,
    mirror: Option<Arc<dyn RemoteMirror>>,
    session: SessionSlot,
    status: watch::Sender<SaveStatus>,
    last_updated_at: AtomicI64,
    mirror_writes: Mutex<JoinSet<()>>,
}

impl<F> JournalSaveCycle<F>
where
    F: FormSurface + Send + 'static,
{
    pub fn new(
        store: Arc<EntryStore>,
        form: Arc<Mutex<F>>,
        mirror: Option<Arc<dyn RemoteMirror>>,
        session: SessionSlot,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            store,
            form,
            mirror,
            session,
            status,
            last_updated_at: AtomicI64::new(0),
            mirror_writes: Mutex::new(JoinSet::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Wall-clock millis, bumped when needed so successive saves never repeat
    /// or go backwards.
    fn next_updated_at(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_updated_at
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    fn mirror_in_background(&self, entry: &Entry) {
        let Some(mirror) = self.mirror.clone() else {
            return;
        };
        let Some(account) = self.session.read().clone() else {
            debug!(date = %entry.date, "no session, skipping remote mirror");
            return;
        };
        let entry = entry.clone();
        let mut writes = self.mirror_writes.lock();
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            if let Err(err) = mirror.upsert(&account, &entry).await {
                warn!(date = %entry.date, error = %err, "remote mirror write failed");
            }
        });
    }

    /// Waits for every remote write issued so far.
    pub async fn drain_mirror_writes(&self) {
        let mut writes = std::mem::take(&mut *self.mirror_writes.lock());
        if !writes.is_empty() {
            debug!(pending = writes.len(), "waiting for remote writes");
        }
        while let Some(joined) = writes.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "remote mirror task did not finish");
            }
        }
    }
}

/// The active date on the form, defaulting to today. A missing or malformed
/// value is replaced on the form so the page shows what was saved.
pub(crate) fn active_date<F: FormSurface + ?Sized>(form: &mut F) -> EntryDate {
    if let Some(date) = form.text(DATE_FIELD).and_then(|raw| EntryDate::parse(&raw)) {
        return date;
    }
    let today = EntryDate::today();
    form.set_text(DATE_FIELD, today.to_string());
    today
}

impl<F> SaveCycle for JournalSaveCycle<F>
where
    F: FormSurface + Send + 'static,
{
    type Output = Result<Entry, StoreError>;

    fn run(&self) -> Self::Output {
        let (date, snapshot) = {
            let mut form = self.form.lock();
            let date = active_date(&mut *form);
            (date, form_codec::capture(&*form))
        };
        let entry = Entry::from_snapshot(date, snapshot, self.next_updated_at());

        if let Err(err) = self.store.upsert(entry.clone()) {
            error!(date = %entry.date, error = %err, "save failed");
            self.status.send_replace(SaveStatus::Failed {
                message: err.to_string(),
            });
            return Err(err);
        }

        info!(date = %entry.date, updated_at = entry.updated_at, "entry saved");
        self.status.send_replace(SaveStatus::Saved {
            date: entry.date.clone(),
            updated_at: entry.updated_at,
        });
        self.mirror_in_background(&entry);
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use entry_store::MemoryMedium;
    use form_codec::MemoryForm;

    use super::*;

    fn cycle_over(store: Arc<EntryStore>) -> (JournalSaveCycle<MemoryForm>, Arc<Mutex<MemoryForm>>) {
        let form = Arc::new(Mutex::new(MemoryForm::journal()));
        let cycle = JournalSaveCycle::new(
            store,
            Arc::clone(&form),
            None,
            Arc::new(RwLock::new(None)),
        );
        (cycle, form)
    }

    #[tokio::test]
    async fn empty_date_defaults_to_today_and_is_written_back() {
        let store = Arc::new(EntryStore::in_memory());
        let (cycle, form) = cycle_over(Arc::clone(&store));

        let entry = cycle.run().expect("save");
        let today = EntryDate::today();
        assert_eq!(entry.date, today);
        assert_eq!(form.lock().text(DATE_FIELD), Some(today.to_string()));
        assert!(store.get_by_date(&today).is_some());
    }

    #[tokio::test]
    async fn updated_at_strictly_increases() {
        let (cycle, form) = cycle_over(Arc::new(EntryStore::in_memory()));
        form.lock().set_text(DATE_FIELD, "2024-03-01".to_string());

        let stamps: Vec<i64> = (0..5)
            .map(|_| cycle.run().expect("save").updated_at)
            .collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn storage_failure_publishes_failed_status() {
        let store = Arc::new(EntryStore::new(Arc::new(MemoryMedium::with_quota(4)), "k"));
        let (cycle, form) = cycle_over(store);
        form.lock().set_text(DATE_FIELD, "2024-03-01".to_string());
        let status = cycle.subscribe();

        let err = cycle.run().expect_err("quota");
        assert!(matches!(err, StoreError::StorageWriteFailed { .. }));
        assert!(matches!(&*status.borrow(), SaveStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn success_publishes_saved_status() {
        let (cycle, form) = cycle_over(Arc::new(EntryStore::in_memory()));
        form.lock().set_text(DATE_FIELD, "2024-03-01".to_string());
        let status = cycle.subscribe();
        assert_eq!(*status.borrow(), SaveStatus::Idle);

        let entry = cycle.run().expect("save");
        assert_eq!(
            *status.borrow(),
            SaveStatus::Saved {
                date: entry.date,
                updated_at: entry.updated_at,
            }
        );
    }
}
