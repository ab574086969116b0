use std::sync::Arc;
use std::time::Duration;

use entry_store::{EntryStore, StoreError};
use form_codec::{DATE_FIELD, FormSurface, Snapshot};
use journal_types::{Account, Entry, EntryDate, RemoteMirror, SessionGate};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cycle::{JournalSaveCycle, SaveStatus, SessionSlot};
use crate::scheduler::AutosaveScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Local,
    Empty,
}

pub struct JournalPage<F> {
    store: Arc<EntryStore>,
    form: Arc<Mutex<F>>,
    mirror: Option<Arc<dyn RemoteMirror>>,
    session: SessionSlot,
    scheduler: AutosaveScheduler<JournalSaveCycle<F>>,
}

impl<F> JournalPage<F>
where
    F: FormSurface + Send + 'static,
{
    pub fn new(
        store: Arc<EntryStore>,
        form: Arc<Mutex<F>>,
        mirror: Option<Arc<dyn RemoteMirror>>,
        delay: Duration,
    ) -> Self {
        let session: SessionSlot = Arc::new(RwLock::new(None));
        let cycle = JournalSaveCycle::new(
            Arc::clone(&store),
            Arc::clone(&form),
            mirror.clone(),
            Arc::clone(&session),
        );
        Self {
            store,
            form,
            mirror,
            session,
            scheduler: AutosaveScheduler::new(cycle, delay),
        }
    }

    pub fn form(&self) -> &Arc<Mutex<F>> {
        &self.form
    }

    pub fn account(&self) -> Option<Account> {
        self.session.read().clone()
    }

    pub fn set_account(&self, account: Option<Account>) {
        match &account {
            Some(account) => info!(account = %account.id, "session active"),
            None => debug!("no active session"),
        }
        *self.session.write() = account;
    }

    /// Asks the gate who is signed in. Gate failures read as signed out.
    pub async fn resolve_session(&self, gate: &dyn SessionGate) -> Option<Account> {
        let account = match gate.current_account().await {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, "session lookup failed, continuing signed out");
                None
            }
        };
        self.set_account(account.clone());
        account
    }

    pub fn active_date(&self) -> Option<EntryDate> {
        self.form
            .lock()
            .text(DATE_FIELD)
            .and_then(|raw| EntryDate::parse(&raw))
    }

    /// Fills the form for the active date. With a session a remote row wins,
    /// otherwise the local entry is used. Whichever is found replaces every
    /// field on the form.
    pub async fn load(&self, date_override: Option<EntryDate>) -> LoadSource {
        let date = {
            let mut form = self.form.lock();
            let date = date_override
                .or_else(|| form.text(DATE_FIELD).and_then(|raw| EntryDate::parse(&raw)))
                .unwrap_or_else(EntryDate::today);
            form.set_text(DATE_FIELD, date.to_string());
            date
        };

        let (source, snapshot) = match self.remote_snapshot(&date).await {
            Some(snapshot) => (LoadSource::Remote, Some(snapshot)),
            None => match self.store.get_by_date(&date) {
                Some(entry) => (LoadSource::Local, Some(entry.data)),
                None => (LoadSource::Empty, None),
            },
        };
        if let Some(snapshot) = snapshot {
            let mut form = self.form.lock();
            form_codec::clear_fields(&mut *form, DATE_FIELD);
            let applied = form_codec::apply(&mut *form, &snapshot);
            debug!(date = %date, applied, "snapshot applied");
        }
        info!(date = %date, source = ?source, "entry loaded");
        source
    }

    /// Loads, then saves so the day shows up in the library.
    pub async fn open(&self, date_override: Option<EntryDate>) -> LoadSource {
        let source = self.load(date_override).await;
        self.scheduler.request_save();
        source
    }

    async fn remote_snapshot(&self, date: &EntryDate) -> Option<Snapshot> {
        let mirror = self.mirror.as_ref()?;
        let account = self.account()?;
        match mirror.get_by_date(&account, date).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(date = %date, error = %err, "remote lookup failed, using local entry");
                None
            }
        }
    }

    /// Saves the current date, clears the form and loads `date`.
    pub async fn switch_date(&self, date: EntryDate) -> Result<LoadSource, StoreError> {
        self.flush()?;
        form_codec::clear_fields(&mut *self.form.lock(), DATE_FIELD);
        Ok(self.open(Some(date)).await)
    }

    pub fn edit<R>(&self, change: impl FnOnce(&mut F) -> R) -> R {
        let result = change(&mut *self.form.lock());
        self.scheduler.notify_activity();
        result
    }

    pub fn reset_today(&self) {
        {
            let mut form = self.form.lock();
            form.set_text(DATE_FIELD, EntryDate::today().to_string());
            form_codec::clear_fields(&mut *form, DATE_FIELD);
        }
        info!("form reset");
        self.scheduler.request_save();
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Runs a pending save immediately. `Ok(None)` when nothing was pending.
    pub fn flush(&self) -> Result<Option<Entry>, StoreError> {
        self.scheduler.flush().transpose()
    }

    /// Flushes, then waits for remote writes still in flight.
    pub async fn shutdown(&self) -> Result<Option<Entry>, StoreError> {
        let flushed = self.flush();
        self.scheduler.cycle().drain_mirror_writes().await;
        flushed
    }

    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.scheduler.cycle().subscribe()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.store.list()
    }

    pub fn delete(&self, date: &EntryDate) -> Result<bool, StoreError> {
        let removed = self.store.remove(date)?;
        if removed {
            info!(date = %date, "entry deleted");
        }
        Ok(removed)
    }
}
