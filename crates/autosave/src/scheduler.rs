use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{trace, warn};

/// The unit of work the scheduler debounces.
pub trait SaveCycle: Send + Sync + 'static {
    type Output: Send + 'static;

    fn run(&self) -> Self::Output;
}

struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingTimer>,
    last_generation: u64,
}

struct Inner<C> {
    cycle: C,
    delay: Duration,
    slot: Mutex<Slot>,
    // Held for the duration of a cycle so cycles never overlap.
    running: Mutex<()>,
}

impl<C: SaveCycle> Inner<C> {
    /// Takes the slot for the timer of `generation` if it is still the armed
    /// one. The returned guard is the cycle lock, taken before the slot is
    /// cleared so a flush that finds the slot empty waits for this cycle.
    fn claim(&self, generation: u64) -> Option<MutexGuard<'_, ()>> {
        let running = self.running.lock();
        let mut slot = self.slot.lock();
        match &slot.pending {
            Some(timer) if timer.generation == generation => {
                slot.pending = None;
                Some(running)
            }
            _ => None,
        }
    }

    fn run_cycle(&self) -> C::Output {
        let _running = self.running.lock();
        self.cycle.run()
    }
}

/// Debounces activity into save cycles through a single timer slot. Cycles
/// run on the blocking pool. Must be used from within a Tokio runtime.
pub struct AutosaveScheduler<C> {
    inner: Arc<Inner<C>>,
}

impl<C: SaveCycle> AutosaveScheduler<C> {
    pub fn new(cycle: C, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cycle,
                delay,
                slot: Mutex::new(Slot::default()),
                running: Mutex::new(()),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn cycle(&self) -> &C {
        &self.inner.cycle
    }

    pub fn notify_activity(&self) {
        self.arm();
    }

    pub fn request_save(&self) {
        self.arm();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }

    /// Runs the pending cycle now. Returns `None` when nothing was pending,
    /// after waiting out a cycle its timer already started.
    pub fn flush(&self) -> Option<C::Output> {
        let pending = self.inner.slot.lock().pending.take();
        match pending {
            Some(timer) => {
                timer.handle.abort();
                trace!(generation = timer.generation, "flushing pending save");
                Some(self.inner.run_cycle())
            }
            None => {
                drop(self.inner.running.lock());
                None
            }
        }
    }

    /// Drops the pending timer without running it. Returns whether one existed.
    pub fn cancel(&self) -> bool {
        match self.inner.slot.lock().pending.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    fn arm(&self) {
        let deadline = Instant::now() + self.inner.delay;
        let mut slot = self.inner.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
            trace!(generation = previous.generation, "debounce timer rearmed");
        }

        slot.last_generation += 1;
        let generation = slot.last_generation;
        let inner = Arc::clone(&self.inner);
        // The slot lock is held until the handle is stored, so the task can
        // never claim a slot that does not yet name it.
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            let fired = tokio::task::spawn_blocking(move || {
                if let Some(_running) = inner.claim(generation) {
                    inner.cycle.run();
                }
            });
            if let Err(err) = fired.await {
                warn!(generation, error = %err, "save cycle did not complete");
            }
        });
        slot.pending = Some(PendingTimer { generation, handle });
    }
}
