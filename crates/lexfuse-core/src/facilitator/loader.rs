use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, debug_span, warn};

use super::group::DictionaryGroup;
use super::{DictionaryInitializationListener, Shared};
use crate::context::ImeContext;
use crate::dict::ExpandableDictionary;
use crate::locale::Locale;

// ---------------------------------------------------------------------------
// Latch
// ---------------------------------------------------------------------------

/// Count-down latch: waiters are released once the count reaches zero.
#[derive(Debug)]
pub struct Latch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn count_down(&self) {
        let mut count = self.lock();
        if *count > 0 {
            *count -= 1;
            if *count == 0 {
                self.zero.notify_all();
            }
        }
    }

    pub fn count(&self) -> usize {
        *self.lock()
    }

    /// Block until the count reaches zero or `timeout` elapses. Returns
    /// whether the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .zero
            .wait_timeout_while(guard, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }
}

/// Counts the latch down when dropped, so a job releases waiters even if
/// loading panics.
struct CountDownOnDrop(Arc<Latch>);

impl Drop for CountDownOnDrop {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

// ---------------------------------------------------------------------------
// Work types
// ---------------------------------------------------------------------------

/// Build the main dictionary for one published group.
pub(crate) struct MainLoadJob {
    pub shared: Arc<Shared>,
    pub ctx: ImeContext,
    pub group: Arc<DictionaryGroup>,
    pub locale: Locale,
    pub listener: Option<Arc<dyn DictionaryInitializationListener>>,
    pub latch: Arc<Latch>,
}

impl MainLoadJob {
    fn run(self) {
        let _done = CountDownOnDrop(Arc::clone(&self.latch));
        let _span = debug_span!("load_main_dictionary", locale = %self.locale).entered();
        let dict = self.shared.factory.load_main(&self.ctx, &self.locale);
        self.shared.install_main(&self.group, &self.locale, dict);
        if let Some(listener) = &self.listener {
            listener.on_update_main_dictionary_availability(
                self.shared.has_at_least_one_initialized_main_dictionary(),
            );
        }
    }
}

pub(crate) enum LoaderWork {
    LoadMain(MainLoadJob),
    Flush(Vec<Arc<dyn ExpandableDictionary>>),
    /// Counted down once every earlier item has run.
    Barrier(Arc<Latch>),
}

impl LoaderWork {
    fn run(self) {
        match self {
            LoaderWork::LoadMain(job) => job.run(),
            LoaderWork::Flush(dicts) => {
                for dict in dicts {
                    if let Err(e) = dict.flush() {
                        warn!(kind = %dict.kind(), error = %e, "dictionary flush failed");
                    }
                }
            }
            LoaderWork::Barrier(latch) => latch.count_down(),
        }
    }
}

// ---------------------------------------------------------------------------
// DictionaryLoader
// ---------------------------------------------------------------------------

/// Single background thread that runs [`LoaderWork`] in submission order.
pub(crate) struct DictionaryLoader {
    tx: Option<mpsc::Sender<LoaderWork>>,
}

impl DictionaryLoader {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<LoaderWork>();
        match thread::Builder::new()
            .name("lexfuse-loader".into())
            .spawn(move || loader_worker(rx))
        {
            Ok(_) => Self { tx: Some(tx) },
            Err(e) => {
                warn!(error = %e, "failed to spawn loader thread, loading inline");
                Self { tx: None }
            }
        }
    }

    /// Queue `work`. When the worker is unavailable it runs on the caller.
    pub fn submit(&self, work: LoaderWork) {
        let work = match &self.tx {
            Some(tx) => match tx.send(work) {
                Ok(()) => return,
                Err(mpsc::SendError(work)) => {
                    warn!("loader thread has exited, loading inline");
                    work
                }
            },
            None => work,
        };
        work.run();
    }
}

fn loader_worker(rx: mpsc::Receiver<LoaderWork>) {
    while let Ok(work) = rx.recv() {
        work.run();
    }
    debug!("loader thread exiting");
}
