//! Request sequencing and cancellation for page fetches

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, RwLock};

use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::record::Record;
use crate::view::{PageEvent, PageState};

/// Value produced by a sequenced fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub seq: u64,
    pub value: T,
}

/// Receiving side of a session's cancellation signal
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the session is cancelled or dropped
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Fetch sequencer plus cancellation signal owned by one page.
/// Dropping the session cancels every fetch it started.
#[derive(Debug)]
pub struct PageSession {
    name: String,
    sequence: AtomicU64,
    cancel_tx: watch::Sender<bool>,
}

impl PageSession {
    pub fn new(name: impl Into<String>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            sequence: AtomicU64::new(0),
            cancel_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserve the next sequence number (starting at 1)
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last sequence number handed out
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.cancel_tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        if !self.is_cancelled() {
            log::debug!(target: "erpdash::session", "Cancelling page session '{}'", self.name);
        }
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Run `fut` under the next sequence number, aborting with
    /// [`CoreError::Cancelled`] if the session is cancelled first
    pub async fn run<F, T>(&self, fut: F) -> CoreResult<Tagged<T>>
    where
        F: Future<Output = CoreResult<T>>,
    {
        let seq = self.next_sequence();
        self.run_tagged(seq, fut).await
    }

    async fn run_tagged<F, T>(&self, seq: u64, fut: F) -> CoreResult<Tagged<T>>
    where
        F: Future<Output = CoreResult<T>>,
    {
        let mut token = self.token();
        if token.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        tokio::select! {
            _ = token.cancelled() => {
                log::debug!(target: "erpdash::session", "Fetch {} of '{}' cancelled", seq, self.name);
                Err(CoreError::Cancelled)
            }
            result = fut => result.map(|value| Tagged { seq, value }),
        }
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.cancel_tx.send_replace(true);
    }
}

/// A page's session together with its current snapshot
#[derive(Debug)]
pub struct TrackedPage {
    session: PageSession,
    state: RwLock<PageState>,
}

impl TrackedPage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            session: PageSession::new(name),
            state: RwLock::new(PageState::new()),
        }
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    pub async fn snapshot(&self) -> PageState {
        self.state.read().await.clone()
    }

    async fn apply(&self, event: PageEvent) -> PageState {
        let mut state = self.state.write().await;
        let next = std::mem::take(&mut *state).reduce(event);
        *state = next.clone();
        next
    }

    /// Re-fetch the page's records. The snapshot is updated through the
    /// sequencing reducer; a failure leaves the previous records in place
    /// and is also returned to the caller.
    pub async fn refresh<F>(&self, fetch: F) -> CoreResult<PageState>
    where
        F: Future<Output = CoreResult<Vec<Record>>>,
    {
        let seq = self.session.next_sequence();
        self.apply(PageEvent::FetchStarted { seq }).await;

        match self.session.run_tagged(seq, fetch).await {
            Ok(Tagged { seq, value }) => Ok(self
                .apply(PageEvent::FetchSucceeded { seq, records: value })
                .await),
            Err(e) => {
                DefaultErrorLogger.log_error(
                    &e,
                    &ErrorContext::new("refresh")
                        .with_page(self.session.name())
                        .with_sequence(seq),
                );
                self.apply(PageEvent::FetchFailed {
                    seq,
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    pub fn cancel(&self) {
        self.session.cancel();
    }
}
