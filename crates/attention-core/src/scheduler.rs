//! Cancellable scheduling primitives for the detection loop.
//!
//! The loop re-arms on every rendering tick through [`Rearm`], and every wait
//! it performs (next tick, surface readiness, model load) also listens on a
//! [`CancellationToken`], so stopping a session never waits on a timer.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

/// Shared cancellation flag that can also wake blocked `select!` calls.
///
/// Cancelling drops the internal sender, which disconnects every receiver
/// obtained from [`CancellationToken::receiver`].
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    cancelled: AtomicBool,
    wake: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl CancellationToken {
    /// Creates an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                wake: Mutex::new(Some(tx)),
                receiver: rx,
            }),
        }
    }

    /// Cancels the token. Returns true on the first call only.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::SeqCst);
        self.inner
            .wake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        first
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Channel that disconnects on cancellation, for use in `select!`.
    #[must_use]
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Outcome of a bounded wait on a channel.
#[derive(Debug, PartialEq, Eq)]
pub enum Wait<T> {
    /// A value arrived.
    Ready(T),
    /// The deadline passed first.
    TimedOut,
    /// The token was cancelled first.
    Cancelled,
    /// The sending side went away without a value.
    Disconnected,
}

/// Waits for a value on `rx`, bounded by `timeout` and by cancellation.
pub fn wait_for<T>(rx: &Receiver<T>, timeout: Duration, cancel: &CancellationToken) -> Wait<T> {
    if cancel.is_cancelled() {
        return Wait::Cancelled;
    }
    let deadline = crossbeam_channel::after(timeout);
    select! {
        recv(rx) -> msg => msg.map_or(Wait::Disconnected, Wait::Ready),
        recv(cancel.receiver()) -> _ => Wait::Cancelled,
        recv(deadline) -> _ => Wait::TimedOut,
    }
}

/// Waits for a value on `rx` with no deadline, ending early on cancellation.
pub fn wait_cancellable<T>(rx: &Receiver<T>, cancel: &CancellationToken) -> Wait<T> {
    if cancel.is_cancelled() {
        return Wait::Cancelled;
    }
    select! {
        recv(rx) -> msg => msg.map_or(Wait::Disconnected, Wait::Ready),
        recv(cancel.receiver()) -> _ => Wait::Cancelled,
    }
}

/// Cancellable repeating trigger driven by a tick channel.
///
/// Each call to [`next_tick`](Self::next_tick) arms the task for the next available
/// tick. Ticks that fired while the caller was busy are not queued up.
pub struct Rearm {
    ticks: Receiver<Instant>,
    cancel: CancellationToken,
}

impl Rearm {
    /// Creates a trigger over `ticks` that stops when `cancel` fires.
    #[must_use]
    pub const fn new(ticks: Receiver<Instant>, cancel: CancellationToken) -> Self {
        Self { ticks, cancel }
    }

    /// Blocks until the next tick. Returns `None` once cancelled or when the
    /// tick source is gone.
    pub fn next_tick(&self) -> Option<Instant> {
        if self.cancel.is_cancelled() {
            return None;
        }
        select! {
            recv(self.ticks) -> tick => tick.ok().filter(|_| !self.cancel.is_cancelled()),
            recv(self.cancel.receiver()) -> _ => None,
        }
    }
}

/// Spawns a named thread that inherits the current tracing dispatcher.
///
/// # Errors
///
/// Returns an error if the OS refuses to create the thread.
pub fn spawn_thread<F, T>(name: impl Into<String>, f: F) -> io::Result<thread::JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let dispatch = tracing::dispatcher::get_default(Clone::clone);
    thread::Builder::new()
        .name(name.into())
        .spawn(move || tracing::dispatcher::with_default(&dispatch, f))
}
