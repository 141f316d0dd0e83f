use crate::error::{CliError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const WATCH_INTERVAL: Duration = Duration::from_millis(50);

/// Set by the SIGINT/SIGTERM handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Cancellation token handed to every blocking call.
///
/// Clones share the same flag. A deadline, when set, cancels the token once it
/// has passed.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Cancels the token on the first SIGINT or SIGTERM. A second signal
    /// exits the process straight away.
    pub fn cancel_on_interrupt(self) -> Self {
        install_interrupt_handler();
        self.cancel_when_set(&INTERRUPTED)
    }

    fn cancel_when_set(self, trigger: &'static AtomicBool) -> Self {
        let token = self.clone();
        thread::spawn(move || {
            while !trigger.load(Ordering::SeqCst) {
                thread::sleep(WATCH_INTERVAL);
            }
            tracing::debug!("Interrupt received, cancelling");
            token.cancel();
        });
        self
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CliError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        // SAFETY: _exit is async-signal-safe.
        unsafe { libc::_exit(130) };
    }
}

#[cfg(unix)]
fn install_interrupt_handler() {
    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only touches an atomic and calls _exit.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

#[cfg(not(unix))]
fn install_interrupt_handler() {}
