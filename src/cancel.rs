use anyhow::{Context, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

// upper bound on how long a cancelled sleep keeps running
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// A shared stop flag checked between loop iterations and during sleeps.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a token that is cancelled by Ctrl+C or SIGTERM.
    ///
    /// Only one handler can be installed per process.
    pub fn on_interrupt() -> Result<Self> {
        let token = CancelToken::new();
        let handler_token = token.clone();
        ctrlc::set_handler(move || {
            log::info!("Interrupt received, stopping");
            handler_token.cancel();
        })
        .context("Cannot install the Ctrl+C handler")?;
        Ok(token)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Returns `true` if the whole duration elapsed, `false` if the token was cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
