use std::cell::Cell;
use std::rc::Rc;

use gloo_timers::callback::{Interval, Timeout};

/// Shared flag checked by timer callbacks before doing any work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }

    /// Wraps `f` so it becomes a no-op once the token is cancelled.
    pub fn guard<F: FnMut()>(&self, mut f: F) -> impl FnMut() {
        let token = self.clone();
        move || {
            if !token.is_cancelled() {
                f()
            }
        }
    }
}

/// Repeating timer handle. Dropping it stops the timer.
pub struct Ticker {
    token: CancelToken,
    handle: Option<Interval>,
}

impl Ticker {
    pub fn every(period_ms: u32, f: impl FnMut() + 'static) -> Self {
        let token = CancelToken::new();
        let handle = Interval::new(period_ms, token.guard(f));
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn every_second(f: impl FnMut() + 'static) -> Self {
        Self::every(1000, f)
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One-shot timer handle. Dropping it before it fires cancels it.
pub struct Deferred {
    token: CancelToken,
    handle: Option<Timeout>,
}

impl Deferred {
    pub fn after(delay_ms: u32, f: impl FnOnce() + 'static) -> Self {
        let token = CancelToken::new();
        let guard = token.clone();
        let handle = Timeout::new(delay_ms, move || {
            if !guard.is_cancelled() {
                f()
            }
        });
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_callback_stops_after_cancel() {
        let token = CancelToken::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let mut tick = token.guard(move || counter.set(counter.get() + 1));

        tick();
        tick();
        token.cancel();
        tick();

        assert_eq!(hits.get(), 2);
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_cancellation() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }
}
