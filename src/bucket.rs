// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket with a self-expiring refill task.
//!
//! A bucket starts full. Its refill task adds `refill_amount` tokens every
//! `refill_interval`; the first tick that brings the bucket back to capacity
//! marks it expired, fires the expiry callback and ends the task.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// Outcome of a consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Consume {
    /// A token was taken
    Admitted,
    /// No tokens left
    Rejected,
    /// The refill task has finished; the bucket must not be used again
    Expired,
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    expired: bool,
}

/// Token bucket for a single key.
#[derive(Debug)]
pub(crate) struct Bucket {
    state: Mutex<BucketState>,
    max_tokens: u32,
    refill_amount: u32,
}

impl Bucket {
    pub(crate) fn new(max_tokens: u32, refill_amount: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: max_tokens,
                expired: false,
            }),
            max_tokens,
            refill_amount,
        }
    }

    /// Take one token if any is available.
    pub(crate) fn try_consume(&self) -> Consume {
        let mut state = self.state.lock();
        if state.expired {
            Consume::Expired
        } else if state.tokens > 0 {
            state.tokens -= 1;
            Consume::Admitted
        } else {
            Consume::Rejected
        }
    }

    pub(crate) fn tokens(&self) -> u32 {
        self.state.lock().tokens
    }

    /// Apply one refill tick.
    ///
    /// When the bucket reaches capacity it is marked expired and `on_expire`
    /// runs while the bucket lock is still held, so no consumer can take a
    /// token between the two. Returns `true` if the bucket expired.
    fn refill<F: FnOnce()>(&self, on_expire: F) -> bool {
        let mut state = self.state.lock();
        if state.expired {
            // Retired by shutdown while this tick was pending.
            return true;
        }
        state.tokens = state
            .tokens
            .saturating_add(self.refill_amount)
            .min(self.max_tokens);
        if state.tokens >= self.max_tokens {
            state.expired = true;
            on_expire();
            true
        } else {
            false
        }
    }

    /// Mark the bucket unusable without refilling it.
    pub(crate) fn retire(&self) {
        self.state.lock().expired = true;
    }
}

/// Drive the refill ticks of `bucket` until it expires or `shutdown` fires.
///
/// Any change on `shutdown` after the receiver was subscribed stops the task,
/// as does dropping the sender. `on_expire` is called exactly once when the
/// bucket fills up; it is not called on shutdown.
pub(crate) async fn run_refill_loop<F>(
    bucket: Arc<Bucket>,
    refill_interval: Duration,
    mut shutdown: watch::Receiver<()>,
    on_expire: F,
) where
    F: FnOnce(),
{
    let mut ticker = interval_at(Instant::now() + refill_interval, refill_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut on_expire = Some(on_expire);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let expired = bucket.refill(|| {
                    if let Some(callback) = on_expire.take() {
                        callback();
                    }
                });
                if expired {
                    trace!("Bucket full, refill task exiting");
                    return;
                }
            }
            _ = shutdown.changed() => {
                bucket.retire();
                trace!("Refill task stopped by shutdown");
                return;
            }
        }
    }
}
