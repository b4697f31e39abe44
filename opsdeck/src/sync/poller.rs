//! Generic polling-loop primitive.
//!
//! Every long-lived stream in this layer is driven by the same cycle: call
//! the resource once, hand the snapshot to a consumer, sleep, repeat. The
//! loop is deliberately a serialized request-then-wait cycle rather than a
//! fixed-rate timer - the next call is only scheduled after the previous
//! one settled, so a slow backend can never pile up overlapping requests
//! for the same resource.
//!
//! A failed call is logged and skips that cycle's update; it never stops
//! the loop. Cancellation is checked at both suspension points (awaiting
//! the call, awaiting the timer), so a response that lands after
//! [`PollHandle::cancel`] is discarded without reaching the consumer.
//!
//! # Jitter
//!
//! Several loops start near-simultaneously when the dashboard connects.
//! With identical fixed intervals they would converge into synchronized
//! request bursts; an additive random term spread over
//! [`PollConfig::max_jitter`] keeps them apart.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ApiError;

/// Default interval between polls of one resource.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Timing of a polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Base interval between the end of one call and the start of the next.
    pub interval: Duration,

    /// Upper bound of the additive random jitter term. Zero disables jitter.
    pub max_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

impl PollConfig {
    /// Fixed interval, no jitter.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_jitter: Duration::ZERO,
        }
    }

    /// Interval plus a random additive term in `[0, max_jitter)`.
    pub fn jittered(interval: Duration, max_jitter: Duration) -> Self {
        Self {
            interval,
            max_jitter,
        }
    }

    /// Delay before the next cycle.
    fn next_delay(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return self.interval;
        }
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..self.max_jitter);
        self.interval + jitter
    }
}

/// Handle to a running polling loop.
///
/// Cancelling is synchronous and safe at any time, including while a call
/// is in flight or while the loop is waiting for its next tick. Dropping
/// the handle cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
}

impl PollHandle {
    /// Stop the loop. After this returns, no further call or consumer
    /// invocation will happen.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the loop has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn a polling loop on the current tokio runtime.
///
/// `op` produces one snapshot per cycle; `consume` receives each successful
/// snapshot. `name` identifies the resource in log output.
pub fn spawn<T, Op, Fut, C>(
    name: &'static str,
    config: PollConfig,
    mut op: Op,
    mut consume: C,
) -> PollHandle
where
    T: Send + 'static,
    Op: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send,
    C: FnMut(T) + Send + 'static,
{
    let token = CancellationToken::new();
    let loop_token = token.clone();

    tokio::spawn(async move {
        debug!(
            resource = name,
            interval_ms = config.interval.as_millis() as u64,
            max_jitter_ms = config.max_jitter.as_millis() as u64,
            "Poll loop started"
        );

        loop {
            let result = tokio::select! {
                biased;

                _ = loop_token.cancelled() => break,
                result = op() => result,
            };

            // The token may have been cancelled while the call was in
            // flight and the response still won the race above.
            if loop_token.is_cancelled() {
                break;
            }

            match result {
                Ok(snapshot) => consume(snapshot),
                Err(e) => {
                    warn!(resource = name, error = %e, "Poll failed, skipping cycle");
                }
            }

            tokio::select! {
                biased;

                _ = loop_token.cancelled() => break,
                _ = tokio::time::sleep(config.next_delay()) => {}
            }
        }

        debug!(resource = name, "Poll loop stopped");
    });

    PollHandle { token }
}
