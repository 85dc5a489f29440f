use rand::Rng;
use std::thread;
use std::time::Duration;

/// Exponential backoff with full jitter.
///
/// Used by processors after an enqueue timeout and by pickers after an
/// idle dequeue timeout. Full jitter draws the actual delay uniformly
/// from `[0, backoff]`, spreading retries so a pool of blocked workers
/// does not wake in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Backoff {
    /// Default: 1ms base, 100ms cap.
    pub fn new() -> Self {
        Self {
            base: Duration::from_millis(1),
            cap: Duration::from_millis(100),
        }
    }

    /// Custom base delay and cap.
    pub fn with_bounds(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Compute the jittered delay for the given retry attempt (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base.saturating_mul(1u32 << attempt.min(16));
        let ceiling = exp.min(self.cap);
        if ceiling.is_zero() {
            return Duration::ZERO;
        }
        let nanos = rand::thread_rng().gen_range(0..=ceiling.as_nanos() as u64);
        Duration::from_nanos(nanos)
    }

    /// Sleep for the jittered delay of `attempt`.
    pub fn sleep(&self, attempt: u32) {
        let delay = self.delay(attempt);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
