//! Timeout retries.
//!
//! A round-trip that times out is resent up to [`Retry::max_attempts`] more
//! times. Between attempts the engine sleeps for whatever the [`Backoff`]
//! function returns for the attempt that just failed. No other error is
//! retried.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Delay function used by [`Backoff::Custom`].
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Maps the zero-based number of a timed-out attempt to the wait before the
/// next one.
#[derive(Clone, Default)]
pub enum Backoff {
    /// Resend immediately.
    #[default]
    None,
    /// Same wait every time.
    Fixed { delay: Duration },
    /// `initial * 2^attempt`, capped at `max`, then scaled by a factor drawn
    /// from `[1 - jitter, 1 + jitter]`.
    Exponential {
        initial: Duration,
        max: Duration,
        jitter: f64,
    },
    /// Any function of the attempt number.
    Custom(BackoffFn),
}

impl Backoff {
    /// Wait after `attempt` (zero-based) timed out.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay } => *delay,
            Backoff::Exponential {
                initial,
                max,
                jitter,
            } => {
                let capped = initial.saturating_mul(1u32 << attempt.min(31)).min(*max);
                Duration::try_from_secs_f64(capped.as_secs_f64() * jitter_factor(*jitter))
                    .unwrap_or(capped)
            }
            Backoff::Custom(f) => f(attempt),
        }
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::None => write!(f, "None"),
            Backoff::Fixed { delay } => write!(f, "Fixed({:?})", delay),
            Backoff::Exponential {
                initial,
                max,
                jitter,
            } => write!(f, "Exponential({:?}..{:?}, jitter {})", initial, max, jitter),
            Backoff::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// How often, and how patiently, a timed-out request is resent.
///
/// ```rust
/// use snmp_lite::Retry;
/// use std::time::Duration;
///
/// let once = Retry::none();
/// let steady = Retry::fixed(3, Duration::from_millis(200));
/// let growing = Retry::exponential(5)
///     .max_delay(Duration::from_secs(5))
///     .jitter(0.25)
///     .build();
/// let linear = Retry::custom(4, |attempt| Duration::from_millis(100 * (attempt as u64 + 1)));
/// # let _ = (once, steady, growing, linear);
/// ```
#[derive(Clone, Debug)]
pub struct Retry {
    /// Resends after the first attempt. Zero sends the request once.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for Retry {
    /// Three immediate resends.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::None,
        }
    }
}

impl Retry {
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            backoff: Backoff::None,
        }
    }

    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Resend up to `attempts` times, waiting `delay(attempt)` first.
    ///
    /// ```rust
    /// use snmp_lite::Retry;
    /// use std::time::Duration;
    ///
    /// let retry = Retry::custom(2, |attempt| Duration::from_millis(50 * (attempt as u64 + 1)));
    /// assert_eq!(retry.compute_delay(1), Duration::from_millis(100));
    /// ```
    pub fn custom<F>(attempts: u32, delay: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            max_attempts: attempts,
            backoff: Backoff::Custom(Arc::new(delay)),
        }
    }

    /// Doubling waits; defaults are 1s initial, 5s cap and 25% jitter.
    pub fn exponential(attempts: u32) -> RetryBuilder {
        RetryBuilder {
            max_attempts: attempts,
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            jitter: 0.25,
        }
    }

    /// Wait after the zero-based `attempt` timed out.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Parameters for [`Backoff::Exponential`].
#[derive(Debug, Clone)]
pub struct RetryBuilder {
    max_attempts: u32,
    initial: Duration,
    max: Duration,
    jitter: f64,
}

impl RetryBuilder {
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max = delay;
        self
    }

    /// Jitter fraction, clamped to `0.0..=1.0`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_nan() {
            0.0
        } else {
            jitter.clamp(0.0, 1.0)
        };
        self
    }

    pub fn build(self) -> Retry {
        Retry {
            max_attempts: self.max_attempts,
            backoff: Backoff::Exponential {
                initial: self.initial,
                max: self.max,
                jitter: self.jitter,
            },
        }
    }
}

impl From<RetryBuilder> for Retry {
    fn from(builder: RetryBuilder) -> Self {
        builder.build()
    }
}

static JITTER_STATE: AtomicU64 = AtomicU64::new(0x853c_49e6_748f_ea9b);

/// Factor in `[1 - jitter, 1 + jitter]` from a shared splitmix64 sequence.
fn jitter_factor(jitter: f64) -> f64 {
    if jitter <= 0.0 {
        return 1.0;
    }
    let mut z = JITTER_STATE.fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::Relaxed);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    let unit = (z >> 11) as f64 / (1u64 << 53) as f64;
    1.0 - jitter + 2.0 * jitter * unit
}
