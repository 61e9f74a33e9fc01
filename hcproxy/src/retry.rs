use core::convert::Infallible;
use core::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::Rng;

/// A non-blocking timer that allows a fixed-delay or exponential-backoff retry,
/// that lives alongside some operation to retry.
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use hcproxy::retry;
///
/// let mut called = false;
/// let mut fails_once = || -> Result<(), ()> {
///   // ...
///   # if !called {
///   #   called = true;
///   #   Err(())
///   # } else {
///   #   Ok(())
///   # }
/// };
///
/// let strategy = retry::Strategy::Delay { min: Duration::from_millis(1),
///                                         max: Duration::from_millis(2) };
/// let mut retry = retry::RetryTimer::new(Instant::now(), strategy, retry::Attempts(2));
///
/// while let Err(_) = fails_once() {
///   match nb::block!(retry.what_should_i_do(Instant::now())) {
///     | Ok(retry::YouShould::Retry) => continue,
///     | Ok(retry::YouShould::Cry) => panic!("no more attempts! it failed more than once!!"),
///     | Err(never) => match never {},
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer {
  start: Instant,
  init: Duration,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer::what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl RetryTimer {
  /// Create a new retrier
  pub fn new(start: Instant, strategy: Strategy, max_attempts: Attempts) -> Self {
    let init = if strategy.has_jitter() {
      rand::thread_rng().gen_range(strategy.range())
    } else {
      *strategy.range().start()
    };

    Self { start,
           strategy,
           init: Duration::from_millis(init),
           max_attempts,
           attempts: Attempts(1) }
  }

  /// When the thing we keep trying fails, invoke this to
  /// tell the retrytimer "it failed again! what do I do??"
  ///
  /// Returns `nb::Error::WouldBlock` when we have not yet
  /// waited the appropriate amount of time to retry.
  pub fn what_should_i_do(&mut self, now: Instant) -> nb::Result<YouShould, Infallible> {
    if self.attempts >= self.max_attempts {
      Ok(YouShould::Cry)
    } else if self.is_ready(now.saturating_duration_since(self.start), self.attempts.0) {
      self.attempts.0 += 1;
      Ok(YouShould::Retry)
    } else {
      Err(nb::Error::WouldBlock)
    }
  }

  /// How many attempts have been made so far, counting the first
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }

  /// The instant at which [`RetryTimer::what_should_i_do`] will next say
  /// something other than `WouldBlock`
  pub fn next_attempt_at(&self) -> Instant {
    self.start + self.delay_until(self.attempts.0)
  }

  /// Check if the strategy says an appropriate time has passed
  pub fn is_ready(&self, time_passed: Duration, attempts: u16) -> bool {
    attempts == 0 || time_passed >= self.delay_until(attempts)
  }

  fn delay_until(&self, attempts: u16) -> Duration {
    match self.strategy {
      | Strategy::Delay { .. } => capped(self.init.checked_mul(attempts as u32)),
      | Strategy::Exponential { .. } => Strategy::total_delay_exp(self.init, attempts),
    }
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  ///
  /// After each failed attempt, double the delay before retrying again.
  Exponential {
    /// Minimum (inclusive) delay for second attempt
    init_min: Duration,
    /// Maximum (inclusive) delay for second attempt
    init_max: Duration,
  },
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  Delay {
    /// Minimum (inclusive) delay for attempts
    min: Duration,
    /// Maximum (inclusive) delay for attempts
    max: Duration,
  },
}

impl Strategy {
  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations (in milliseconds) as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    let ms = |d: Duration| d.as_millis() as u64;

    match *self {
      | Self::Delay { min, max } => ms(min)..=ms(max),
      | Self::Exponential { init_min, init_max } => ms(init_min)..=ms(init_max),
    }
  }

  /// Get the amount of time this strategy will take if all attempts fail
  pub fn max_time(&self, max_attempts: Attempts) -> Duration {
    match *self {
      | Self::Exponential { init_max, .. } => Self::total_delay_exp(init_max, max_attempts.0),
      | Self::Delay { max, .. } => capped(max.checked_mul(max_attempts.0 as u32)),
    }
  }

  /// Given the initial delay and number of attempts that have been performed,
  /// yields the delay until the next retry should be attempted.
  fn total_delay_exp(init: Duration, attempt: u16) -> Duration {
    // | attempt | total delay      |
    // | 1       | init             |
    // | 2       | init * 2         |
    // | 3       | init * 4         |
    // | ...     | ...              |
    // | n       | init * 2^(n-1)   |
    capped(2u32.checked_pow(attempt.saturating_sub(1) as u32)
               .and_then(|factor| init.checked_mul(factor)))
  }
}

/// Longest delay a [`Strategy`] will ever yield; longer ones (and ones that
/// overflow) saturate to this.
///
/// Small enough that `Instant::now() + MAX_DELAY` never overflows.
pub const MAX_DELAY: Duration = Duration::from_secs(u32::MAX as u64);

fn capped(delay: Option<Duration>) -> Duration {
  delay.map(|d| d.min(MAX_DELAY)).unwrap_or(MAX_DELAY)
}
