//! Deadline-bound polling of remotely rendered state
//!
//! The dashboard offers no push channel for status changes, so every
//! observation is a poll: sample, compare against a [`Condition`], pause,
//! repeat until the deadline. A [`Sample::Missing`] read is inconclusive
//! and never fails the wait on its own; an `Err` from the sampler is
//! propagated as-is.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::error::{E2eError, E2eResult};

/// Interval used by field-level waits.
pub const FIELD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Timing of a single wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Total time budget, measured from the start of the call
    pub timeout: Duration,

    /// Fixed delay between samples
    pub interval: Duration,

    /// Pause before each sample instead of after it
    pub pause_first: bool,
}

impl WaitPolicy {
    /// Reload-driven status observation: pause, refresh, read.
    pub fn status(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            pause_first: true,
        }
    }

    /// Client-side validation observation: read first, short interval.
    pub fn field(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: FIELD_POLL_INTERVAL,
            pause_first: false,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::status(Duration::from_secs(30), Duration::from_secs(2))
    }
}

/// Outcome of one read of the observed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sample<T> {
    Value(T),
    /// The indicator was not present for this read.
    Missing,
}

impl<T> From<Option<T>> for Sample<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Sample::Value(v),
            None => Sample::Missing,
        }
    }
}

/// Success criterion for a wait
pub trait Condition<T: ?Sized> {
    fn is_met(&self, value: &T) -> bool;

    /// Human-readable expectation, used in deadline errors.
    fn describe(&self) -> String;
}

/// Substring match; tolerates decorative prefixes such as status icons.
#[derive(Debug, Clone)]
pub struct Contains(pub String);

impl Condition<String> for Contains {
    fn is_met(&self, value: &String) -> bool {
        value.contains(self.0.as_str())
    }

    fn describe(&self) -> String {
        format!("text containing {:?}", self.0)
    }
}

/// Exact match after trimming surrounding whitespace.
#[derive(Debug, Clone)]
pub struct Equals(pub String);

impl Condition<String> for Equals {
    fn is_met(&self, value: &String) -> bool {
        value.trim() == self.0
    }

    fn describe(&self) -> String {
        format!("text equal to {:?}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NonEmpty;

impl Condition<String> for NonEmpty {
    fn is_met(&self, value: &String) -> bool {
        !value.trim().is_empty()
    }

    fn describe(&self) -> String {
        "non-empty text".to_string()
    }
}

/// Closure-backed condition for anything the named matchers don't cover
pub struct Predicate<F> {
    description: String,
    check: F,
}

impl<F> Predicate<F> {
    pub fn new(description: impl Into<String>, check: F) -> Self {
        Self {
            description: description.into(),
            check,
        }
    }
}

impl<T: ?Sized, F: Fn(&T) -> bool> Condition<T> for Predicate<F> {
    fn is_met(&self, value: &T) -> bool {
        (self.check)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Sample until `condition` holds or `policy.timeout` elapses.
///
/// At least one sample is always taken. Pauses are clamped to the time
/// left, so a failing wait returns between `timeout` and
/// `timeout + interval` after the call started. The first matching value
/// is returned and the sampler is not invoked again.
pub async fn poll_until<T, C, F, Fut>(
    subject: &str,
    condition: &C,
    policy: &WaitPolicy,
    mut sample: F,
) -> E2eResult<T>
where
    T: Debug,
    C: Condition<T> + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Sample<T>>>,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts = 0usize;

    loop {
        if policy.pause_first {
            pause_until(deadline, policy.interval).await;
        }

        attempts += 1;
        match sample().await? {
            Sample::Value(value) if condition.is_met(&value) => {
                debug!(subject, attempts, ?value, "condition met");
                return Ok(value);
            }
            Sample::Value(value) => {
                trace!(subject, attempts, ?value, "condition not met yet");
            }
            Sample::Missing => {
                debug!(subject, attempts, "indicator absent, retrying");
            }
        }

        if Instant::now() >= deadline {
            break;
        }
        if !policy.pause_first {
            pause_until(deadline, policy.interval).await;
        }
    }

    debug!(subject, attempts, "deadline exceeded");
    Err(E2eError::deadline(subject, condition.describe(), policy.timeout))
}

async fn pause_until(deadline: Instant, interval: Duration) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    sleep(interval.min(remaining)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use test_case::test_case;

    /// Status that flips to `after` once `flip_at` samples have been taken.
    fn flipping_status(
        calls: Arc<AtomicUsize>,
        flip_at: usize,
    ) -> impl FnMut() -> std::future::Ready<E2eResult<Sample<String>>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let text = if n > flip_at { "✅ OK" } else { "⏳ Pending" };
            std::future::ready(Ok(Sample::Value(text.to_string())))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_sample_containing_label() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = WaitPolicy::status(Duration::from_secs(30), Duration::from_secs(2));
        let start = Instant::now();

        let text = poll_until("feed status", &Contains("OK".into()), &policy, flipping_status(calls.clone(), 3))
            .await
            .unwrap();

        assert_eq!(text, "✅ OK");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn fails_between_timeout_and_one_interval_later() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = WaitPolicy::status(Duration::from_secs(5), Duration::from_secs(2));
        let start = Instant::now();

        let err = poll_until("feed 7 status", &Contains("OK".into()), &policy, flipping_status(calls, usize::MAX))
            .await
            .unwrap_err();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "failed early: {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(7), "failed late: {elapsed:?}");
        match err {
            E2eError::DeadlineExceeded { subject, expected, timeout } => {
                assert_eq!(subject, "feed 7 status");
                assert!(expected.contains("OK"));
                assert_eq!(timeout, Duration::from_secs(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn momentary_absence_is_not_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let policy = WaitPolicy::status(Duration::from_secs(30), Duration::from_secs(2));

        let text = poll_until("feed status", &Contains("OK".into()), &policy, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let sample = match n {
                1 => Sample::Value("⏳ Pending".to_string()),
                2 => Sample::Missing,
                _ => Sample::Value("✅ OK".to_string()),
            };
            std::future::ready(Ok(sample))
        })
        .await
        .unwrap();

        assert_eq!(text, "✅ OK");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_errors_propagate() {
        let policy = WaitPolicy::status(Duration::from_secs(30), Duration::from_secs(2));
        let err = poll_until("feed status", &Contains("OK".into()), &policy, || {
            std::future::ready(Err::<Sample<String>, _>(E2eError::Browser("reload failed".into())))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, E2eError::Browser(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_wait_on_satisfied_label_succeeds_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = WaitPolicy::status(Duration::from_secs(30), Duration::from_secs(2));

        for _ in 0..2 {
            let counter = calls.clone();
            let text = poll_until("feed status", &Contains("OK".into()), &policy, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok(Sample::Value("✅ OK".to_string())))
            })
            .await
            .unwrap();
            assert_eq!(text, "✅ OK");
        }

        // one sample (one reload) per call
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn field_wait_returns_exact_error_text() {
        let start = Instant::now();
        let text = poll_until("name field error", &NonEmpty, &WaitPolicy::field(Duration::from_secs(5)), move || {
            let sample = if start.elapsed() >= Duration::from_millis(300) {
                Sample::Value("This field is required".to_string())
            } else {
                Sample::Value(String::new())
            };
            std::future::ready(Ok(sample))
        })
        .await
        .unwrap();

        assert_eq!(text, "This field is required");
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn field_wait_samples_immediately() {
        let start = Instant::now();
        poll_until("url field error", &NonEmpty, &WaitPolicy::field(Duration::from_secs(5)), || {
            std::future::ready(Ok(Sample::Value("Invalid URL".to_string())))
        })
        .await
        .unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_still_samples_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = WaitPolicy::status(Duration::ZERO, Duration::from_secs(2));
        let result = poll_until("feed status", &Contains("OK".into()), &policy, flipping_status(calls.clone(), 0)).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_case("✅ OK", "OK", true ; "decorated label")]
    #[test_case("⏳ Pending", "OK", false ; "other label")]
    #[test_case("❌ Error", "error", false ; "case sensitive")]
    fn contains_matching(text: &str, label: &str, expected: bool) {
        assert_eq!(Contains(label.to_string()).is_met(&text.to_string()), expected);
    }

    #[test]
    fn equals_is_stricter_than_contains() {
        let text = "✅ OK".to_string();
        assert!(Contains("OK".into()).is_met(&text));
        assert!(!Equals("OK".into()).is_met(&text));
        assert!(Equals("✅ OK".into()).is_met(&"  ✅ OK\n".to_string()));
    }

    #[test]
    fn non_empty_ignores_whitespace() {
        assert!(!NonEmpty.is_met(&"  \n".to_string()));
        assert!(NonEmpty.is_met(&"required".to_string()));
    }

    #[test]
    fn predicate_describes_itself() {
        let p = Predicate::new("an even number", |n: &u32| n % 2 == 0);
        assert!(p.is_met(&4));
        assert!(!p.is_met(&3));
        assert_eq!(Condition::<u32>::describe(&p), "an even number");
    }
}
