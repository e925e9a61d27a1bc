use crate::error::WeatherError;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,
    /// Failure threshold exceeded, calls fail fast.
    Open,
    /// Probing whether the upstream has recovered.
    HalfOpen,
}

#[derive(Clone, Copy)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub call_timeout: Duration,
    pub retry_timeout: Duration,
    pub half_open_success_threshold: u32,
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    half_open_successes: u32,
}

/// Per-upstream-operation failure tracker and fast-fail gate.
///
/// One instance is dedicated to each upstream operation so failures in
/// one operation cannot trip the breaker of another. The per-call timeout
/// cancels the in-flight future; a timed-out call counts as a failure.
pub struct CircuitBreaker {
    name: &'static str,
    settings: CircuitBreakerSettings,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, settings: CircuitBreakerSettings) -> Self {
        Self {
            name,
            settings,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                half_open_successes: 0,
            }),
        }
    }

    /// Runs `op` through the breaker, racing it against the call timeout.
    pub async fn execute<T, Fut>(&self, op: Fut) -> Result<T, WeatherError>
    where
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        self.check_gate()?;

        match tokio::time::timeout(self.settings.call_timeout, op).await {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.on_failure();
                Err(err)
            }
            Err(_) => {
                self.on_failure();
                Err(WeatherError::CircuitTimeout {
                    operation: self.name,
                    timeout_ms: self.settings.call_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Fast-fail check. While Open, the retry timeout is evaluated on each
    /// call attempt; once it has elapsed the breaker moves to HalfOpen and
    /// lets the call through as a probe.
    fn check_gate(&self) -> Result<(), WeatherError> {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.settings.retry_timeout)
                    .unwrap_or(true);
                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    tracing::info!("Circuit breaker [{}] transitioning to HALF_OPEN", self.name);
                    Ok(())
                } else {
                    tracing::warn!("Circuit breaker [{}] is OPEN, rejecting request", self.name);
                    Err(WeatherError::CircuitOpen {
                        operation: self.name,
                    })
                }
            }
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                tracing::debug!(
                    "Circuit breaker [{}] half-open success count: {}",
                    self.name,
                    inner.half_open_successes
                );
                if inner.half_open_successes >= self.settings.half_open_success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    tracing::info!(
                        "Circuit breaker [{}] transitioning to CLOSED after successful half-open probes",
                        self.name
                    );
                }
            }
            _ => {
                inner.consecutive_failures = 0;
            }
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures += 1;
        inner.last_failure_at = Some(Instant::now());
        tracing::warn!(
            "Circuit breaker [{}] failure count: {}/{}",
            self.name,
            inner.consecutive_failures,
            self.settings.failure_threshold
        );

        if inner.consecutive_failures >= self.settings.failure_threshold
            && inner.state != CircuitState::Open
        {
            inner.state = CircuitState::Open;
            tracing::error!(
                "Circuit breaker [{}] transitioning to OPEN after {} failures",
                self.name,
                inner.consecutive_failures
            );
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner
            .lock()
            .expect("breaker lock poisoned")
            .consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::advance;

    fn settings() -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            failure_threshold: 5,
            call_timeout: Duration::from_secs(10),
            retry_timeout: Duration::from_secs(60),
            half_open_success_threshold: 3,
        }
    }

    async fn fail(breaker: &CircuitBreaker) {
        let _ = breaker
            .execute(async { Err::<(), _>(WeatherError::UpstreamCall("boom".into())) })
            .await;
    }

    async fn succeed(breaker: &CircuitBreaker) {
        breaker
            .execute(async { Ok::<_, WeatherError>(()) })
            .await
            .expect("call should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new("test", settings());

        for _ in 0..4 {
            fail(&breaker).await;
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.failure_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_count_while_closed() {
        let breaker = CircuitBreaker::new("test", settings());

        for _ in 0..4 {
            fail(&breaker).await;
        }
        succeed(&breaker).await;
        assert_eq!(breaker.failure_count(), 0);

        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_rejects_without_invoking_the_operation() {
        let breaker = CircuitBreaker::new("test", settings());
        for _ in 0..5 {
            fail(&breaker).await;
        }

        let invoked = AtomicU32::new(0);
        let result = breaker
            .execute(async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<_, WeatherError>(())
            })
            .await;

        assert!(matches!(result, Err(WeatherError::CircuitOpen { .. })));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn probes_after_retry_timeout_and_closes_after_enough_successes() {
        let breaker = CircuitBreaker::new("test", settings());
        for _ in 0..5 {
            fail(&breaker).await;
        }

        advance(Duration::from_secs(60)).await;

        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        succeed(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens_at_threshold_without_a_full_new_count() {
        let mut cfg = settings();
        cfg.failure_threshold = 2;
        let breaker = CircuitBreaker::new("test", cfg);

        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        advance(Duration::from_secs(60)).await;

        // The probe failure pushes the consecutive count past the
        // threshold again, so one failure is enough to re-open.
        fail(&breaker).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operation_counts_as_a_failure() {
        let breaker = CircuitBreaker::new("test", settings());

        let result = breaker
            .execute(async {
                tokio::time::sleep(Duration::from_secs(11)).await;
                Ok::<_, WeatherError>(())
            })
            .await;

        assert!(matches!(result, Err(WeatherError::CircuitTimeout { .. })));
        assert_eq!(breaker.failure_count(), 1);
    }
}
