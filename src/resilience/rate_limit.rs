use crate::error::WeatherError;
use chrono::{Local, NaiveDate};
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

struct DayWindow {
    day: NaiveDate,
    count: u32,
}

/// Daily-quota tracker for one upstream operation.
///
/// Only verified successful upstream calls consume quota; rejected and
/// failed calls are free. The counter rolls over when the wall-clock date
/// changes, detected lazily on the next check and proactively by a timer
/// scheduled at local midnight so a quiet day boundary is not missed.
pub struct DailyRateLimiter {
    name: &'static str,
    daily_limit: u32,
    window: Arc<Mutex<DayWindow>>,
}

impl DailyRateLimiter {
    pub fn new(name: &'static str, daily_limit: u32) -> Self {
        let window = Arc::new(Mutex::new(DayWindow {
            day: Local::now().date_naive(),
            count: 0,
        }));

        spawn_midnight_reset(name, Arc::downgrade(&window));

        Self {
            name,
            daily_limit,
            window,
        }
    }

    /// Whether another call fits in today's quota. Does not consume quota.
    pub fn is_allowed(&self) -> bool {
        let mut window = self.window.lock().expect("limiter lock poisoned");
        roll_if_new_day(self.name, &mut window);

        let allowed = window.count < self.daily_limit;
        if !allowed {
            tracing::warn!(
                "Rate limit exceeded for [{}]. Current usage: {}/{}",
                self.name,
                window.count,
                self.daily_limit
            );
        }
        allowed
    }

    /// Records one accepted upstream call. Must only be invoked after the
    /// call has completed successfully. Returns the new usage count.
    pub fn record_call(&self) -> u32 {
        let mut window = self.window.lock().expect("limiter lock poisoned");
        roll_if_new_day(self.name, &mut window);

        window.count += 1;
        tracing::debug!(
            "API call recorded for [{}]. Usage: {}/{}",
            self.name,
            window.count,
            self.daily_limit
        );
        if window.count * 5 >= self.daily_limit * 4 {
            tracing::warn!(
                "Approaching rate limit for [{}]. Usage: {}/{}",
                self.name,
                window.count,
                self.daily_limit
            );
        }
        window.count
    }

    /// Rejects immediately when over quota, otherwise runs `op` and
    /// records the call only if it succeeds.
    pub async fn execute_with_limit<T, Fut>(&self, op: Fut) -> Result<T, WeatherError>
    where
        Fut: Future<Output = Result<T, WeatherError>>,
    {
        if !self.is_allowed() {
            return Err(WeatherError::RateLimitExceeded {
                operation: self.name,
                limit: self.daily_limit,
            });
        }

        match op.await {
            Ok(value) => {
                self.record_call();
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(
                    "API call failed for [{}], not counting against rate limit",
                    self.name
                );
                Err(err)
            }
        }
    }

    #[cfg(test)]
    fn backdate_one_day(&self) {
        let mut window = self.window.lock().expect("limiter lock poisoned");
        window.day = window
            .day
            .pred_opt()
            .expect("date arithmetic out of range");
    }

    #[cfg(test)]
    fn usage(&self) -> u32 {
        self.window.lock().expect("limiter lock poisoned").count
    }
}

fn roll_if_new_day(name: &str, window: &mut DayWindow) {
    let today = Local::now().date_naive();
    if window.day != today {
        if window.count > 0 {
            tracing::info!(
                "Daily usage reset for [{}]. Previous usage: {}",
                name,
                window.count
            );
        }
        window.day = today;
        window.count = 0;
    }
}

/// Resets the counter at each local midnight. Holds a weak reference so
/// the task winds down once the limiter is dropped.
fn spawn_midnight_reset(name: &'static str, window: Weak<Mutex<DayWindow>>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(until_next_local_midnight()).await;
            let Some(window) = window.upgrade() else {
                break;
            };
            let mut window = window.lock().expect("limiter lock poisoned");
            if window.count > 0 {
                tracing::info!(
                    "Daily usage reset for [{}]. Previous usage: {}",
                    name,
                    window.count
                );
            }
            window.day = Local::now().date_naive();
            window.count = 0;
        }
    });
}

fn until_next_local_midnight() -> Duration {
    let now = Local::now().naive_local();
    now.date()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|midnight| (midnight - now).to_std().ok())
        .unwrap_or(Duration::from_secs(86_400))
}
