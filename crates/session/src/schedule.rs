use std::{
    future::Future,
    time::{Duration, Instant},
};

use tokio::task::JoinHandle;
use tracing::debug;

/// Trailing-edge debounce: only the last scheduled job within a quiet
/// window of `delay` runs.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// Cancels the pending job, if any, and schedules `job` after the delay.
    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                debug!("Cancelling debounced job");
            }
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Rate limits a stream of samples to one per `interval` without losing the
/// newest one: samples offered too early are held, replacing older held
/// samples, until [`Throttle::flush`] releases them.
#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_fire: None,
            pending: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_fire
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Returns the sample if it may be used right away.
    pub fn offer(&mut self, sample: T, now: Instant) -> Option<T> {
        if self.ready(now) {
            self.last_fire = Some(now);
            self.pending = None;
            Some(sample)
        } else {
            self.pending = Some(sample);
            None
        }
    }

    /// Releases the held sample once the interval has passed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_fire = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// When the held sample becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(self.last_fire.map_or_else(Instant::now, |last| last + self.interval))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.last_fire = None;
        self.pending = None;
    }
}
