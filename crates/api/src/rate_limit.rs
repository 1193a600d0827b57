use std::collections::VecDeque;

use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, Instant},
};
use tracing::{debug, error};

use super::error::Error;

/// Sliding window limiter; `slots` holds the instant each granted request
/// stops counting against the window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    rate_limit_per_interval: usize,
    interval: Duration,
    slots: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(rate_limit_per_interval: usize, interval: Duration) -> Self {
        assert!(rate_limit_per_interval > 0);
        Self {
            rate_limit_per_interval,
            interval,
            slots: VecDeque::with_capacity(rate_limit_per_interval),
        }
    }

    pub async fn rate_limit(&mut self) {
        let now = Instant::now();
        while self.slots.front().map_or(false, |&t| t <= now) {
            self.slots.pop_front();
        }
        if self.slots.len() < self.rate_limit_per_interval {
            self.slots.push_back(now + self.interval);
            return;
        }
        if let Some(free_at) = self.slots.pop_front() {
            debug!("Rate limiting: sleeping for {} ms", (free_at - now).as_millis());
            self.slots.push_back(free_at + self.interval);
            tokio::time::sleep_until(free_at).await;
        }
    }
}

type Reply = oneshot::Sender<Result<reqwest::Response, reqwest::Error>>;

/// HTTP client whose requests all pass through one shared [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimitedClient {
    receiver: mpsc::Sender<(reqwest::Request, Reply)>,
}

impl RateLimitedClient {
    pub fn new(rate_limit_per_interval: usize, interval: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<(reqwest::Request, Reply)>(100);
        tokio::spawn(async move {
            let mut rl = RateLimiter::new(rate_limit_per_interval, interval);
            let client = reqwest::Client::new();
            while let Some((request, reply)) = rx.recv().await {
                rl.rate_limit().await;
                let client = client.clone();
                tokio::spawn(async move {
                    if reply.send(client.execute(request).await).is_err() {
                        error!("Requester went away before the response arrived");
                    }
                });
            }
            debug!("Rate limited client shut down");
        });
        Self { receiver: tx }
    }

    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, Error> {
        let (tx, rx) = oneshot::channel();
        self.receiver
            .send((request, tx))
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        rx.await
            .map_err(|e| Error::Channel(e.to_string()))?
            .map_err(Error::from)
    }
}

impl Default for RateLimitedClient {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter() {
        let mut rate_limiter = RateLimiter::new(1, Duration::from_millis(1000));
        let start = Instant::now();
        for _ in 0..3 {
            rate_limiter.rate_limit().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_allows_burst_up_to_limit() {
        let mut rate_limiter = RateLimiter::new(3, Duration::from_millis(1000));
        let start = Instant::now();
        for _ in 0..3 {
            rate_limiter.rate_limit().await;
        }
        assert!(start.elapsed() < Duration::from_millis(1));
        rate_limiter.rate_limit().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }
}
