use crate::config::Settings;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide pacing gate for market-data calls.
///
/// Every caller passes through `acquire()` before issuing a request. The lock is
/// held across the pacing sleep, so concurrent callers queue (tokio's mutex is
/// FIFO) and each one measures its wait against the stamp left by the caller
/// directly ahead of it.
#[derive(Debug)]
pub struct Gateway {
    min_interval: Duration,
    // None until the first call goes out.
    last_request: Mutex<Option<Instant>>,
}

impl Gateway {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.csqaq_min_interval)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until at least `min_interval` has passed since the previous
    /// `acquire()` returned, then stamps the current instant.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "pacing market-data call");
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_acquire_does_not_wait() {
        let gw = Gateway::new(Duration::from_secs(5));
        let start = std::time::Instant::now();
        gw.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn back_to_back_calls_are_spaced_on_the_wall_clock() {
        let interval = Duration::from_millis(60);
        let gw = Gateway::new(interval);

        gw.acquire().await;
        let t1 = std::time::Instant::now();
        gw.acquire().await;
        let t2 = std::time::Instant::now();

        assert!(t2 - t1 >= interval, "gap was {:?}", t2 - t1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_gap_longer_than_interval_costs_nothing() {
        let gw = Gateway::new(Duration::from_millis(1200));
        gw.acquire().await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let before = Instant::now();
        gw.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let interval = Duration::from_millis(1200);
        let gw = Arc::new(Gateway::new(interval));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gw = gw.clone();
            handles.push(tokio::spawn(async move {
                gw.acquire().await;
                Instant::now()
            }));
        }

        let mut stamps = Vec::new();
        for h in handles {
            stamps.push(h.await.unwrap());
        }
        stamps.sort();

        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap was {:?}", pair[1] - pair[0]);
        }
    }
}
