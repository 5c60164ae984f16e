use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Wall-clock requests-per-second ceiling shared by every request a prober
/// makes. Unlike [`crate::ConcurrencyGate`] this paces requests over time.
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Arc<Limiter>,
    rate: NonZeroU32,
}

impl RequestPacer {
    /// `None` when `rate_per_second` is zero.
    pub fn per_second(rate_per_second: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate_per_second)?;
        Some(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
            rate,
        })
    }

    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    pub fn rate(&self) -> u32 {
        self.rate.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn zero_rate_disables_pacing() {
        assert!(RequestPacer::per_second(0).is_none());
        assert_eq!(RequestPacer::per_second(7).map(|p| p.rate()), Some(7));
    }

    #[tokio::test]
    async fn burst_beyond_quota_is_delayed() {
        let pacer = RequestPacer::per_second(5).unwrap();
        let start = Instant::now();
        // The first five pass immediately; the sixth has to wait for a new cell.
        for _ in 0..6 {
            pacer.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
