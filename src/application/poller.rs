use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Schedule of the background balance reconciliation.
///
/// Owned by the processor task, which awaits [`Poller::tick`] alongside its
/// inbox. At most one poll is outstanding at a time: ticks firing while a poll
/// is in flight are dropped, the next tick being the retry.
#[derive(Debug)]
pub(crate) struct Poller {
    interval: Interval,
    in_flight: bool,
}

impl Poller {
    /// The first tick fires one `period` from now; the startup fetch covers time zero.
    pub(crate) fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            in_flight: false,
        }
    }

    pub(crate) async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }

    /// Claims the poll slot, returning `false` if a poll is already running.
    pub(crate) fn try_begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub(crate) fn finish(&mut self) {
        self.in_flight = false;
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let start = Instant::now();
        let mut poller = Poller::new(Duration::from_secs(10));

        let first = poller.tick().await;
        assert_eq!(first - start, Duration::from_secs(10));
        let second = poller.tick().await;
        assert_eq!(second - first, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_single_poll_in_flight() {
        let mut poller = Poller::new(Duration::from_secs(10));
        assert!(poller.try_begin());
        assert!(poller.in_flight());
        assert!(!poller.try_begin());

        poller.finish();
        assert!(!poller.in_flight());
        assert!(poller.try_begin());
    }
}
