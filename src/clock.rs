use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic tick source for turn timers.
///
/// Each `start` bumps the generation and every tick carries it, so a tick that
/// was already queued when the clock stopped can be recognised and ignored.
pub struct Clock {
    period: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Clock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start ticking. `emit` is called with the generation once per period and
    /// returns false when nobody is listening anymore.
    pub fn start<F>(&mut self, mut emit: F)
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.stop();
        self.generation += 1;
        let generation = self.generation;
        let period = self.period;

        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !emit(generation) {
                    tracing::debug!("Clock generation {} has no listener, stopping", generation);
                    break;
                }
            }
        }));
        tracing::debug!("Clock started (generation {})", generation);
    }

    /// Stop ticking immediately
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Clock stopped (generation {})", self.generation);
        }
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = Clock::new(Duration::from_secs(1));
        clock.start(move |generation| tx.send(generation).is_ok());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        clock.stop();

        let mut ticks = Vec::new();
        while let Ok(generation) = rx.try_recv() {
            ticks.push(generation);
        }
        assert_eq!(ticks, vec![1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_clock() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = Clock::new(Duration::from_secs(1));
        clock.start(move |generation| tx.send(generation).is_ok());
        clock.stop();
        assert!(!clock.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_bumps_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = Clock::new(Duration::from_secs(1));
        let first = tx.clone();
        clock.start(move |generation| first.send(generation).is_ok());
        clock.start(move |generation| tx.send(generation).is_ok());
        assert_eq!(clock.generation(), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(rx.try_recv().ok(), Some(2));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut clock = Clock::new(Duration::from_secs(1));
            clock.start(move |generation| tx.send(generation).is_ok());
        }
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }
}
