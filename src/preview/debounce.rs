use futures_util::future::pending;
use tokio::time::{sleep_until, Duration, Instant};

/// Holds back a value until no newer one arrived for `delay`
///
/// The timer belongs to the debouncer: pushing a value restarts it, and
/// dropping or cancelling the debouncer discards whatever was pending.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace the pending value and restart the delay
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Wait for the pending value to settle
    ///
    /// Never completes while nothing is pending. Dropping the future before
    /// it completes leaves the pending value in place, so this can sit in a
    /// `select!` next to the source of new values.
    pub async fn settled(&mut self) -> T {
        loop {
            let deadline = match &self.pending {
                Some((_, deadline)) => *deadline,
                None => {
                    pending::<()>().await;
                    continue;
                }
            };
            sleep_until(deadline).await;
            if let Some((value, _)) = self.pending.take() {
                return value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_latest_value_wins() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.push(1);
        advance(Duration::from_millis(400)).await;
        debouncer.push(2);
        advance(Duration::from_millis(400)).await;
        debouncer.push(3);

        let start = Instant::now();
        assert_eq!(debouncer.settled().await, 3);
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_never_settles() {
        let mut debouncer: Debouncer<u32> = Debouncer::new(Duration::from_millis(100));
        assert!(timeout(Duration::from_secs(10), debouncer.settled())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.push("draft");
        assert_eq!(debouncer.cancel(), Some("draft"));
        assert!(timeout(Duration::from_secs(1), debouncer.settled())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_wait_keeps_value() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.push("x");
        assert!(timeout(Duration::from_millis(200), debouncer.settled())
            .await
            .is_err());
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.settled().await, "x");
    }
}
