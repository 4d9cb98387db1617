use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Trigger side, held by whoever may stop a run (the Ctrl-C handler).
#[derive(Debug, Clone)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Observed by the pipeline: an explicit cancel, an optional deadline, or both.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal { rx, deadline: None })
    }

    /// A signal that only its deadline (if any) can trip.
    #[cfg(test)]
    pub fn never() -> Self {
        Self::pair().1
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.deadline.is_some_and(|at| Instant::now() >= at)
    }

    /// Resolves once cancelled; pends forever otherwise.
    pub async fn cancelled(&mut self) {
        let deadline = self.deadline;
        let rx = &mut self.rx;

        let flagged = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                // Sender gone without cancelling: nothing can set the flag any more.
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        match deadline {
            Some(at) => {
                tokio::select! {
                    _ = flagged => {}
                    _ = tokio::time::sleep_until(at) => {}
                }
            }
            None => flagged.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_is_observed() {
        let (handle, mut signal) = CancelSignal::pair();
        assert!(!signal.is_cancelled());
        handle.cancel();
        assert!(signal.is_cancelled());
        signal.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_trips_without_handle() {
        let mut signal = CancelSignal::never().with_timeout(Duration::from_secs(5));
        assert!(!signal.is_cancelled());
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn never_stays_pending() {
        let mut signal = CancelSignal::never();
        let outcome = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(outcome.is_err());
    }
}
