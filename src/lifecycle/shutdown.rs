//! Stop signal for background loops.

use tokio::sync::watch;

/// Owner side of the stop signal.
///
/// The signal is a level, not an event: a loop that subscribes after
/// [`Shutdown::trigger`] still sees it and returns on its first check.
#[derive(Debug)]
pub struct Shutdown {
    stopped: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stopped, _) = watch::channel(false);
        Self { stopped }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            stopped: self.stopped.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.stopped.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Loops still holding a signal.
    pub fn listeners(&self) -> usize {
        self.stopped.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side, held by one loop.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    stopped: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolves once shutdown is triggered, or when the owner is dropped.
    pub async fn triggered(&mut self) {
        // An error means the owner is gone, which also ends the loop.
        let _ = self.stopped.wait_for(|stopped| *stopped).await;
    }
}
