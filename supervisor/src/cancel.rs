use tokio::sync::watch;

/// A resettable, level-triggered "stop reading output" flag.
///
/// Once set it stays set until the next run clears it, so a watcher that only starts
/// listening after the stop request still observes it.
#[derive(Debug)]
pub struct CancellationSignal {
    flag: watch::Sender<bool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag }
    }

    pub fn set(&self) {
        self.flag.send_replace(true);
    }

    pub fn clear(&self) {
        self.flag.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.flag.borrow()
    }

    pub fn watch(&self) -> CancellationWatcher {
        CancellationWatcher {
            flag: self.flag.subscribe(),
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct CancellationWatcher {
    flag: watch::Receiver<bool>,
}

impl CancellationWatcher {
    pub fn is_set(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once the flag is set. A dropped signal counts as set.
    pub async fn cancelled(&mut self) {
        let _ = self.flag.wait_for(|set| *set).await;
    }
}
