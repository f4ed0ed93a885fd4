//! Tracks online/offline transitions and triggers reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::option_service::OptionListService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CameOnline,
    WentOffline,
    Unchanged,
}

/// Sending half handed to the platform glue, which forwards every `online`
/// (`true`) and `offline` (`false`) event.
pub type ConnectivitySignal = UnboundedSender<bool>;

pub struct ConnectivityObserver {
    online: AtomicBool,
}

impl ConnectivityObserver {
    pub fn new(initially_online: bool) -> Self {
        ConnectivityObserver {
            online: AtomicBool::new(initially_online),
        }
    }

    /// Creates an observer together with the channel feeding it.
    pub fn channel(initially_online: bool) -> (Self, ConnectivitySignal, UnboundedReceiver<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(initially_online), tx, rx)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a platform connectivity value and reports the edge it forms.
    pub fn observe(&self, online: bool) -> Transition {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        match (was_online, online) {
            (false, true) => Transition::CameOnline,
            (true, false) => Transition::WentOffline,
            _ => Transition::Unchanged,
        }
    }

    /// Feeds connectivity events into `service` until every sender is gone.
    ///
    /// Starting online syncs once right away, which picks up a queue left
    /// over from a previous session. After that, each offline to online edge
    /// triggers exactly one sync; flapping is not debounced.
    pub async fn run(&self, mut events: UnboundedReceiver<bool>, service: Arc<OptionListService>) {
        service.set_online(self.is_online());
        if self.is_online() {
            let outcome = service.sync_now().await;
            debug!("Startup sync: {outcome:?}");
        }

        while let Some(online) = events.recv().await {
            match self.observe(online) {
                Transition::CameOnline => {
                    service.set_online(true);
                    let outcome = service.sync_now().await;
                    info!("Back online, sync outcome: {outcome:?}");
                }
                Transition::WentOffline => {
                    service.set_online(false);
                    info!("Went offline, queueing further changes");
                }
                Transition::Unchanged => {}
            }
        }
        debug!("Connectivity signal closed");
    }
}
