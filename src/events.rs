//! Process-wide publish/subscribe channel.
//!
//! Carries the logout broadcast (consumed by request caches that must purge
//! themselves) and transient user-facing notices. Publishers never learn who
//! is listening and receive no acknowledgment.

use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The session was cleared. No payload.
    LoggedOut,
    /// Short-lived message for the user (toast).
    Notice(Notice),
}

/// Toast text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers were listening;
    /// zero is not an error.
    pub fn publish(&self, event: AppEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "Event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a task that runs `callback` once per `LoggedOut` event.
/// The task ends when every `EventBus` handle has been dropped; abort the
/// returned handle to unsubscribe earlier.
pub fn on_logout<F>(bus: &EventBus, mut callback: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(AppEvent::LoggedOut) => callback(),
                Ok(AppEvent::Notice(_)) => {}
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    // The dropped events may have included a logout.
                    debug!(lagged = count, "Logout subscriber lagged");
                    callback();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
