// Profile change notifications
// Subscribers receive events over a channel instead of callbacks, so nothing
// runs on the publishing thread while the repository lock is held.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Published once after every successful mutation of the profile set.
/// Undrained signals coalesce: a subscriber holds at most one pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEvent {
    Changed,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(u64, Sender<ProfileEvent>)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Default)]
pub struct ProfileEvents {
    registry: Arc<Mutex<Registry>>,
}

impl ProfileEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = bounded(1);
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, tx));

        Subscription {
            id,
            receiver: rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Signal every live subscriber. Returns how many are still subscribed.
    pub fn publish(&self, event: ProfileEvent) -> usize {
        let mut registry = lock(&self.registry);
        registry.subscribers.retain(|(_, tx)| match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
        registry.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// Handle to a change subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: Receiver<ProfileEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn receiver(&self) -> &Receiver<ProfileEvent> {
        &self.receiver
    }

    pub fn try_recv(&self) -> Option<ProfileEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProfileEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Everything queued so far, without blocking
    pub fn drain(&self) -> Vec<ProfileEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
