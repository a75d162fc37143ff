use std::sync::Arc;

use tokio::sync::broadcast;

/// Strictly ordered action and state-change streams for observers.
///
/// Bounded broadcast channels: a lagging subscriber loses the oldest
/// entries rather than blocking dispatch. Subscribers may attach or drop
/// while a dispatch is in flight.
pub struct StoreEventHub<S, A> {
    action_tx: broadcast::Sender<A>,
    state_tx: broadcast::Sender<Arc<S>>,
}

impl<S, A> StoreEventHub<S, A>
where
    S: Send + Sync + 'static,
    A: Clone + Send + 'static,
{
    pub(crate) fn new(capacity: usize) -> Self {
        let (action_tx, _) = broadcast::channel(capacity);
        let (state_tx, _) = broadcast::channel(capacity);
        Self { action_tx, state_tx }
    }

    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_tx.subscribe()
    }

    pub fn subscribe_states(&self) -> broadcast::Receiver<Arc<S>> {
        self.state_tx.subscribe()
    }

    pub(crate) fn emit_action(&self, action: A) {
        let _ = self.action_tx.send(action);
    }

    pub(crate) fn emit_state(&self, state: Arc<S>) {
        let _ = self.state_tx.send(state);
    }
}
