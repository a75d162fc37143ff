use std::collections::HashMap;
use std::sync::Arc;

use crate::state::{Action, Effect, State};
use crate::store::StoreHandle;

/// What the dispatcher does with an effect no handler is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnhandledEffectPolicy {
    /// Log a warning and drop the effect.
    #[default]
    Warn,
    /// Drop the effect silently (for stores where optional effects are
    /// expected).
    Ignore,
}

/// Performs the side work described by one effect kind. The handle can read
/// state and re-dispatch; re-dispatched actions run on their own turn and
/// re-acquire the dispatch lock.
#[async_trait::async_trait]
pub trait EffectHandler<S, A, E>: Send + Sync
where
    S: State,
    A: Action,
    E: Effect,
{
    async fn run(&self, effect: E, store: StoreHandle<S, A, E>) -> anyhow::Result<()>;
}

pub(crate) struct EffectDispatcher<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    handlers: HashMap<&'static str, Arc<dyn EffectHandler<S, A, E>>>,
    policy: UnhandledEffectPolicy,
}

impl<S, A, E> EffectDispatcher<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    pub(crate) fn new(
        handlers: HashMap<&'static str, Arc<dyn EffectHandler<S, A, E>>>,
        policy: UnhandledEffectPolicy,
    ) -> Self {
        Self { handlers, policy }
    }

    /// Run the handler for one effect to completion. Handler failures are
    /// logged, never propagated: the state transition already committed.
    pub(crate) async fn dispatch(&self, effect: E, store: StoreHandle<S, A, E>) {
        let kind = effect.kind();
        let Some(handler) = self.handlers.get(kind) else {
            match self.policy {
                UnhandledEffectPolicy::Warn => {
                    tracing::warn!(effect = kind, "no handler registered for effect; dropping");
                }
                UnhandledEffectPolicy::Ignore => {}
            }
            return;
        };
        if let Err(error) = handler.run(effect, store).await {
            tracing::warn!(effect = kind, %error, "effect handler failed");
        }
    }
}
