use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::effects::{EffectDispatcher, EffectHandler, UnhandledEffectPolicy};
use crate::error::{Error, Result};
use crate::events::StoreEventHub;
use crate::middleware::{Middleware, MiddlewareContext, Next};
use crate::state::{Action, Effect, Reducer, State};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Owned state plus version counter. Mutated only inside the lock-protected
/// dispatch path; reads hand out the current `Arc` snapshot.
pub(crate) struct StateCell<S> {
    state: RwLock<Arc<S>>,
    version: AtomicU64,
}

impl<S: State> StateCell<S> {
    fn new(initial: S) -> Self {
        let version = initial.version();
        Self {
            state: RwLock::new(Arc::new(initial)),
            version: AtomicU64::new(version),
        }
    }

    pub(crate) fn state(&self) -> Arc<S> {
        Arc::clone(&self.state.read())
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn replace(&self, next: Arc<S>, version: u64) {
        *self.state.write() = next;
        self.version.store(version, Ordering::Release);
    }
}

pub(crate) struct StoreInner<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    name: String,
    cell: Arc<StateCell<S>>,
    reducer: Box<dyn Reducer<S, A, E>>,
    middlewares: Vec<Arc<dyn Middleware<S, A, E>>>,
    effects: EffectDispatcher<S, A, E>,
    hub: StoreEventHub<S, A>,
    dispatch_lock: tokio::sync::Mutex<()>,
}

/// Versioned, middleware-composable state container. All mutation flows
/// through [`Store::dispatch`], which holds an exclusive lock for the whole
/// action-publish, middleware-chain, effect-dispatch sequence.
pub struct Store<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    inner: Arc<StoreInner<S, A, E>>,
}

impl<S, A, E> Clone for Store<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, E> Store<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    pub fn builder(
        name: impl Into<String>,
        initial: S,
        reducer: impl Reducer<S, A, E>,
    ) -> StoreBuilder<S, A, E> {
        StoreBuilder {
            name: name.into(),
            initial,
            reducer: Box::new(reducer),
            middlewares: Vec::new(),
            handlers: HashMap::new(),
            policy: UnhandledEffectPolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Run one action through the middleware chain and the core update
    /// step. Concurrent dispatchers suspend until the lock is free, so at
    /// most one action is in flight at any instant.
    pub async fn dispatch(&self, action: A) -> Result<()> {
        let _guard = self.inner.dispatch_lock.lock().await;
        self.inner.hub.emit_action(action.clone());
        let ctx = MiddlewareContext::new(Arc::clone(&self.inner.cell));
        let core = CoreStep {
            inner: Arc::clone(&self.inner),
        };
        let next = Next {
            chain: &self.inner.middlewares,
            core: &core,
            ctx: &ctx,
        };
        next.run(action).await
    }

    /// Block the calling thread until the asynchronous dispatch completes.
    /// Must not be called from a context that would deadlock against the
    /// dispatch lock (e.g. from inside an effect handler).
    pub fn dispatch_blocking(&self, action: A) -> Result<()> {
        lodestone_runtime::block_on(self.dispatch(action))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> Arc<S> {
        self.inner.cell.state()
    }

    pub fn version(&self) -> u64 {
        self.inner.cell.version()
    }

    pub fn subscribe_actions(&self) -> tokio::sync::broadcast::Receiver<A> {
        self.inner.hub.subscribe_actions()
    }

    pub fn subscribe_states(&self) -> tokio::sync::broadcast::Receiver<Arc<S>> {
        self.inner.hub.subscribe_states()
    }

    pub fn handle(&self) -> StoreHandle<S, A, E> {
        StoreHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Weak handle given to effect handlers. Can read state and schedule new
/// dispatches without keeping the store alive.
pub struct StoreHandle<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    inner: Weak<StoreInner<S, A, E>>,
}

impl<S, A, E> Clone for StoreHandle<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S, A, E> StoreHandle<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    pub fn state(&self) -> Option<Arc<S>> {
        self.inner.upgrade().map(|inner| inner.cell.state())
    }

    pub fn version(&self) -> Option<u64> {
        self.inner.upgrade().map(|inner| inner.cell.version())
    }

    /// Schedule an action on its own dispatch turn. The task re-acquires
    /// the dispatch lock, so calling this from inside an effect handler
    /// cannot deadlock the in-flight dispatch.
    pub fn dispatch(&self, action: A) {
        let Some(inner) = self.inner.upgrade() else {
            tracing::debug!("store dropped; discarding re-dispatched action");
            return;
        };
        tokio::spawn(async move {
            let store = Store { inner };
            if let Err(error) = store.dispatch(action).await {
                tracing::warn!(store = %store.name(), %error, "re-dispatched action failed");
            }
        });
    }
}

/// The innermost layer of the onion: runs the reducer, stamps and commits
/// the new state, publishes it, then runs effects in order.
pub(crate) struct CoreStep<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    inner: Arc<StoreInner<S, A, E>>,
}

impl<S, A, E> CoreStep<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    pub(crate) async fn apply(&self, action: A) -> Result<()> {
        let inner = &self.inner;
        let current = inner.cell.state();
        let (next, effects) = inner.reducer.reduce(&current, &action).into_parts();

        if let Some(next_state) = next {
            let next_version = inner.cell.version() + 1;
            let stamped = next_state.with_version(next_version);
            if stamped.version() != next_version {
                return Err(Error::state_copy(
                    stamped.state_id(),
                    format!(
                        "with_version({next_version}) returned a copy at version {}",
                        stamped.version()
                    ),
                ));
            }
            let stamped = Arc::new(stamped);
            inner.cell.replace(Arc::clone(&stamped), next_version);
            inner.hub.emit_state(stamped);
        }

        for effect in effects {
            let handle = StoreHandle {
                inner: Arc::downgrade(&self.inner),
            };
            inner.effects.dispatch(effect, handle).await;
        }
        Ok(())
    }
}

pub struct StoreBuilder<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    name: String,
    initial: S,
    reducer: Box<dyn Reducer<S, A, E>>,
    middlewares: Vec<Arc<dyn Middleware<S, A, E>>>,
    handlers: HashMap<&'static str, Arc<dyn EffectHandler<S, A, E>>>,
    policy: UnhandledEffectPolicy,
    channel_capacity: usize,
}

impl<S, A, E> StoreBuilder<S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    /// Append a middleware. The first middleware added is the outermost
    /// layer of the onion.
    pub fn middleware(mut self, middleware: impl Middleware<S, A, E> + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn effect_handler(
        mut self,
        kind: &'static str,
        handler: impl EffectHandler<S, A, E> + 'static,
    ) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn unhandled_effects(mut self, policy: UnhandledEffectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Store<S, A, E> {
        Store {
            inner: Arc::new(StoreInner {
                name: self.name,
                cell: Arc::new(StateCell::new(self.initial)),
                reducer: self.reducer,
                middlewares: self.middlewares,
                effects: EffectDispatcher::new(self.handlers, self.policy),
                hub: StoreEventHub::new(self.channel_capacity),
                dispatch_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
