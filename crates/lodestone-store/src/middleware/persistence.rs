use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::state::{Action, Effect, State};

use super::{Middleware, MiddlewareContext, Next};

/// Persistence target for debounced saves.
#[async_trait::async_trait]
pub trait StatePersister<S>: Send + Sync + 'static {
    async fn save(&self, state: &S) -> anyhow::Result<()>;
}

struct DebounceShared<S> {
    /// Bumped on every schedule and on force-save; only a task whose
    /// generation is still current may perform its write.
    generation: AtomicU64,
    last_persisted: AtomicU64,
    save_lock: tokio::sync::Mutex<()>,
    pending: Mutex<Option<Arc<S>>>,
}

/// Collapses bursts of rapid state changes into a single persisted write.
///
/// After calling onward, if the observed version is newer than the last
/// persisted one, the latest state snapshot is parked and a delayed save is
/// scheduled, superseding any pending window. Saves from separate windows
/// are additionally serialized by their own lock.
pub struct DebouncedPersistence<S> {
    persister: Arc<dyn StatePersister<S>>,
    window: Duration,
    shared: Arc<DebounceShared<S>>,
}

impl<S> Clone for DebouncedPersistence<S> {
    fn clone(&self) -> Self {
        Self {
            persister: Arc::clone(&self.persister),
            window: self.window,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State> DebouncedPersistence<S> {
    pub fn new(persister: Arc<dyn StatePersister<S>>, window: Duration) -> Self {
        Self {
            persister,
            window,
            shared: Arc::new(DebounceShared {
                generation: AtomicU64::new(0),
                last_persisted: AtomicU64::new(0),
                save_lock: tokio::sync::Mutex::new(()),
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn last_persisted_version(&self) -> u64 {
        self.shared.last_persisted.load(Ordering::Acquire)
    }

    /// Cancel any pending debounce window and save immediately under the
    /// save lock, if the parked state is newer than the last persisted one.
    pub async fn force_save(&self) -> Result<()> {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let snapshot = self.shared.pending.lock().clone();
        let Some(state) = snapshot else {
            return Ok(());
        };
        let _guard = self.shared.save_lock.lock().await;
        if state.version() <= self.shared.last_persisted.load(Ordering::Acquire) {
            return Ok(());
        }
        self.persister
            .save(&state)
            .await
            .map_err(|error| Error::operation("force_save", format!("{error:#}")))?;
        self.shared
            .last_persisted
            .store(state.version(), Ordering::Release);
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S, A, E> Middleware<S, A, E> for DebouncedPersistence<S>
where
    S: State,
    A: Action,
    E: Effect,
{
    async fn handle(
        &self,
        ctx: &MiddlewareContext<S>,
        action: A,
        next: Next<'_, S, A, E>,
    ) -> Result<()> {
        next.run(action).await?;

        let version = ctx.version();
        if version <= self.shared.last_persisted.load(Ordering::Acquire) {
            return Ok(());
        }
        *self.shared.pending.lock() = Some(ctx.state());
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let shared = Arc::clone(&self.shared);
        let persister = Arc::clone(&self.persister);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if shared.generation.load(Ordering::Acquire) != generation {
                return;
            }
            let _guard = shared.save_lock.lock().await;
            if shared.generation.load(Ordering::Acquire) != generation {
                return;
            }
            let snapshot = shared.pending.lock().clone();
            let Some(state) = snapshot else {
                return;
            };
            if state.version() <= shared.last_persisted.load(Ordering::Acquire) {
                return;
            }
            match persister.save(&state).await {
                Ok(()) => {
                    shared
                        .last_persisted
                        .store(state.version(), Ordering::Release);
                    tracing::debug!(version = state.version(), "debounced state save completed");
                }
                Err(error) => {
                    tracing::warn!(%error, "debounced state save failed");
                }
            }
        });
        Ok(())
    }
}
