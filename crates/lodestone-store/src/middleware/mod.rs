pub mod logging;
pub mod persistence;
pub mod validation;

use std::sync::Arc;

use crate::error::Result;
use crate::state::{Action, Effect, State};
use crate::store::{CoreStep, StateCell};

/// Read-only view of the store a middleware observes during one dispatch.
/// Reads go straight to the live cell, so a middleware that runs after
/// calling onward sees the committed state.
pub struct MiddlewareContext<S> {
    cell: Arc<StateCell<S>>,
}

impl<S: State> MiddlewareContext<S> {
    pub(crate) fn new(cell: Arc<StateCell<S>>) -> Self {
        Self { cell }
    }

    pub fn state(&self) -> Arc<S> {
        self.cell.state()
    }

    pub fn version(&self) -> u64 {
        self.cell.version()
    }
}

/// Interceptor wrapping the dispatch pipeline onion-style. The chain is
/// composed fresh per dispatch, right to left; the innermost call is the
/// core update step.
#[async_trait::async_trait]
pub trait Middleware<S, A, E>: Send + Sync
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
    ) -> Result<()>;
}

/// Continuation of the dispatch chain. Consumed by `run`; a middleware that
/// does not call onward aborts the dispatch.
pub struct Next<'a, S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    pub(crate) chain: &'a [Arc<dyn Middleware<S, A, E>>],
    pub(crate) core: &'a CoreStep<S, A, E>,
    pub(crate) ctx: &'a MiddlewareContext<S>,
}

impl<'a, S, A, E> Next<'a, S, A, E>
where
    S: State,
    A: Action,
    E: Effect,
{
    pub async fn run(self, action: A) -> Result<()> {
        match self.chain.split_first() {
            Some((middleware, rest)) => {
                let next = Next {
                    chain: rest,
                    core: self.core,
                    ctx: self.ctx,
                };
                middleware.handle(self.ctx, action, next).await
            }
            None => self.core.apply(action).await,
        }
    }
}

#[cfg(test)]
#[path = "../tests/middleware_tests.rs"]
mod tests;
