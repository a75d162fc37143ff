use crate::error::Result;
use crate::state::{Action, Effect, State};

use super::{Middleware, MiddlewareContext, Next};

/// Records the action discriminant and pre-dispatch version before calling
/// onward, and the outcome after. Errors are logged and re-raised, never
/// swallowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

#[async_trait::async_trait]
impl<S, A, E> Middleware<S, A, E> for LoggingMiddleware
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
        let kind = action.kind();
        let version = ctx.version();
        tracing::debug!(action = kind, version, "dispatching action");
        match next.run(action).await {
            Ok(()) => {
                tracing::debug!(action = kind, version = ctx.version(), "action completed");
                Ok(())
            }
            Err(error) => {
                tracing::error!(action = kind, %error, "action dispatch failed");
                Err(error)
            }
        }
    }
}
