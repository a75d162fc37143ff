use crate::error::{Error, Result};
use crate::state::{Action, Effect, State};

use super::{Middleware, MiddlewareContext, Next};

type PreCheck<S, A> = Box<dyn Fn(&S, &A) -> bool + Send + Sync>;
type PostCheck<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;

/// Optional pre-check `(state, action) -> bool` run before calling onward
/// and optional post-check `(state) -> bool` run after. Either failing
/// aborts the dispatch with a descriptive error.
///
/// Validation wraps outside the core step, so a failing post-check observes
/// an already committed version and does not roll it back.
pub struct ValidationMiddleware<S, A> {
    description: &'static str,
    pre: Option<PreCheck<S, A>>,
    post: Option<PostCheck<S>>,
}

impl<S, A> ValidationMiddleware<S, A> {
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            pre: None,
            post: None,
        }
    }

    pub fn pre(mut self, check: impl Fn(&S, &A) -> bool + Send + Sync + 'static) -> Self {
        self.pre = Some(Box::new(check));
        self
    }

    pub fn post(mut self, check: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        self.post = Some(Box::new(check));
        self
    }
}

#[async_trait::async_trait]
impl<S, A, E> Middleware<S, A, E> for ValidationMiddleware<S, A>
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
        if let Some(pre) = &self.pre {
            if !pre(&ctx.state(), &action) {
                return Err(Error::validation("pre", kind, self.description));
            }
        }
        next.run(action).await?;
        if let Some(post) = &self.post {
            if !post(&ctx.state()) {
                return Err(Error::validation("post", kind, self.description));
            }
        }
        Ok(())
    }
}
