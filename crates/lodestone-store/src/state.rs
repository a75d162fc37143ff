/// State owned by a store. Once a value has been published on the change
/// stream it is never mutated in place; every transition produces a fresh
/// copy stamped with the next version.
pub trait State: Send + Sync + 'static {
    /// Stable identifier for logging and persistence keys.
    fn state_id(&self) -> &str;

    fn version(&self) -> u64;

    /// Produce a fully independent copy of this state carrying `version`.
    /// The store verifies the stamp and fails the dispatch if the copy does
    /// not carry it.
    fn with_version(&self, version: u64) -> Self
    where
        Self: Sized;
}

/// A request to transition state. The value is its own payload; `kind`
/// is the discriminant used for logging and validation.
pub trait Action: Clone + Send + Sync + 'static {
    fn kind(&self) -> &'static str;
}

/// Side work emitted by a transition, handled outside the update function.
/// Effects are never re-dispatched through the reducer.
pub trait Effect: Send + Sync + 'static {
    fn kind(&self) -> &'static str;
}

/// Next state plus the ordered side effects a transition produced.
///
/// A `None` next state is an explicit no-op: the store emits nothing and
/// the version counter does not advance. The reducer decides; the store
/// never diffs states by value or identity.
#[derive(Debug)]
pub struct UpdateResult<S, E> {
    next: Option<S>,
    effects: Vec<E>,
}

impl<S, E> UpdateResult<S, E> {
    pub fn state_only(next: S) -> Self {
        Self {
            next: Some(next),
            effects: Vec::new(),
        }
    }

    pub fn with_effects(next: S, effects: Vec<E>) -> Self {
        Self {
            next: Some(next),
            effects,
        }
    }

    pub fn no_change() -> Self {
        Self {
            next: None,
            effects: Vec::new(),
        }
    }

    /// No transition, but still run side effects.
    pub fn effects_only(effects: Vec<E>) -> Self {
        Self { next: None, effects }
    }

    pub fn is_change(&self) -> bool {
        self.next.is_some()
    }

    pub(crate) fn into_parts(self) -> (Option<S>, Vec<E>) {
        (self.next, self.effects)
    }
}

/// Pure update function `(state, action) -> (next state, effects)`.
pub trait Reducer<S, A, E>: Send + Sync + 'static {
    fn reduce(&self, state: &S, action: &A) -> UpdateResult<S, E>;
}

impl<S, A, E, F> Reducer<S, A, E> for F
where
    F: Fn(&S, &A) -> UpdateResult<S, E> + Send + Sync + 'static,
{
    fn reduce(&self, state: &S, action: &A) -> UpdateResult<S, E> {
        self(state, action)
    }
}
