mod effects;
mod error;
mod events;
mod middleware;
mod state;
mod store;

pub use effects::{EffectHandler, UnhandledEffectPolicy};
pub use error::{Error, Result};
pub use events::StoreEventHub;
pub use middleware::logging::LoggingMiddleware;
pub use middleware::persistence::{DebouncedPersistence, StatePersister};
pub use middleware::validation::ValidationMiddleware;
pub use middleware::{Middleware, MiddlewareContext, Next};
pub use state::{Action, Effect, Reducer, State, UpdateResult};
pub use store::{Store, StoreBuilder, StoreHandle};
