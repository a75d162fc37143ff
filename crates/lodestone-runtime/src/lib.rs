use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Runtime};

fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("lodestone-runtime")
            .build()
            .expect("failed to build shared tokio runtime")
    })
}

/// Drive a future to completion on the shared runtime, blocking the calling
/// thread. Must not be called from within an async context that could
/// deadlock against resources the future itself needs.
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    runtime().block_on(future)
}
