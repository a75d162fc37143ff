use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::Error;
use crate::middleware::logging::LoggingMiddleware;
use crate::middleware::persistence::{DebouncedPersistence, StatePersister};
use crate::state::{Action, Effect, State, UpdateResult};
use crate::store::Store;

#[derive(Debug, Clone)]
struct DocState {
    version: u64,
    revision: u32,
}

impl State for DocState {
    fn state_id(&self) -> &str {
        "doc"
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn with_version(&self, version: u64) -> Self {
        Self { version, ..*self }
    }
}

#[derive(Debug, Clone)]
struct Edit;

impl Action for Edit {
    fn kind(&self) -> &'static str {
        "edit"
    }
}

#[derive(Debug)]
enum NoEffect {}

impl Effect for NoEffect {
    fn kind(&self) -> &'static str {
        match *self {}
    }
}

fn reduce(state: &DocState, _action: &Edit) -> UpdateResult<DocState, NoEffect> {
    UpdateResult::state_only(DocState {
        revision: state.revision + 1,
        ..*state
    })
}

#[derive(Default)]
struct RecordingPersister {
    saved_versions: Mutex<Vec<u64>>,
}

#[async_trait::async_trait]
impl StatePersister<DocState> for RecordingPersister {
    async fn save(&self, state: &DocState) -> anyhow::Result<()> {
        self.saved_versions.lock().push(state.version);
        Ok(())
    }
}

const WINDOW: Duration = Duration::from_millis(500);

fn debounced_store(
    persister: Arc<RecordingPersister>,
) -> (
    Store<DocState, Edit, NoEffect>,
    DebouncedPersistence<DocState>,
) {
    let persistence = DebouncedPersistence::new(persister, WINDOW);
    let store = Store::builder(
        "doc",
        DocState {
            version: 0,
            revision: 0,
        },
        reduce,
    )
    .middleware(persistence.clone())
    .build();
    (store, persistence)
}

#[tokio::test(start_paused = true)]
async fn burst_collapses_to_a_single_save() {
    let persister = Arc::new(RecordingPersister::default());
    let (store, persistence) = debounced_store(Arc::clone(&persister));

    for _ in 0..3 {
        store.dispatch(Edit).await.unwrap();
    }
    tokio::time::sleep(WINDOW + Duration::from_millis(200)).await;

    assert_eq!(*persister.saved_versions.lock(), vec![3]);
    assert_eq!(persistence.last_persisted_version(), 3);
}

#[tokio::test(start_paused = true)]
async fn new_change_supersedes_pending_window() {
    let persister = Arc::new(RecordingPersister::default());
    let (store, _persistence) = debounced_store(Arc::clone(&persister));

    store.dispatch(Edit).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    store.dispatch(Edit).await.unwrap();
    tokio::time::sleep(WINDOW + Duration::from_millis(200)).await;

    // The first window expired superseded; only the second one saved.
    assert_eq!(*persister.saved_versions.lock(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn force_save_cancels_pending_debounce() {
    let persister = Arc::new(RecordingPersister::default());
    let (store, persistence) = debounced_store(Arc::clone(&persister));

    store.dispatch(Edit).await.unwrap();
    persistence.force_save().await.unwrap();
    assert_eq!(*persister.saved_versions.lock(), vec![1]);

    // The cancelled window never produces a second write.
    tokio::time::sleep(WINDOW + Duration::from_millis(200)).await;
    assert_eq!(*persister.saved_versions.lock(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn unchanged_version_schedules_no_save() {
    let persister = Arc::new(RecordingPersister::default());
    let persistence = DebouncedPersistence::new(
        Arc::clone(&persister) as Arc<dyn StatePersister<DocState>>,
        WINDOW,
    );
    let store = Store::builder(
        "doc",
        DocState {
            version: 0,
            revision: 0,
        },
        |_state: &DocState, _action: &Edit| UpdateResult::<DocState, NoEffect>::no_change(),
    )
    .middleware(persistence.clone())
    .build();

    store.dispatch(Edit).await.unwrap();
    tokio::time::sleep(WINDOW + Duration::from_millis(200)).await;

    assert!(persister.saved_versions.lock().is_empty());
    assert_eq!(persistence.last_persisted_version(), 0);
}

struct FailingPersister;

#[async_trait::async_trait]
impl StatePersister<DocState> for FailingPersister {
    async fn save(&self, _state: &DocState) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

#[tokio::test(start_paused = true)]
async fn force_save_surfaces_persister_failure() {
    let persistence = DebouncedPersistence::new(Arc::new(FailingPersister), WINDOW);
    let store = Store::builder(
        "doc",
        DocState {
            version: 0,
            revision: 0,
        },
        reduce,
    )
    .middleware(persistence.clone())
    .build();

    store.dispatch(Edit).await.unwrap();
    let error = persistence.force_save().await.unwrap_err();
    assert!(matches!(error, Error::Operation { .. }));
    assert_eq!(persistence.last_persisted_version(), 0);
}

#[tokio::test]
async fn logging_middleware_passes_actions_through() {
    let store = Store::builder(
        "doc",
        DocState {
            version: 0,
            revision: 0,
        },
        reduce,
    )
    .middleware(LoggingMiddleware)
    .build();

    store.dispatch(Edit).await.unwrap();
    assert_eq!(store.version(), 1);
}
