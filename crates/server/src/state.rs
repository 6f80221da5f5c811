use std::sync::Arc;
use std::time::Duration;

use mrcontent_core::{
    Authenticator, Config, ContentStore, Dispatcher, MessageBus, ResultIngestor, TaskTracker,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn ContentStore>,
    bus: Arc<dyn MessageBus>,
    tracker: Arc<TaskTracker>,
    dispatcher: Arc<Dispatcher>,
    ingestor: Arc<ResultIngestor>,
}

impl AppState {
    /// Wire the processing components around a store and a bus.
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn ContentStore>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        let timeout = Duration::from_millis(config.database.timeout_ms);
        let tracker = Arc::new(TaskTracker::new(Arc::clone(&store), timeout));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&bus),
            Arc::clone(&tracker),
            config.processing.clone(),
        ));
        let ingestor = Arc::new(
            ResultIngestor::new(Arc::clone(&store), Arc::clone(&tracker), timeout)
                .with_dedupe(config.processing.dedupe_results),
        );

        Self {
            config,
            authenticator,
            store,
            bus,
            tracker,
            dispatcher,
            ingestor,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    pub fn tracker(&self) -> &Arc<TaskTracker> {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn ingestor(&self) -> &Arc<ResultIngestor> {
        &self.ingestor
    }

    /// Upper bound for a single store call made from a handler.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.config.database.timeout_ms)
    }
}
