use std::sync::Arc;

use crate::{
    config::Config,
    database::{RedisStore, Store, init_redis},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let connection = init_redis(&config.redis_url).await;

        Arc::new(Self {
            config,
            store: Arc::new(RedisStore::new(connection)),
        })
    }

    /// State over an arbitrary store, used by the test suites with
    /// [`crate::database::MemoryStore`].
    pub fn with_store(store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            config: Config {
                port: 0,
                redis_url: String::new(),
            },
            store,
        })
    }
}
