use crate::{
    config::Config,
    services::{email::Notifier, storage::DocumentStore},
    store::Store,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub notifier: Arc<dyn Notifier>,
    pub documents: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: Config,
        notifier: Arc<dyn Notifier>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config),
            notifier,
            documents,
        }
    }
}
