use tenantbind_core::dispatcher::Dispatcher;
use tenantbind_core::metrics::Metrics;

use std::sync::Arc;

#[derive(Clone)]
pub struct WebhookState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Arc<Metrics>,
}

impl WebhookState {
    pub fn new(dispatcher: Arc<Dispatcher>, metrics: Arc<Metrics>) -> Self {
        Self { dispatcher, metrics }
    }
}
