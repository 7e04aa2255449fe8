use std::sync::Arc;

use chrono::Duration;
use memoria_core::auth::JwtKeys;
use memoria_core::events::EventBus;
use memoria_core::store::DocumentStore;

use crate::config::AppConfig;
use crate::gateways::Gateways;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: Arc<dyn DocumentStore>,
    gateways: Gateways,
    config: AppConfig,
    event_bus: EventBus,
    jwt: JwtKeys,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gateways: Gateways,
        config: AppConfig,
        event_bus: EventBus,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt_secret, Duration::hours(config.jwt_ttl_hours));
        Self {
            inner: Arc::new(InnerState {
                store,
                gateways,
                config,
                event_bus,
                jwt,
            }),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Owned handle for work that outlives the request, e.g. delayed replies.
    pub fn store_handle(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn gateways(&self) -> &Gateways {
        &self.inner.gateways
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }
}
