//! Shared application state handed to every handler

use crate::auth::{AuthState, SessionStore};
use crate::config::AppConfig;
use crate::feature_extractor::FeatureExtractor;
use crate::map::MapRenderer;
use crate::metrics::PortalMetrics;
use crate::models::InferenceEngine;
use crate::server::session::SessionId;
use crate::store::Store;
use crate::views::PageContext;
use std::sync::Arc;

/// Services constructed once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<InferenceEngine>,
    pub extractor: Arc<FeatureExtractor>,
    pub store: Arc<Store>,
    pub sessions: Arc<SessionStore>,
    pub maps: Arc<MapRenderer>,
    pub metrics: Arc<PortalMetrics>,
}

impl AppState {
    pub fn new(config: AppConfig, engine: InferenceEngine, store: Store) -> Self {
        let maps = MapRenderer::new(&config.map);
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            extractor: Arc::new(FeatureExtractor::new()),
            store: Arc::new(store),
            sessions: Arc::new(SessionStore::new()),
            maps: Arc::new(maps),
            metrics: Arc::new(PortalMetrics::new()),
        }
    }

    pub fn auth(&self, session: &SessionId) -> AuthState {
        self.sessions.auth_state(session.as_str())
    }

    /// Current user plus pending flashes; consumes the flashes.
    pub fn page(&self, session: &SessionId) -> PageContext {
        PageContext {
            user: self.auth(session).user().cloned(),
            flashes: self.sessions.take_flashes(session.as_str()),
        }
    }
}
