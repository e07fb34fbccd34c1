use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::http::HeaderMap;
use services::AppServices;
use study_core::model::UserId;

use crate::auth::IdentityProvider;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    services: AppServices,
    identity: Arc<dyn IdentityProvider>,
    request_seq: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices, identity: impl IdentityProvider + 'static) -> Self {
        Self {
            services,
            identity: Arc::new(identity),
            request_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    #[must_use]
    pub fn services(&self) -> &AppServices {
        &self.services
    }

    pub(crate) fn identify(&self, headers: &HeaderMap) -> Option<UserId> {
        self.identity.identify(headers)
    }

    pub(crate) fn next_request_id(&self) -> String {
        let id = self.request_seq.fetch_add(1, Ordering::Relaxed);
        format!("req-{id:016x}")
    }
}
