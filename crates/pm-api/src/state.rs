use axum::extract::FromRef;
use pm_core::AuthService;
use pm_shared::config::AppConfig;
use std::sync::Arc;

use crate::auth::AuthGate;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub gate: AuthGate,
}

impl FromRef<AppState> for AuthGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}
