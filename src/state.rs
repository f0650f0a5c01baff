use crate::adapters::MemoryStore;
use crate::auth::AuthState;
use crate::config::AppConfig;
use crate::live::LiveView;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub(crate) auth: AuthState,
    pub store: MemoryStore,
    pub live: LiveView,
}
