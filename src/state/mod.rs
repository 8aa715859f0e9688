use crate::api::{ApiClient, EnvConfig};
use leptos::prelude::*;

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: EnvConfig,
    pub api_client: RwSignal<ApiClient>,
}

impl AppState {
    pub fn new() -> Self {
        let config = EnvConfig::from_window();
        let api_client = ApiClient::load_from_storage(&config);

        tracing::info!(
            api_url = %config.api_url,
            refetch_after_save = config.refetch_after_save,
            authenticated = api_client.is_authenticated(),
            "console state initialised"
        );

        Self {
            config,
            api_client: RwSignal::new(api_client),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
