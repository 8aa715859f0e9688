mod api;
mod app;
mod components;
mod hierarchy;
mod models;
mod pages;
mod state;
mod storage;
mod sync;

pub use app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::api::{ApiClient, EnvConfig};
    use crate::storage::{clear_token_from_storage, save_token_to_storage};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_api_client_picks_up_stored_token() {
        let config = EnvConfig::default();
        clear_token_from_storage();
        assert!(!ApiClient::load_from_storage(&config).is_authenticated());

        save_token_to_storage("t1");
        let client = ApiClient::load_from_storage(&config);
        assert_eq!(client.get_auth_header().as_deref(), Some("Bearer t1"));

        clear_token_from_storage();
        assert!(ApiClient::load_from_storage(&config).get_auth_header().is_none());
    }

    #[wasm_bindgen_test]
    fn test_blank_stored_token_is_ignored() {
        save_token_to_storage("   ");
        assert!(!ApiClient::load_from_storage(&EnvConfig::default()).is_authenticated());
        clear_token_from_storage();
    }

    #[wasm_bindgen_test]
    fn test_env_config_without_window_env_uses_defaults() {
        let config = EnvConfig::from_window();
        assert!(!config.api_url.is_empty());
    }
}

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    #[cfg(target_arch = "wasm32")]
    tracing_wasm::set_as_global_default();

    tracing::info!("mounting learning path editor");
    mount_to_body(App);
}
