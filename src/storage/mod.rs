pub(crate) const TOKEN_KEY: &str = "pathway_admin_token";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

/// Bearer token written by the console's login flow.
pub(crate) fn load_token_from_storage() -> Option<String> {
    local_storage()
        .and_then(|s| s.get_item(TOKEN_KEY).ok().flatten())
        .filter(|t| !t.trim().is_empty())
}

#[cfg(all(test, target_arch = "wasm32"))]
pub(crate) fn save_token_to_storage(token: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.set_item(TOKEN_KEY, token);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
pub(crate) fn clear_token_from_storage() {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(TOKEN_KEY);
    }
}
