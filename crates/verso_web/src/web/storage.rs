use verso::config::DEFAULT_API_URL;

use crate::ui_model::{normalize_api_url, STORAGE_KEY_API_URL};

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(super) fn local_storage_get_string(key: &str) -> Option<String> {
    local_storage().and_then(|s| s.get_item(key).ok().flatten())
}

pub(super) fn local_storage_set_string(key: &str, value: &str) -> Result<(), String> {
    let s = local_storage().ok_or("localStorage unavailable")?;
    s.set_item(key, value)
        .map_err(|_| "localStorage write failed".to_string())
}

pub(super) fn local_storage_remove(key: &str) {
    if let Some(s) = local_storage() {
        let _ = s.remove_item(key);
    }
}

/// Base URL of the GA service: a saved override, else the build-time
/// `VERSO_API_URL`, else the local default.
pub(super) fn api_url() -> String {
    local_storage_get_string(STORAGE_KEY_API_URL)
        .and_then(|v| normalize_api_url(&v))
        .or_else(|| option_env!("VERSO_API_URL").and_then(normalize_api_url))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Persist an override; an empty value clears it.
pub(super) fn save_api_url(text: &str) -> Result<Option<String>, String> {
    if text.trim().is_empty() {
        local_storage_remove(STORAGE_KEY_API_URL);
        return Ok(None);
    }
    let url = normalize_api_url(text).ok_or_else(|| format!("{text:?} is not an http(s) URL"))?;
    local_storage_set_string(STORAGE_KEY_API_URL, &url)?;
    Ok(Some(url))
}
