//! Environment-driven tunables. A `.env` in the app data dir is loaded at
//! startup, so production users can adjust limits without a rebuild
//! (Settings → Open app data folder).

use std::time::Duration;

pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub autosave_debounce: Duration,
    pub max_attachment_bytes: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            autosave_debounce: Duration::from_millis(env_u64(
                "INVOICE_AUTOSAVE_DEBOUNCE_MS",
                DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            )),
            max_attachment_bytes: env_u64(
                "INVOICE_MAX_ATTACHMENT_BYTES",
                DEFAULT_MAX_ATTACHMENT_BYTES,
            ),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
