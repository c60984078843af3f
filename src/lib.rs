mod commands;
mod config;
mod models;
mod services;
mod session;
mod storage;
mod types;
mod validation;

use commands::AppState;
use config::AppConfig;
use services::attachment_store::AttachmentStore;
use services::draft_store::DraftStore;
use session::SessionGate;
use std::sync::Arc;
use storage::Storage;
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|e| e.to_string())?;
            // Load .env from app data dir so users can tune limits there (Settings → Open app data folder)
            let env_path = app_data_dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
            }
            let config = AppConfig::from_env();
            let storage = Arc::new(Storage::open(app_data_dir.join("invoice_entry.db"))?);
            let attachment = AttachmentStore::new(
                Arc::clone(&storage),
                app_data_dir.join("previews"),
                config.max_attachment_bytes,
            )?;
            app.manage(AppState {
                draft: DraftStore::new(Arc::clone(&storage), config.autosave_debounce),
                attachment,
                session: SessionGate::new(storage),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_data_path,
            commands::open_app_data_folder,
            commands::get_app_version,
            commands::login,
            commands::get_session,
            commands::logout,
            commands::load_draft,
            commands::save_draft,
            commands::auto_save_draft,
            commands::clear_draft,
            commands::save_attachment,
            commands::load_attachment,
            commands::clear_attachment,
            commands::get_preview_reference,
            commands::validate_invoice_field,
            commands::validate_invoice_draft,
            commands::submit_invoice,
            commands::populate_sample_data,
            commands::clear_all_data,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application")
}
