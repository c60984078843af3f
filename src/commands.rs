use crate::models::fields::{sample_attachment, sample_draft};
use crate::services::attachment_store::AttachmentStore;
use crate::services::draft_store::DraftStore;
use crate::session::SessionGate;
use crate::types::{
    AttachmentRecord, FieldValue, InvoiceDraft, Notification, RestoredAttachment, SessionRecord,
    SubmitOutcome, ValidationResult,
};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tauri::{AppHandle, Manager, State};

pub struct AppState {
    pub draft: DraftStore,
    pub attachment: AttachmentStore,
    pub session: SessionGate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub user_name: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAttachmentPayload {
    pub path: String,
    pub mime_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateFieldPayload {
    pub name: String,
    pub value: FieldValue,
}

/// Result of an accepted upload: the staged record, the preview target, and
/// the invoice number derived from the filename (when the field was empty).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAttachment {
    pub record: AttachmentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleData {
    pub draft: InvoiceDraft,
    pub attachment: AttachmentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[tauri::command]
pub fn get_app_data_path(app: AppHandle) -> Result<String, String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path".to_string())
}

#[tauri::command]
pub fn get_app_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}

#[tauri::command]
pub fn open_app_data_folder(app: AppHandle) -> Result<(), String> {
    let path = app.path().app_data_dir().map_err(|e| e.to_string())?;
    opener::open(&path).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn login(state: State<AppState>, payload: LoginPayload) -> Result<SessionRecord, String> {
    state
        .session
        .login(&payload.user_name, &payload.password, payload.remember_me)
}

#[tauri::command]
pub fn get_session(state: State<AppState>) -> Option<SessionRecord> {
    state.session.current()
}

/// Logout drops the session and everything the form accumulated, including
/// the live preview handle.
#[tauri::command]
pub fn logout(state: State<AppState>) {
    state.session.end();
    state.draft.clear();
    state.attachment.clear();
}

#[tauri::command]
pub fn load_draft(state: State<AppState>) -> InvoiceDraft {
    state.draft.load()
}

#[tauri::command]
pub fn save_draft(state: State<AppState>, draft: InvoiceDraft) {
    state.draft.save(&draft);
}

#[tauri::command]
pub fn auto_save_draft(state: State<AppState>, draft: InvoiceDraft) {
    state.draft.schedule_auto_save(draft);
}

#[tauri::command]
pub fn clear_draft(state: State<AppState>) {
    state.draft.clear();
}

#[tauri::command]
pub fn save_attachment(
    state: State<AppState>,
    payload: SaveAttachmentPayload,
) -> Result<SavedAttachment, String> {
    let record = state
        .attachment
        .save(Path::new(&payload.path), &payload.mime_type)?;
    let invoice_number = state.draft.autofill_invoice_number(&record.name);
    Ok(SavedAttachment {
        preview: state.attachment.preview_reference(),
        invoice_number,
        record,
    })
}

#[tauri::command]
pub fn load_attachment(state: State<AppState>) -> Option<RestoredAttachment> {
    state.attachment.restore()
}

#[tauri::command]
pub fn clear_attachment(state: State<AppState>) {
    state.attachment.clear();
}

#[tauri::command]
pub fn get_preview_reference(state: State<AppState>) -> Option<String> {
    state.attachment.preview_reference()
}

#[tauri::command]
pub fn validate_invoice_field(payload: ValidateFieldPayload) -> ValidationResult {
    validation::validate_field(&payload.name, &payload.value)
}

#[tauri::command]
pub fn validate_invoice_draft(draft: InvoiceDraft) -> HashMap<String, ValidationResult> {
    validation::validate_all(&draft)
}

#[tauri::command]
pub fn submit_invoice(state: State<AppState>, draft: InvoiceDraft) -> SubmitOutcome {
    state.draft.submit(&draft)
}

/// "Populate with Dummy Data": sample field values plus the bundled sample
/// attachment, persisted immediately.
#[tauri::command]
pub fn populate_sample_data(state: State<AppState>) -> SampleData {
    let draft = sample_draft();
    state.draft.save(&draft);
    let attachment = state.attachment.attach_bundled(sample_attachment());
    SampleData {
        preview: state.attachment.preview_reference(),
        draft,
        attachment,
    }
}

#[tauri::command]
pub fn clear_all_data(state: State<AppState>) -> Notification {
    state.draft.clear();
    state.attachment.clear();
    Notification::info("Saved invoice data cleared.")
}
