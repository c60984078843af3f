//! Draft persistence under the `invoiceFormData` key. All draft reads and
//! writes funnel through this store; nothing else touches the key.

use crate::models::fields::invoice_number_from_filename;
use crate::storage::{Storage, DRAFT_KEY};
use crate::types::{FieldValue, InvoiceDraft, Notification, SubmitOutcome};
use crate::validation;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<Storage>,
    pending: Arc<AtomicU64>,
    debounce: Duration,
}

impl DraftStore {
    pub fn new(storage: Arc<Storage>, debounce: Duration) -> Self {
        DraftStore {
            storage,
            pending: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    /// Read the persisted draft. Absent or corrupt storage yields an empty
    /// draft; unrecognized keys are dropped.
    pub fn load(&self) -> InvoiceDraft {
        let mut draft = self
            .storage
            .read_json::<InvoiceDraft>(DRAFT_KEY)
            .unwrap_or_default();
        draft.retain_known();
        draft
    }

    /// Full overwrite of the persisted draft. Write failures are logged and
    /// swallowed; the form keeps working on in-memory state.
    pub fn save(&self, draft: &InvoiceDraft) {
        if let Err(e) = self.storage.write_json(DRAFT_KEY, draft) {
            eprintln!("[draft] save failed: {}", e);
        }
    }

    /// Single-slot debounced save. Each call takes a fresh ticket and spawns
    /// a waiter; when the quiet period elapses, only the holder of the
    /// current ticket writes. Superseded waiters discard their snapshot, so
    /// the write always reflects the latest scheduled draft.
    pub fn schedule_auto_save(&self, draft: InvoiceDraft) {
        if draft.is_empty() {
            // The initial render schedules an all-empty draft; skip it.
            return;
        }
        let ticket = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        let store = self.clone();
        thread::spawn(move || {
            thread::sleep(store.debounce);
            if store.pending.load(Ordering::SeqCst) != ticket {
                return;
            }
            store.save(&draft);
        });
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(DRAFT_KEY) {
            eprintln!("[draft] clear failed: {}", e);
        }
    }

    /// Submission flow: schema rules first, then the two business rules.
    /// The persisted draft is rewritten only when both layers pass; a
    /// blocked submission leaves storage exactly as it was.
    pub fn submit(&self, draft: &InvoiceDraft) -> SubmitOutcome {
        let review = validation::evaluate_submission(draft);
        if !review.passed() {
            return SubmitOutcome {
                ok: false,
                field_errors: review.field_errors,
                banner_errors: review.violations.into_iter().map(|v| v.message).collect(),
                notification: None,
            };
        }
        self.save(draft);
        SubmitOutcome {
            ok: true,
            field_errors: HashMap::new(),
            banner_errors: Vec::new(),
            notification: Some(Notification::success("Form submitted successfully!")),
        }
    }

    /// Upload-driven autofill: an attached "INV-2024-001.pdf" suggests the
    /// invoice number "INV-2024-001". Applied to the persisted draft only
    /// when the user has not typed one; returns the value so the form can
    /// mirror it.
    pub fn autofill_invoice_number(&self, file_name: &str) -> Option<String> {
        let number = invoice_number_from_filename(file_name)?;
        let mut draft = self.load();
        if !draft.text("invoiceNumber").trim().is_empty() {
            return None;
        }
        draft.set("invoiceNumber", FieldValue::text(number.clone()));
        self.save(&draft);
        Some(number)
    }
}
