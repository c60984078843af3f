//! Attachment persistence under the `invoiceFileInfo` key: boundary checks,
//! background base64 capture, preview-file lifecycle, and restore on start.

use crate::storage::{Storage, ATTACHMENT_KEY};
use crate::types::{AttachmentContent, AttachmentRecord, RestoredAttachment};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::UNIX_EPOCH;

pub const PDF_MIME: &str = "application/pdf";

/// Live preview target handed to the PDF renderer. Temp files play the role
/// the browser build gave object URLs and must be released on clear,
/// replacement, and logout.
#[derive(Debug)]
enum PreviewHandle {
    TempFile(PathBuf),
    Asset(String),
}

impl PreviewHandle {
    fn reference(&self) -> String {
        match self {
            PreviewHandle::TempFile(path) => path.to_string_lossy().to_string(),
            PreviewHandle::Asset(asset) => asset.clone(),
        }
    }

    fn release(self) {
        if let PreviewHandle::TempFile(path) = self {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    eprintln!(
                        "[attachment] could not remove preview file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct AttachmentStore {
    storage: Arc<Storage>,
    preview_dir: PathBuf,
    preview: Arc<Mutex<Option<PreviewHandle>>>,
    generation: Arc<AtomicU64>,
    max_bytes: u64,
}

impl AttachmentStore {
    pub fn new(
        storage: Arc<Storage>,
        preview_dir: PathBuf,
        max_bytes: u64,
    ) -> Result<Self, String> {
        fs::create_dir_all(&preview_dir).map_err(|e| e.to_string())?;
        Ok(AttachmentStore {
            storage,
            preview_dir,
            preview: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            max_bytes,
        })
    }

    /// Boundary checks, run before any state is touched: exact PDF MIME
    /// type, size cap, and the `%PDF-` header. Returns (size, mtime ms).
    fn validate_file(&self, path: &Path, mime_type: &str) -> Result<(u64, i64), String> {
        if mime_type != PDF_MIME {
            return Err("Please select a valid PDF file".to_string());
        }
        if !path.exists() {
            return Err("File not found.".to_string());
        }
        let metadata = fs::metadata(path).map_err(|e| e.to_string())?;
        if metadata.len() > self.max_bytes {
            return Err(format!(
                "File too large (max {}MB).",
                self.max_bytes / (1024 * 1024)
            ));
        }
        let mut f = fs::File::open(path).map_err(|e| format!("Could not open: {}", e))?;
        let mut header = [0u8; 8];
        if f.read(&mut header).unwrap_or(0) < 5 || !header.starts_with(b"%PDF-") {
            return Err("Not a valid PDF file.".to_string());
        }
        let mtime_ms = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Ok((metadata.len(), mtime_ms))
    }

    /// Synchronous half of `save`: validate, replace the previous attachment
    /// (record, storage entry, preview handle), and stage a live preview
    /// copy. Returns the display-only record and the ticket the background
    /// encode must present before persisting.
    pub fn stage(&self, path: &Path, mime_type: &str) -> Result<(AttachmentRecord, u64), String> {
        let (byte_size, last_modified) = self.validate_file(path, mime_type)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment.pdf")
            .to_string();

        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Replacement is total: the old storage entry must not outlive the
        // old preview, even if the new encode later fails.
        if let Err(e) = self.storage.remove(ATTACHMENT_KEY) {
            eprintln!("[attachment] could not drop previous record: {}", e);
        }

        let preview_path = self.preview_dir.join(format!("preview-{}.pdf", ticket));
        match fs::copy(path, &preview_path) {
            Ok(_) => self.install_preview(Some(PreviewHandle::TempFile(preview_path))),
            Err(e) => {
                eprintln!("[attachment] preview copy failed: {}", e);
                self.install_preview(None);
            }
        }

        let record = AttachmentRecord {
            name,
            byte_size,
            mime_type: PDF_MIME.to_string(),
            last_modified,
            content: AttachmentContent::Uploaded { encoded: None },
        };
        Ok((record, ticket))
    }

    /// Asynchronous half of `save`: capture the bytes as base64 and persist
    /// the full record, unless the ticket has been superseded (the user
    /// removed or replaced the attachment, or logged out, before the encode
    /// finished). Failures are logged; the staged preview stays usable for
    /// the current session either way.
    pub fn encode_and_persist(&self, ticket: u64, path: &Path, mut record: AttachmentRecord) {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("[attachment] could not read {}: {}", path.display(), e);
                return;
            }
        };
        let encoded = BASE64.encode(&bytes);
        if self.generation.load(Ordering::SeqCst) != ticket {
            eprintln!("[attachment] discarding stale encode for {}", record.name);
            return;
        }
        record.content = AttachmentContent::Uploaded {
            encoded: Some(encoded),
        };
        if let Err(e) = self.storage.write_json(ATTACHMENT_KEY, &record) {
            eprintln!("[attachment] persist failed: {}", e);
        }
    }

    /// Validate and stage the file, then hand the byte capture to a
    /// background thread so the form stays responsive.
    pub fn save(&self, path: &Path, mime_type: &str) -> Result<AttachmentRecord, String> {
        let (record, ticket) = self.stage(path, mime_type)?;
        let store = self.clone();
        let path = path.to_path_buf();
        let staged = record.clone();
        thread::spawn(move || store.encode_and_persist(ticket, &path, staged));
        Ok(record)
    }

    /// Persist a bundled-asset attachment (sample-data population). Written
    /// immediately; there are no bytes to capture.
    pub fn attach_bundled(&self, record: AttachmentRecord) -> AttachmentRecord {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match &record.content {
            AttachmentContent::Bundled { asset } => {
                self.install_preview(Some(PreviewHandle::Asset(asset.clone())));
            }
            AttachmentContent::Uploaded { .. } => self.install_preview(None),
        }
        if let Err(e) = self.storage.write_json(ATTACHMENT_KEY, &record) {
            eprintln!("[attachment] persist failed: {}", e);
        }
        record
    }

    /// Fail-soft read of the persisted record.
    pub fn load(&self) -> Option<AttachmentRecord> {
        self.storage.read_json(ATTACHMENT_KEY)
    }

    /// Startup contract: if a record exists, the descriptor is always
    /// returned; a preview reference is reconstructed when the encoded
    /// content (or a bundled asset) allows it, otherwise the attachment is
    /// metadata-only.
    pub fn restore(&self) -> Option<RestoredAttachment> {
        let record = self.load()?;
        let preview = match &record.content {
            AttachmentContent::Uploaded {
                encoded: Some(encoded),
            } => match BASE64.decode(encoded) {
                Ok(bytes) => {
                    let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let preview_path = self.preview_dir.join(format!("preview-{}.pdf", ticket));
                    match fs::write(&preview_path, bytes) {
                        Ok(()) => {
                            self.install_preview(Some(PreviewHandle::TempFile(preview_path)));
                            self.preview_reference()
                        }
                        Err(e) => {
                            eprintln!("[attachment] could not restore preview: {}", e);
                            None
                        }
                    }
                }
                Err(e) => {
                    eprintln!("[attachment] stored content did not decode: {}", e);
                    None
                }
            },
            AttachmentContent::Uploaded { encoded: None } => None,
            AttachmentContent::Bundled { asset } => {
                self.install_preview(Some(PreviewHandle::Asset(asset.clone())));
                self.preview_reference()
            }
        };
        Some(RestoredAttachment {
            preview_available: preview.is_some(),
            preview,
            record,
        })
    }

    /// Remove the persisted record and release the live preview. Runs on
    /// explicit clear, on replacement, and on logout; also invalidates any
    /// in-flight encode.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.storage.remove(ATTACHMENT_KEY) {
            eprintln!("[attachment] clear failed: {}", e);
        }
        self.install_preview(None);
    }

    pub fn preview_reference(&self) -> Option<String> {
        match self.preview.lock() {
            Ok(slot) => slot.as_ref().map(|h| h.reference()),
            Err(e) => {
                eprintln!("[attachment] preview slot poisoned: {}", e);
                None
            }
        }
    }

    fn install_preview(&self, handle: Option<PreviewHandle>) {
        match self.preview.lock() {
            Ok(mut slot) => {
                if let Some(old) = slot.take() {
                    old.release();
                }
                *slot = handle;
            }
            Err(e) => eprintln!("[attachment] preview slot poisoned: {}", e),
        }
    }
}

/// Page-index clamping for the renderer round-trip; pages are 1-based.
pub fn clamp_page(requested: i64, num_pages: u32) -> u32 {
    if num_pages == 0 {
        return 1;
    }
    requested.clamp(1, num_pages as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::sample_attachment;
    use crate::storage::Storage;

    const MAX: u64 = 10 * 1024 * 1024;

    fn store_with_max(max_bytes: u64) -> (tempfile::TempDir, AttachmentStore, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path().join("test.db")).unwrap());
        let store = AttachmentStore::new(
            Arc::clone(&storage),
            dir.path().join("previews"),
            max_bytes,
        )
        .unwrap();
        (dir, store, storage)
    }

    fn write_pdf(dir: &Path, name: &str, body_len: usize) -> PathBuf {
        let path = dir.join(name);
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.resize(body_len.max(bytes.len()), b'a');
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn non_pdf_mime_is_rejected_without_mutation() {
        let (dir, store, _storage) = store_with_max(MAX);
        let path = write_pdf(dir.path(), "invoice.pdf", 100);
        let err = store.save(&path, "image/png").unwrap_err();
        assert_eq!(err, "Please select a valid PDF file");
        assert!(store.load().is_none());
        assert!(store.preview_reference().is_none());
    }

    #[test]
    fn oversized_file_is_rejected_without_mutation() {
        let (dir, store, _storage) = store_with_max(1024);
        let path = write_pdf(dir.path(), "big.pdf", 4096);
        let err = store.save(&path, PDF_MIME).unwrap_err();
        assert!(err.starts_with("File too large"), "got: {}", err);
        assert!(store.load().is_none());
        assert!(store.preview_reference().is_none());
    }

    #[test]
    fn wrong_magic_bytes_are_rejected() {
        let (dir, store, _storage) = store_with_max(MAX);
        let path = dir.path().join("fake.pdf");
        fs::write(&path, b"GIF89a not a pdf").unwrap();
        let err = store.save(&path, PDF_MIME).unwrap_err();
        assert_eq!(err, "Not a valid PDF file.");
    }

    #[test]
    fn rejection_leaves_the_existing_attachment_untouched() {
        let (dir, store, _storage) = store_with_max(MAX);
        let good = write_pdf(dir.path(), "invoice.pdf", 200);
        let (record, ticket) = store.stage(&good, PDF_MIME).unwrap();
        store.encode_and_persist(ticket, &good, record);
        let before = store.load().unwrap();
        let preview_before = store.preview_reference().unwrap();

        let err = store.save(&good, "text/plain").unwrap_err();
        assert_eq!(err, "Please select a valid PDF file");
        assert_eq!(store.load().unwrap(), before);
        assert_eq!(store.preview_reference().unwrap(), preview_before);
    }

    #[test]
    fn staged_then_persisted_record_round_trips() {
        let (dir, store, _storage) = store_with_max(MAX);
        let path = write_pdf(dir.path(), "invoice.pdf", 50_000);
        let (record, ticket) = store.stage(&path, PDF_MIME).unwrap();
        assert_eq!(record.name, "invoice.pdf");
        assert_eq!(record.byte_size, 50_000);
        assert_eq!(record.mime_type, PDF_MIME);
        // Not persisted until the encode lands.
        assert!(store.load().is_none());

        store.encode_and_persist(ticket, &path, record);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.name, "invoice.pdf");
        match loaded.content {
            AttachmentContent::Uploaded { encoded: Some(e) } => {
                assert_eq!(BASE64.decode(e).unwrap().len(), 50_000);
            }
            other => panic!("expected uploaded content, got {:?}", other),
        }
    }

    #[test]
    fn stale_encode_results_are_discarded() {
        let (dir, store, _storage) = store_with_max(MAX);
        let path = write_pdf(dir.path(), "invoice.pdf", 300);
        let (record, ticket) = store.stage(&path, PDF_MIME).unwrap();
        // The user clears the attachment before the encode completes.
        store.clear();
        store.encode_and_persist(ticket, &path, record);
        assert!(store.load().is_none());
    }

    #[test]
    fn restore_rebuilds_a_usable_preview() {
        let (dir, store, storage) = store_with_max(MAX);
        let path = write_pdf(dir.path(), "invoice.pdf", 50_000);
        let (record, ticket) = store.stage(&path, PDF_MIME).unwrap();
        store.encode_and_persist(ticket, &path, record);

        // Fresh store over the same storage, as after an app restart.
        let fresh = AttachmentStore::new(storage, dir.path().join("previews"), MAX).unwrap();
        let restored = fresh.restore().unwrap();
        assert_eq!(restored.record.name, "invoice.pdf");
        assert_eq!(restored.record.byte_size, 50_000);
        assert!(restored.preview_available);
        let preview = restored.preview.unwrap();
        assert_eq!(fs::metadata(&preview).unwrap().len(), 50_000);
    }

    #[test]
    fn restore_without_encoded_content_is_metadata_only() {
        let (_dir, store, storage) = store_with_max(MAX);
        storage
            .set(
                ATTACHMENT_KEY,
                "{\"name\":\"invoice.pdf\",\"byteSize\":50000,\"mimeType\":\"application/pdf\",\
                 \"lastModified\":0,\"content\":{\"kind\":\"uploaded\"}}",
            )
            .unwrap();
        let restored = store.restore().unwrap();
        assert_eq!(restored.record.name, "invoice.pdf");
        assert!(!restored.preview_available);
        assert!(restored.preview.is_none());
    }

    #[test]
    fn restore_of_corrupt_record_yields_nothing() {
        let (_dir, store, storage) = store_with_max(MAX);
        storage.set(ATTACHMENT_KEY, "not a record").unwrap();
        assert!(store.restore().is_none());
    }

    #[test]
    fn bundled_sample_restores_as_an_asset_reference() {
        let (_dir, store, _storage) = store_with_max(MAX);
        store.attach_bundled(sample_attachment());
        let restored = store.restore().unwrap();
        assert!(restored.preview_available);
        assert_eq!(restored.preview.as_deref(), Some("sample-invoice.pdf"));
    }

    #[test]
    fn clear_releases_the_preview_file() {
        let (dir, store, _storage) = store_with_max(MAX);
        let path = write_pdf(dir.path(), "invoice.pdf", 400);
        let (record, ticket) = store.stage(&path, PDF_MIME).unwrap();
        store.encode_and_persist(ticket, &path, record);
        let preview = store.preview_reference().unwrap();
        assert!(Path::new(&preview).exists());

        store.clear();
        assert!(store.load().is_none());
        assert!(store.preview_reference().is_none());
        assert!(!Path::new(&preview).exists());
    }

    #[test]
    fn replacement_releases_the_previous_preview() {
        let (dir, store, _storage) = store_with_max(MAX);
        let first = write_pdf(dir.path(), "first.pdf", 400);
        let (record, ticket) = store.stage(&first, PDF_MIME).unwrap();
        store.encode_and_persist(ticket, &first, record);
        let old_preview = store.preview_reference().unwrap();

        let second = write_pdf(dir.path(), "second.pdf", 500);
        let (record, ticket) = store.stage(&second, PDF_MIME).unwrap();
        store.encode_and_persist(ticket, &second, record);

        assert!(!Path::new(&old_preview).exists());
        assert_eq!(store.load().unwrap().name, "second.pdf");
    }

    #[test]
    fn page_clamping_stays_in_bounds() {
        assert_eq!(clamp_page(0, 5), 1);
        assert_eq!(clamp_page(3, 5), 3);
        assert_eq!(clamp_page(9, 5), 5);
        assert_eq!(clamp_page(-2, 5), 1);
        assert_eq!(clamp_page(1, 0), 1);
    }
}
