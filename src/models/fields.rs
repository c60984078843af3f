//! Invoice form field registry and sample data.

use crate::types::{AttachmentContent, AttachmentRecord, FieldValue, InvoiceDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Identifier,
    Amount,
    Date,
    LongText,
}

pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub max_len: usize,
}

/// The recognized field set is fixed at compile time. Storage keys outside
/// this list are dropped on load.
pub const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec { name: "vendor", label: "Vendor", kind: FieldKind::Text, required: true, max_len: 120 },
    FieldSpec { name: "purchaseOrderNumber", label: "Purchase Order Number", kind: FieldKind::Identifier, required: true, max_len: 64 },
    FieldSpec { name: "invoiceNumber", label: "Invoice Number", kind: FieldKind::Identifier, required: true, max_len: 64 },
    FieldSpec { name: "totalAmount", label: "Total Amount", kind: FieldKind::Amount, required: true, max_len: 20 },
    FieldSpec { name: "invoiceDueDate", label: "Invoice Due Date", kind: FieldKind::Date, required: true, max_len: 10 },
    FieldSpec { name: "invoiceDescription", label: "Invoice Description", kind: FieldKind::LongText, required: true, max_len: 500 },
    FieldSpec { name: "invoiceDate", label: "Invoice Date", kind: FieldKind::Date, required: true, max_len: 10 },
    FieldSpec { name: "paymentTerms", label: "Payment Terms", kind: FieldKind::Text, required: true, max_len: 40 },
    FieldSpec { name: "glPostDate", label: "GL Post Date", kind: FieldKind::Date, required: true, max_len: 10 },
    FieldSpec { name: "lineAmount", label: "Line Amount", kind: FieldKind::Amount, required: true, max_len: 20 },
    FieldSpec { name: "account", label: "Account", kind: FieldKind::Text, required: true, max_len: 80 },
    FieldSpec { name: "description", label: "Description", kind: FieldKind::LongText, required: true, max_len: 500 },
    FieldSpec { name: "department", label: "Department", kind: FieldKind::Text, required: true, max_len: 80 },
    FieldSpec { name: "location", label: "Location", kind: FieldKind::Text, required: true, max_len: 80 },
    FieldSpec { name: "comments", label: "Comments", kind: FieldKind::LongText, required: false, max_len: 2000 },
];

pub fn spec_for(name: &str) -> Option<&'static FieldSpec> {
    FIELD_SPECS.iter().find(|spec| spec.name == name)
}

pub fn is_known_field(name: &str) -> bool {
    spec_for(name).is_some()
}

/// "Populate with Dummy Data" values.
pub fn sample_draft() -> InvoiceDraft {
    let mut draft = InvoiceDraft::default();
    draft.set("vendor", FieldValue::text("A-1 Exterminators"));
    draft.set("purchaseOrderNumber", FieldValue::text("PO-2024-001"));
    draft.set("invoiceNumber", FieldValue::text("INV-2024-001"));
    draft.set("totalAmount", FieldValue::number(1250.0));
    draft.set("invoiceDueDate", FieldValue::text("12/31/2024"));
    draft.set(
        "invoiceDescription",
        FieldValue::text("Monthly pest control services for office building"),
    );
    draft.set("invoiceDate", FieldValue::text("12/01/2024"));
    draft.set("paymentTerms", FieldValue::text("Net 30"));
    draft.set("glPostDate", FieldValue::text("12/15/2024"));
    draft.set("lineAmount", FieldValue::number(1250.0));
    draft.set("account", FieldValue::text("Office Supplies"));
    draft.set("description", FieldValue::text("Professional pest control services"));
    draft.set("department", FieldValue::text("Facilities"));
    draft.set("location", FieldValue::text("Main Office"));
    draft.set(
        "comments",
        FieldValue::text("Regular monthly service - all areas treated"),
    );
    draft
}

pub const SAMPLE_ATTACHMENT_ASSET: &str = "sample-invoice.pdf";

/// The sample attachment points at a bundled asset rather than faking an
/// uploaded file, so restore logic can tell the two apart.
pub fn sample_attachment() -> AttachmentRecord {
    AttachmentRecord {
        name: SAMPLE_ATTACHMENT_ASSET.to_string(),
        byte_size: 48_213,
        mime_type: "application/pdf".to_string(),
        last_modified: 1_704_067_200_000,
        content: AttachmentContent::Bundled {
            asset: SAMPLE_ATTACHMENT_ASSET.to_string(),
        },
    }
}

/// Derive an invoice number from an uploaded file's name: the stem of
/// "INV-2024-001.pdf" is "INV-2024-001". Empty stems yield nothing.
pub fn invoice_number_from_filename(file_name: &str) -> Option<String> {
    let name = file_name.trim();
    let stem = match name.rfind('.') {
        Some(0) => "",
        Some(idx) => &name[..idx],
        None => name,
    };
    let stem = stem.trim();
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
