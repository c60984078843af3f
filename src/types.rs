use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar form-field value. The webview serializes amounts as numbers and
/// everything else as text, so both shapes must round-trip through storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        FieldValue::Number(value)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    /// Numeric view: numbers directly, text parsed (HTML number inputs may
    /// serialize either way depending on how the value was entered).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }
}

/// One entry per form field, keyed by the field names in
/// `models::fields::FIELD_SPECS`. Absent fields are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    #[serde(flatten)]
    pub fields: HashMap<String, FieldValue>,
}

impl InvoiceDraft {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    /// Text view of a field; numbers and absent fields read as "".
    pub fn text(&self, name: &str) -> &str {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(|v| v.as_number())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }

    /// Drop keys that are not part of the field registry. Unrecognized keys
    /// found in storage are ignored on load and never round-tripped.
    pub fn retain_known(&mut self) {
        self.fields
            .retain(|name, _| crate::models::fields::is_known_field(name));
    }
}

/// Persisted descriptor of the one attachable file, under `invoiceFileInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub name: String,
    pub byte_size: u64,
    pub mime_type: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
    pub content: AttachmentContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AttachmentContent {
    /// User-selected file. `encoded` holds the base64 bytes once the
    /// background encode has completed; until then the record is
    /// display-only and will not survive a reload.
    Uploaded {
        #[serde(skip_serializing_if = "Option::is_none")]
        encoded: Option<String>,
    },
    /// Reference to an asset shipped with the app (sample-data population).
    Bundled { asset: String },
}

/// Startup view of a persisted attachment: the descriptor plus whatever
/// preview reference could be reconstructed from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredAttachment {
    pub record: AttachmentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub preview_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        ValidationResult {
            valid: true,
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ValidationResult {
            valid: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub is_logged_in: bool,
    pub user_name: String,
    pub login_time: String,
    pub remember_me: bool,
}

/// Transient notification shown by the webview after submit/clear actions.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: String,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification {
            kind: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notification {
            kind: "info".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub ok: bool,
    pub field_errors: HashMap<String, String>,
    pub banner_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}
