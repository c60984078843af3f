//! Declarative validation for the invoice form: per-field schema rules plus
//! the two business rules that only run at submission time.

use crate::models::fields::{spec_for, FieldKind, FieldSpec, FIELD_SPECS};
use crate::types::{FieldValue, InvoiceDraft, ValidationResult};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

const DATE_FORMAT: &str = "%m/%d/%Y";

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid date pattern"))
}

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9/_-]*$").expect("valid identifier pattern"))
}

/// MM/DD/YYYY text to a calendar date. Pattern-valid but impossible dates
/// (13/45/2024) fail here.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !date_pattern().is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

pub fn validate_field(name: &str, value: &FieldValue) -> ValidationResult {
    match spec_for(name) {
        Some(spec) => validate_against(spec, value),
        None => ValidationResult::fail(format!("Unknown field: {}", name)),
    }
}

fn validate_against(spec: &FieldSpec, value: &FieldValue) -> ValidationResult {
    if value.is_empty() {
        if spec.required {
            return ValidationResult::fail(format!("{} is required", spec.label));
        }
        return ValidationResult::ok();
    }
    match spec.kind {
        FieldKind::Amount => {
            let Some(amount) = value.as_number() else {
                return ValidationResult::fail(format!("{} must be a number", spec.label));
            };
            if amount < 0.0 {
                return ValidationResult::fail("Amount must be positive");
            }
        }
        FieldKind::Date => {
            let text = value.as_text().unwrap_or_default();
            if parse_date(text).is_none() {
                return ValidationResult::fail(format!(
                    "{} must be a valid MM/DD/YYYY date",
                    spec.label
                ));
            }
        }
        FieldKind::Identifier => {
            let text = value.as_text().unwrap_or_default().trim();
            if !identifier_pattern().is_match(text) {
                return ValidationResult::fail(format!("{} has invalid characters", spec.label));
            }
        }
        FieldKind::Text | FieldKind::LongText => {}
    }
    if let Some(text) = value.as_text() {
        if text.trim().chars().count() > spec.max_len {
            return ValidationResult::fail(format!(
                "{} must be at most {} characters",
                spec.label, spec.max_len
            ));
        }
    }
    ValidationResult::ok()
}

/// Evaluate every registered field. Fields absent from the draft are
/// validated as empty.
pub fn validate_all(draft: &InvoiceDraft) -> HashMap<String, ValidationResult> {
    let mut results = HashMap::new();
    for spec in FIELD_SPECS {
        let empty = FieldValue::text("");
        let value = draft.get(spec.name).unwrap_or(&empty);
        results.insert(spec.name.to_string(), validate_against(spec, value));
    }
    results
}

pub fn all_valid(results: &HashMap<String, ValidationResult>) -> bool {
    results.values().all(|r| r.valid)
}

/// Submission-level business rule failure, surfaced as a banner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleViolation {
    pub rule: &'static str,
    pub message: String,
}

/// The two cross-field rules. These run on every submit attempt, independent
/// of per-field state; unparsable operands are left to the schema layer.
pub fn check_business_rules(draft: &InvoiceDraft) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    if let (Some(line), Some(total)) = (draft.number("lineAmount"), draft.number("totalAmount")) {
        if line > total {
            violations.push(RuleViolation {
                rule: "lineAmountWithinTotal",
                message: "Line Amount cannot exceed Total Amount".to_string(),
            });
        }
    }

    if let Some(invoice_date) = parse_date(draft.text("invoiceDate")) {
        if let Some(due_date) = parse_date(draft.text("invoiceDueDate")) {
            if due_date < invoice_date {
                violations.push(RuleViolation {
                    rule: "dueDateNotBeforeInvoiceDate",
                    message: "Invoice Due Date cannot be before Invoice Date".to_string(),
                });
            }
        }
        if let Some(gl_post_date) = parse_date(draft.text("glPostDate")) {
            if gl_post_date < invoice_date {
                violations.push(RuleViolation {
                    rule: "glPostDateNotBeforeInvoiceDate",
                    message: "GL Post Date cannot be before Invoice Date".to_string(),
                });
            }
        }
    }

    violations
}

pub struct SubmissionReview {
    pub field_errors: HashMap<String, String>,
    pub violations: Vec<RuleViolation>,
}

impl SubmissionReview {
    pub fn passed(&self) -> bool {
        self.field_errors.is_empty() && self.violations.is_empty()
    }
}

pub fn evaluate_submission(draft: &InvoiceDraft) -> SubmissionReview {
    let field_errors = validate_all(draft)
        .into_iter()
        .filter_map(|(name, result)| result.error.map(|error| (name, error)))
        .collect();
    SubmissionReview {
        field_errors,
        violations: check_business_rules(draft),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::sample_draft;

    #[test]
    fn required_fields_report_their_label() {
        let result = validate_field("vendor", &FieldValue::text(""));
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Vendor is required"));

        let result = validate_field("purchaseOrderNumber", &FieldValue::text("  "));
        assert_eq!(
            result.error.as_deref(),
            Some("Purchase Order Number is required")
        );
    }

    #[test]
    fn comments_are_optional() {
        let result = validate_field("comments", &FieldValue::text(""));
        assert!(result.valid);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let result = validate_field("totalAmount", &FieldValue::number(-5.0));
        assert_eq!(result.error.as_deref(), Some("Amount must be positive"));
        assert!(validate_field("totalAmount", &FieldValue::number(0.0)).valid);
        // Amounts typed as text still validate numerically.
        assert!(validate_field("lineAmount", &FieldValue::text("1250.00")).valid);
        let result = validate_field("lineAmount", &FieldValue::text("abc"));
        assert_eq!(result.error.as_deref(), Some("Line Amount must be a number"));
    }

    #[test]
    fn dates_must_be_real_calendar_dates() {
        assert!(validate_field("invoiceDate", &FieldValue::text("12/01/2024")).valid);
        assert!(!validate_field("invoiceDate", &FieldValue::text("2024-12-01")).valid);
        assert!(!validate_field("invoiceDate", &FieldValue::text("13/45/2024")).valid);
        assert!(!validate_field("invoiceDate", &FieldValue::text("1/1/2024")).valid);
    }

    #[test]
    fn identifiers_reject_stray_characters() {
        assert!(validate_field("invoiceNumber", &FieldValue::text("INV-2024-001")).valid);
        assert!(!validate_field("invoiceNumber", &FieldValue::text("INV 001!")).valid);
    }

    #[test]
    fn overlong_values_are_rejected() {
        let long = "x".repeat(2001);
        let result = validate_field("comments", &FieldValue::text(long));
        assert_eq!(
            result.error.as_deref(),
            Some("Comments must be at most 2000 characters")
        );
    }

    #[test]
    fn sample_draft_passes_the_gate() {
        let draft = sample_draft();
        let results = validate_all(&draft);
        assert!(all_valid(&results), "unexpected errors: {:?}", {
            results
                .iter()
                .filter(|(_, r)| !r.valid)
                .map(|(name, r)| format!("{}: {:?}", name, r.error))
                .collect::<Vec<_>>()
        });
        assert!(check_business_rules(&draft).is_empty());
    }

    #[test]
    fn empty_draft_fails_every_required_field() {
        let results = validate_all(&InvoiceDraft::default());
        let invalid = results.values().filter(|r| !r.valid).count();
        assert_eq!(invalid, 14);
    }

    #[test]
    fn line_amount_cannot_exceed_total() {
        let mut draft = sample_draft();
        draft.set("totalAmount", FieldValue::number(100.0));
        draft.set("lineAmount", FieldValue::number(150.0));
        let violations = check_business_rules(&draft);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, "lineAmountWithinTotal");
        assert_eq!(violations[0].message, "Line Amount cannot exceed Total Amount");
    }

    #[test]
    fn due_date_before_invoice_date_is_a_violation() {
        let mut draft = sample_draft();
        draft.set("invoiceDate", FieldValue::text("12/01/2024"));
        draft.set("invoiceDueDate", FieldValue::text("11/01/2024"));
        let violations = check_business_rules(&draft);
        assert!(violations
            .iter()
            .any(|v| v.rule == "dueDateNotBeforeInvoiceDate"));
    }

    #[test]
    fn gl_post_date_before_invoice_date_is_a_violation() {
        let mut draft = sample_draft();
        draft.set("glPostDate", FieldValue::text("11/30/2024"));
        let violations = check_business_rules(&draft);
        assert!(violations
            .iter()
            .any(|v| v.rule == "glPostDateNotBeforeInvoiceDate"));
    }

    #[test]
    fn same_day_dates_are_allowed() {
        let mut draft = sample_draft();
        draft.set("invoiceDueDate", FieldValue::text("12/01/2024"));
        draft.set("glPostDate", FieldValue::text("12/01/2024"));
        assert!(check_business_rules(&draft).is_empty());
    }

    #[test]
    fn business_rules_are_date_comparisons_not_string_comparisons() {
        let mut draft = sample_draft();
        // "02/01/2025" sorts before "12/01/2024" as a string but is later in time.
        draft.set("invoiceDate", FieldValue::text("12/01/2024"));
        draft.set("invoiceDueDate", FieldValue::text("02/01/2025"));
        draft.set("glPostDate", FieldValue::text("02/01/2025"));
        assert!(check_business_rules(&draft).is_empty());
    }

    #[test]
    fn submission_review_collects_both_layers() {
        let mut draft = sample_draft();
        draft.set("vendor", FieldValue::text(""));
        draft.set("totalAmount", FieldValue::number(100.0));
        draft.set("lineAmount", FieldValue::number(150.0));
        let review = evaluate_submission(&draft);
        assert!(!review.passed());
        assert_eq!(review.field_errors.get("vendor").map(String::as_str), Some("Vendor is required"));
        assert_eq!(review.violations.len(), 1);
    }
}
