//! WebAssembly module for the Mart ERP admin app
//!
//! Provides client-side computation for:
//! - Line subtotals and document totals
//! - Status transition checks for document screens
//! - Document number formatting

use std::str::FromStr;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::numbering::*;
pub use shared::status::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value.trim())
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", field, e)))
}

fn family_from_prefix(prefix: &str) -> Result<DocumentFamily, JsValue> {
    DocumentFamily::from_prefix(prefix)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown document prefix: {}", prefix)))
}

/// `quantity × unit_price`, as a decimal string
#[wasm_bindgen]
pub fn line_subtotal(quantity: &str, unit_price: &str) -> Result<String, JsValue> {
    let quantity = parse_decimal("quantity", quantity)?;
    let unit_price = parse_decimal("unit_price", unit_price)?;
    Ok((quantity * unit_price).to_string())
}

/// Totals for a JSON array of lines and an optional tax rate.
///
/// Returns the totals as JSON, amounts as strings.
#[wasm_bindgen]
pub fn document_totals(lines_json: &str, tax_rate: Option<String>) -> Result<String, JsValue> {
    let lines: Vec<LineItem> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;
    let tax_rate = tax_rate
        .as_deref()
        .map(|r| parse_decimal("tax_rate", r))
        .transpose()?;

    validate_lines(&lines)
        .map_err(|(i, m)| JsValue::from_str(&format!("Line {}: {}", i + 1, m)))?;

    let totals = DocumentTotals::compute(&lines, tax_rate);
    serde_json::to_string(&totals).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Whether a document with prefix `prefix` may move from `from` to `to`
#[wasm_bindgen]
pub fn can_change_status(prefix: &str, from: &str, to: &str) -> Result<bool, JsValue> {
    let family = family_from_prefix(prefix)?;
    can_transition(family, from, to).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Status names reachable in one step, for populating a status menu
#[wasm_bindgen]
pub fn next_statuses(prefix: &str, from: &str) -> Result<Vec<JsValue>, JsValue> {
    let family = family_from_prefix(prefix)?;
    let next = allowed_next(family, from).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(next.into_iter().map(JsValue::from_str).collect())
}

/// Format a number for display, e.g. `("PO", 2026, 7)` gives `PO-2026-00007`.
/// The year is ignored for families without a yearly sequence.
#[wasm_bindgen]
pub fn format_document_number(prefix: &str, year: i32, sequence: u32) -> Result<String, JsValue> {
    let family = family_from_prefix(prefix)?;
    DocumentNumber::new(family, family.scope_for_year(year), sequence)
        .map(|n| n.to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_subtotal() {
        assert_eq!(line_subtotal("3", "2.50").unwrap(), "7.50");
    }

    #[test]
    fn test_document_totals() {
        let lines = r#"[
            {"item_id": "6f1c2a1e-8a61-4c1e-9a55-0e7f1d6b1a01", "quantity": "2", "unit_price": "10", "subtotal": "20"},
            {"item_id": "6f1c2a1e-8a61-4c1e-9a55-0e7f1d6b1a02", "quantity": "1", "unit_price": "5", "subtotal": "5"}
        ]"#;
        let json = document_totals(lines, Some("10".to_string())).unwrap();
        let totals: DocumentTotals = serde_json::from_str(&json).unwrap();
        assert_eq!(totals.total_amount, Decimal::from(25));
        assert_eq!(totals.grand_total, Decimal::from_str("27.5").unwrap());
    }

    #[test]
    fn test_status_checks() {
        assert!(can_change_status("PO", "Draft", "Sent").unwrap());
        assert!(!can_change_status("PO", "Completed", "Draft").unwrap());
        assert!(!can_change_status("BILL", "x", "y").unwrap());
    }

    #[test]
    fn test_format_document_number() {
        assert_eq!(format_document_number("GRN", 2026, 7).unwrap(), "GRN-2026-00007");
        assert_eq!(format_document_number("MCH", 2026, 12).unwrap(), "MCH-0012");
    }
}
