//! Document model handed to the renderer by the business layer.
//!
//! Every field is optional or defaulted: a model assembled from incomplete
//! API data still renders, with "N/A" in place of missing identifiers.

use crate::format::lenient_decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

pub fn display_or_na(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => NOT_AVAILABLE,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Invoice,
    PurchaseOrder,
}

impl DocumentKind {
    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INVOICE",
            DocumentKind::PurchaseOrder => "PURCHASE ORDER",
        }
    }

    pub fn counterpart_caption(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "Bill To",
            DocumentKind::PurchaseOrder => "Supplier",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

/// The issuing company, printed in every page header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub address_lines: Vec<String>,
    pub contact: Option<String>,
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub code: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_decimal")]
    pub quantity: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub unit_price: Decimal,
    /// Stored rather than recomputed: a server-computed total wins.
    #[serde(deserialize_with = "lenient_decimal")]
    pub line_total: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            code: None,
            description: Some(description.into()),
            quantity,
            unit_price,
            line_total: quantity * unit_price,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn display_description(&self) -> String {
        let code = self.code.as_deref().map(str::trim).unwrap_or("");
        let description = self.description.as_deref().map(str::trim).unwrap_or("");
        match (code.is_empty(), description.is_empty()) {
            (true, true) => NOT_AVAILABLE.to_string(),
            (true, false) => description.to_string(),
            (false, true) => code.to_string(),
            (false, false) => format!("{code} - {description}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
struct RawTotals {
    #[serde(deserialize_with = "lenient_decimal")]
    subtotal: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    discount_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    vat_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    delivery_charge: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    refund_amount: Decimal,
    vat_applicable: bool,
}

impl Default for RawTotals {
    fn default() -> Self {
        TotalsInputs::default().into()
    }
}

/// Monetary inputs for the totals block. Values are clamped to be
/// non-negative; the grand total is always derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTotals", into = "RawTotals")]
pub struct TotalsInputs {
    subtotal: Decimal,
    discount_amount: Decimal,
    vat_amount: Decimal,
    delivery_charge: Decimal,
    refund_amount: Decimal,
    vat_applicable: bool,
}

fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

impl TotalsInputs {
    pub fn new(subtotal: Decimal) -> Self {
        Self {
            subtotal: non_negative(subtotal),
            discount_amount: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            delivery_charge: Decimal::ZERO,
            refund_amount: Decimal::ZERO,
            vat_applicable: true,
        }
    }

    pub fn with_discount(mut self, amount: Decimal) -> Self {
        self.discount_amount = non_negative(amount);
        self
    }

    pub fn with_vat(mut self, amount: Decimal) -> Self {
        self.vat_amount = non_negative(amount);
        self
    }

    pub fn with_delivery(mut self, amount: Decimal) -> Self {
        self.delivery_charge = non_negative(amount);
        self
    }

    pub fn with_refund(mut self, amount: Decimal) -> Self {
        self.refund_amount = non_negative(amount);
        self
    }

    pub fn with_vat_applicable(mut self, applicable: bool) -> Self {
        self.vat_applicable = applicable;
        self
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    pub fn vat_amount(&self) -> Decimal {
        self.vat_amount
    }

    pub fn delivery_charge(&self) -> Decimal {
        self.delivery_charge
    }

    pub fn refund_amount(&self) -> Decimal {
        self.refund_amount
    }

    pub fn vat_applicable(&self) -> bool {
        self.vat_applicable
    }
}

impl Default for TotalsInputs {
    fn default() -> Self {
        TotalsInputs::new(Decimal::ZERO)
    }
}

impl From<RawTotals> for TotalsInputs {
    fn from(raw: RawTotals) -> Self {
        TotalsInputs::new(raw.subtotal)
            .with_discount(raw.discount_amount)
            .with_vat(raw.vat_amount)
            .with_delivery(raw.delivery_charge)
            .with_refund(raw.refund_amount)
            .with_vat_applicable(raw.vat_applicable)
    }
}

impl From<TotalsInputs> for RawTotals {
    fn from(totals: TotalsInputs) -> Self {
        RawTotals {
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            vat_amount: totals.vat_amount,
            delivery_charge: totals.delivery_charge,
            refund_amount: totals.refund_amount,
            vat_applicable: totals.vat_applicable,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundLine {
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_decimal")]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundDetail {
    pub note: Option<String>,
    pub items: Vec<RefundLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentModel {
    pub kind: DocumentKind,
    pub document_number: Option<String>,
    pub counterpart: Party,
    pub issue_date: Option<String>,
    pub items: Vec<LineItem>,
    pub totals: TotalsInputs,
    pub refund: Option<RefundDetail>,
    pub note: Option<String>,
}

impl DocumentModel {
    pub fn from_json(raw: &str) -> Result<Self, crate::RenderError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn display_number(&self) -> &str {
        display_or_na(self.document_number.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).expect("decimal literal")
    }

    #[test]
    fn totals_are_clamped_to_non_negative() {
        let totals = TotalsInputs::new(dec("-5"))
            .with_discount(dec("-1"))
            .with_refund(dec("2.5"));
        assert_eq!(totals.subtotal(), Decimal::ZERO);
        assert_eq!(totals.discount_amount(), Decimal::ZERO);
        assert_eq!(totals.refund_amount(), dec("2.5"));
    }

    #[test]
    fn model_deserializes_sparse_api_payloads() {
        let model = DocumentModel::from_json(
            r#"{
                "kind": "purchase_order",
                "document_number": "PO/2024/17",
                "counterpart": {"name": "Gulf Supplies LLC"},
                "items": [
                    {"description": "Cable ties", "quantity": "4", "unit_price": "OMR 1.250", "line_total": 5},
                    {"description": "Site visit"}
                ],
                "totals": {"subtotal": "5.000", "vat_amount": -3, "vat_applicable": false}
            }"#,
        )
        .expect("model");
        assert_eq!(model.kind, DocumentKind::PurchaseOrder);
        assert_eq!(model.items.len(), 2);
        assert_eq!(model.items[0].unit_price, dec("1.250"));
        assert_eq!(model.items[1].quantity, Decimal::ZERO);
        assert_eq!(model.totals.subtotal(), dec("5"));
        assert_eq!(model.totals.vat_amount(), Decimal::ZERO);
        assert!(!model.totals.vat_applicable());
        assert!(model.refund.is_none());
        assert_eq!(model.counterpart.address, None);
    }

    #[test]
    fn missing_identifiers_display_as_na() {
        let model = DocumentModel::default();
        assert_eq!(model.display_number(), NOT_AVAILABLE);
        assert_eq!(display_or_na(Some("  ")), NOT_AVAILABLE);
        assert_eq!(LineItem::default().display_description(), NOT_AVAILABLE);
        let item = LineItem::new("Copper wire", dec("2"), dec("3.5")).with_code("CW-10");
        assert_eq!(item.display_description(), "CW-10 - Copper wire");
        assert_eq!(item.line_total, dec("7.0"));
    }

    #[test]
    fn malformed_json_is_a_model_error() {
        let err = DocumentModel::from_json("{not json").expect_err("should fail");
        assert!(matches!(err, crate::RenderError::Model(_)));
    }
}
