//! Summary box under the line items: visible-row selection, the derived
//! grand total, and box geometry.

use crate::font::{FontFace, measure_text_width};
use crate::format::{CurrencyFormat, is_present};
use crate::model::{DocumentKind, TotalsInputs};
use crate::page::{BreakReason, PageManager};
use crate::types::{Color, Pt};
use rust_decimal::Decimal;

pub const META_TOTALS_KEY: &str = "ledger.totals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Normal,
    Refund,
    GrandTotal,
}

/// A summary row that is already known to be visible.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub label: &'static str,
    pub value: Decimal,
    pub style: RowStyle,
}

impl RenderedRow {
    fn new(label: &'static str, value: Decimal) -> Self {
        Self {
            label,
            value,
            style: RowStyle::Normal,
        }
    }

    fn styled(mut self, style: RowStyle) -> Self {
        self.style = style;
        self
    }

    pub fn is_grand_total(&self) -> bool {
        self.style == RowStyle::GrandTotal
    }

    pub fn is_negative(&self) -> bool {
        self.style == RowStyle::Refund
    }
}

/// Per-document rules, injected as plain functions.
#[derive(Debug, Clone, Copy)]
pub struct TotalsPolicy {
    pub name: &'static str,
    pub rows: fn(&TotalsInputs) -> Vec<RenderedRow>,
    pub grand_total: fn(&TotalsInputs) -> Decimal,
}

impl TotalsPolicy {
    pub const INVOICE: TotalsPolicy = TotalsPolicy {
        name: "invoice",
        rows: invoice_rows,
        grand_total: invoice_grand_total,
    };

    pub const PURCHASE_ORDER: TotalsPolicy = TotalsPolicy {
        name: "purchase_order",
        rows: purchase_order_rows,
        grand_total: purchase_order_grand_total,
    };

    pub fn for_kind(kind: DocumentKind) -> TotalsPolicy {
        match kind {
            DocumentKind::Invoice => TotalsPolicy::INVOICE,
            DocumentKind::PurchaseOrder => TotalsPolicy::PURCHASE_ORDER,
        }
    }
}

fn invoice_grand_total(t: &TotalsInputs) -> Decimal {
    t.subtotal() - t.discount_amount() + t.vat_amount() + t.delivery_charge() - t.refund_amount()
}

fn invoice_rows(t: &TotalsInputs) -> Vec<RenderedRow> {
    let mut rows = vec![RenderedRow::new("Subtotal", t.subtotal())];
    let has_discount = is_present(t.discount_amount());
    if has_discount {
        rows.push(RenderedRow::new("Discount", -t.discount_amount()));
        rows.push(RenderedRow::new(
            "Subtotal after discount",
            t.subtotal() - t.discount_amount(),
        ));
    }
    if is_present(t.vat_amount()) {
        rows.push(RenderedRow::new("VAT", t.vat_amount()));
    }
    let has_delivery = is_present(t.delivery_charge());
    let has_refund = is_present(t.refund_amount());
    // Only worth showing when something follows, otherwise it equals the grand total.
    if has_delivery || has_refund {
        rows.push(RenderedRow::new(
            "Total",
            t.subtotal() - t.discount_amount() + t.vat_amount(),
        ));
    }
    if has_delivery {
        rows.push(RenderedRow::new("Delivery Charge", t.delivery_charge()));
    }
    if has_refund {
        rows.push(RenderedRow::new("Refund Amount", -t.refund_amount()).styled(RowStyle::Refund));
    }
    rows.push(RenderedRow::new("Grand Total", invoice_grand_total(t)).styled(RowStyle::GrandTotal));
    rows
}

fn purchase_order_vat(t: &TotalsInputs) -> Decimal {
    if t.vat_applicable() {
        t.vat_amount()
    } else {
        Decimal::ZERO
    }
}

fn purchase_order_grand_total(t: &TotalsInputs) -> Decimal {
    t.subtotal() + purchase_order_vat(t)
}

fn purchase_order_rows(t: &TotalsInputs) -> Vec<RenderedRow> {
    // The VAT line always shows on purchase orders, as 0 when VAT is off.
    vec![
        RenderedRow::new("Subtotal", t.subtotal()),
        RenderedRow::new("VAT", purchase_order_vat(t)),
        RenderedRow::new("Grand Total", purchase_order_grand_total(t)).styled(RowStyle::GrandTotal),
    ]
}

#[derive(Debug, Clone)]
pub struct TotalsStyle {
    pub width: Pt,
    pub gap_before: Pt,
    pub top_padding: Pt,
    pub row_spacing: Pt,
    pub bottom_padding: Pt,
    pub label_inset: Pt,
    pub value_inset: Pt,
    pub label_gap: Pt,
    pub font_size: Pt,
    pub grand_font_size: Pt,
    pub min_font_size: Pt,
    pub shrink_step: Pt,
    pub fill: Color,
    pub border: Color,
    pub refund_color: Color,
}

impl Default for TotalsStyle {
    fn default() -> Self {
        Self {
            width: Pt::from_i32(240),
            gap_before: Pt::from_i32(12),
            top_padding: Pt::from_i32(16),
            row_spacing: Pt::from_i32(16),
            bottom_padding: Pt::from_i32(10),
            label_inset: Pt::from_i32(10),
            value_inset: Pt::from_i32(10),
            label_gap: Pt::from_i32(8),
            font_size: Pt::from_i32(9),
            grand_font_size: Pt::from_i32(11),
            min_font_size: Pt::from_i32(6),
            shrink_step: Pt::from_f32(0.5),
            fill: Color::rgb(0.96, 0.96, 0.96),
            border: Color::rgb(0.6, 0.6, 0.6),
            refund_color: Color::rgb(0.75, 0.1, 0.1),
        }
    }
}

/// Largest size from `start` down to `floor` (in `step` decrements) at which
/// `text` fits `available`; the floor is returned even if it still overflows.
pub fn fit_font_size(
    face: FontFace,
    text: &str,
    start: Pt,
    floor: Pt,
    step: Pt,
    available: Pt,
) -> Pt {
    let mut size = start;
    while measure_text_width(face, size, text) > available && size > floor && step > Pt::ZERO {
        size = (size - step).max(floor);
    }
    size
}

pub struct TotalsBlockBuilder {
    policy: TotalsPolicy,
    currency: CurrencyFormat,
    style: TotalsStyle,
}

impl TotalsBlockBuilder {
    pub fn new(policy: TotalsPolicy, currency: CurrencyFormat) -> Self {
        Self {
            policy,
            currency,
            style: TotalsStyle::default(),
        }
    }

    pub fn with_style(mut self, style: TotalsStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &TotalsStyle {
        &self.style
    }

    pub fn build(&self, inputs: &TotalsInputs) -> Vec<RenderedRow> {
        (self.policy.rows)(inputs)
    }

    pub fn grand_total(&self, inputs: &TotalsInputs) -> Decimal {
        (self.policy.grand_total)(inputs)
    }

    pub fn box_height(&self, row_count: usize) -> Pt {
        let gaps = row_count.saturating_sub(1) as i32;
        self.style.top_padding + self.style.row_spacing * gaps + self.style.bottom_padding
    }

    /// Draws the rows as one unsplittable box, breaking the page first when
    /// the box does not fit below the cursor.
    pub fn draw(&self, pages: &mut PageManager, rows: &[RenderedRow]) {
        let style = &self.style;
        let height = self.box_height(rows.len());
        pages.ensure_room(style.gap_before + height, BreakReason::TotalsOverflow);

        let geometry = pages.geometry().clone();
        let width = style.width.min(geometry.content_width());
        let x = geometry.content_right() - width;
        let y = geometry.cursor() + style.gap_before;
        let canvas = pages.canvas();
        canvas.meta(META_TOTALS_KEY, rows.len().to_string());
        canvas.set_fill_color(style.fill);
        canvas.draw_rect(x, y, width, height);
        canvas.set_stroke_color(style.border);
        canvas.set_line_width(Pt::from_f32(0.75));
        canvas.stroke_rect(x, y, width, height);

        for (idx, row) in rows.iter().enumerate() {
            let baseline = y + style.top_padding + style.row_spacing * idx as i32;
            let (face, size, color) = match row.style {
                RowStyle::Normal => (FontFace::Regular, style.font_size, Color::BLACK),
                RowStyle::Refund => (FontFace::Bold, style.font_size, style.refund_color),
                RowStyle::GrandTotal => (FontFace::Bold, style.grand_font_size, Color::BLACK),
            };
            if row.is_grand_total() && idx > 0 {
                let rule_y = baseline - style.row_spacing + Pt::from_i32(4);
                canvas.line(x + style.label_inset, rule_y, x + width - style.value_inset, rule_y);
            }
            canvas.set_fill_color(color);
            canvas.set_font(face, size);
            let label_x = x + style.label_inset;
            canvas.draw_string(label_x, baseline - size, row.label);

            let value = self.currency.format(row.value);
            let value_right = x + width - style.value_inset;
            let label_end = label_x + measure_text_width(face, size, row.label) + style.label_gap;
            let available = (value_right - label_end).max(Pt::ZERO);
            let value_size = fit_font_size(
                face,
                &value,
                size,
                style.min_font_size,
                style.shrink_step,
                available,
            );
            canvas.set_font(face, value_size);
            let value_x = value_right - measure_text_width(face, value_size, &value);
            canvas.draw_string(value_x, baseline - value_size, value);
        }
        canvas.set_fill_color(Color::BLACK);
        pages.advance(style.gap_before + height);
    }
}
