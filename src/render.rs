use crate::asset::{AssetNormalizer, AssetUnavailable, DEFAULT_ASSET_TIMEOUT, LogoAsset};
use crate::canvas::{Canvas, Document};
use crate::debug::DebugLogger;
use crate::doc_context::DocContext;
use crate::error::RenderError;
use crate::font::{FontFace, fit_text, measure_text_width, wrap_text};
use crate::format::{CurrencyFormat, MAX_DECIMAL_PLACES, format_quantity};
use crate::metrics::DocumentMetrics;
use crate::model::{CompanyProfile, DocumentModel, RefundDetail, display_or_na};
use crate::notice::NoticeBlock;
use crate::output::{DEFAULT_PREVIEW_TTL, OutputFinalizer, OutputMode, PreviewStore, RenderOutput};
use crate::page::{BreakReason, PageManager};
use crate::page_template::PageTemplate;
use crate::pdf::{ImageResource, ImageResources, PdfInfo, document_to_pdf};
use crate::table::{TableLayout, TableRenderer};
use crate::totals::{TotalsBlockBuilder, TotalsPolicy};
use crate::types::{Color, Margins, Pt, Size};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const LOGO_RESOURCE_ID: &str = "logo";
pub const LOGO_PLACEHOLDER_TEXT: &str = "YOUR LOGO HERE";
pub const DEFAULT_FOOTER_TEXT: &str = "Page {page} of {pages}";

const DEFAULT_HEADER_RESERVE: f32 = 96.0;
const DEFAULT_FOOTER_RESERVE: f32 = 28.0;
const LOGO_BOX_WIDTH: i32 = 120;
const LOGO_BOX_HEIGHT: i32 = 60;
/// The logo box plus the rule gap above the body.
const MIN_HEADER_RESERVE: f32 = (LOGO_BOX_HEIGHT + 10) as f32;
/// The footer rule plus one line of footer text.
const MIN_FOOTER_RESERVE: f32 = 24.0;
const TITLE_COLUMN_WIDTH: i32 = 160;
const INFO_LINE_HEIGHT: i32 = 12;
const SECTION_GAP: i32 = 14;
const BODY_FONT_SIZE: i32 = 9;
const HEADING_FONT_SIZE: i32 = 11;
const HEADING_HEIGHT: i32 = 18;
const RULE_GREY: f32 = 0.7;

/// Per-render inputs that are not part of the document itself.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub currency: CurrencyFormat,
    /// Overrides `TotalsInputs::vat_applicable` when set.
    pub vat_applicable: Option<bool>,
    /// Logo source: `http(s)://` URL, `data:` URI or file path.
    pub logo: Option<String>,
    pub output: OutputMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            currency: CurrencyFormat::default(),
            vat_applicable: None,
            logo: None,
            output: OutputMode::Preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoStatus {
    Embedded { flattened: bool },
    Placeholder(AssetUnavailable),
}

/// A laid-out document before PDF serialization.
#[derive(Debug, Clone)]
pub struct LaidOutDocument {
    pub document: Document,
    pub metrics: DocumentMetrics,
    pub images: ImageResources,
    pub logo: LogoStatus,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub output: RenderOutput,
    pub metrics: DocumentMetrics,
    pub logo: LogoStatus,
}

pub struct DocumentRendererBuilder {
    page_size: Size,
    margins: Margins,
    header_reserve: f32,
    footer_reserve: f32,
    company: CompanyProfile,
    notice_lines: Vec<String>,
    footer_text: String,
    asset_timeout: Duration,
    preview_ttl: Duration,
    debug_path: Option<PathBuf>,
}

impl Default for DocumentRendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRendererBuilder {
    pub fn new() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all(36.0),
            header_reserve: DEFAULT_HEADER_RESERVE,
            footer_reserve: DEFAULT_FOOTER_RESERVE,
            company: CompanyProfile::default(),
            notice_lines: Vec::new(),
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            preview_ttl: DEFAULT_PREVIEW_TTL,
            debug_path: None,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn header_reserve(mut self, value: f32) -> Self {
        self.header_reserve = value;
        self
    }

    pub fn footer_reserve(mut self, value: f32) -> Self {
        self.footer_reserve = value;
        self
    }

    pub fn company(mut self, company: CompanyProfile) -> Self {
        self.company = company;
        self
    }

    pub fn notice_lines(mut self, lines: Vec<String>) -> Self {
        self.notice_lines = lines;
        self
    }

    /// Footer template; `{page}` and `{pages}` are filled in after layout.
    pub fn footer_text(mut self, text: impl Into<String>) -> Self {
        self.footer_text = text.into();
        self
    }

    pub fn asset_timeout(mut self, timeout: Duration) -> Self {
        self.asset_timeout = timeout;
        self
    }

    pub fn preview_ttl(mut self, ttl: Duration) -> Self {
        self.preview_ttl = ttl;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<DocumentRenderer, RenderError> {
        let margins = [
            self.margins.top,
            self.margins.right,
            self.margins.bottom,
            self.margins.left,
        ];
        if margins.iter().any(|m| *m < Pt::ZERO) {
            return Err(RenderError::InvalidConfiguration(
                "margins must be non-negative".to_string(),
            ));
        }
        if !self.header_reserve.is_finite()
            || !self.footer_reserve.is_finite()
            || self.header_reserve < 0.0
            || self.footer_reserve < 0.0
        {
            return Err(RenderError::InvalidConfiguration(
                "header/footer reserves must be finite and non-negative".to_string(),
            ));
        }
        if self.header_reserve < MIN_HEADER_RESERVE || self.footer_reserve < MIN_FOOTER_RESERVE {
            return Err(RenderError::InvalidConfiguration(format!(
                "header reserve must be at least {MIN_HEADER_RESERVE}pt and footer reserve at \
                 least {MIN_FOOTER_RESERVE}pt, got {} and {}",
                self.header_reserve, self.footer_reserve
            )));
        }
        let template = PageTemplate::new("document", self.page_size)
            .with_margins(self.margins)
            .with_reserves(
                Pt::from_f32(self.header_reserve),
                Pt::from_f32(self.footer_reserve),
            );
        let geometry = template.geometry();
        let table = TableLayout::line_items();
        let minimum = table.style.header_height + table.style.row_height;
        if geometry.content_width() <= Pt::ZERO || geometry.content_height() < minimum {
            return Err(RenderError::InvalidConfiguration(format!(
                "content area {}x{}pt is too small for a table header and one row",
                geometry.content_width().to_f32(),
                geometry.content_height().to_f32()
            )));
        }
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        Ok(DocumentRenderer {
            page_size: self.page_size,
            margins: self.margins,
            header_reserve: Pt::from_f32(self.header_reserve),
            footer_reserve: Pt::from_f32(self.footer_reserve),
            company: Arc::new(self.company),
            notice_lines: self.notice_lines,
            footer_text: Arc::new(self.footer_text),
            assets: AssetNormalizer::new(self.asset_timeout),
            previews: PreviewStore::new(self.preview_ttl),
            debug,
        })
    }
}

/// Lays out invoices and purchase orders and hands the PDF to the
/// configured output. Each render builds its own page state.
pub struct DocumentRenderer {
    page_size: Size,
    margins: Margins,
    header_reserve: Pt,
    footer_reserve: Pt,
    company: Arc<CompanyProfile>,
    notice_lines: Vec<String>,
    footer_text: Arc<String>,
    assets: AssetNormalizer,
    previews: PreviewStore,
    debug: Option<Arc<DebugLogger>>,
}

/// Everything the page header needs, shared with the header painter.
struct HeaderContent {
    company: Arc<CompanyProfile>,
    title: &'static str,
    number: String,
    logo_size: Option<(Pt, Pt)>,
}

impl DocumentRenderer {
    pub fn builder() -> DocumentRendererBuilder {
        DocumentRendererBuilder::new()
    }

    pub fn preview_store(&self) -> &PreviewStore {
        &self.previews
    }

    fn debug_event(&self, kind: &str, label: &str, detail: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.event(kind, label, detail);
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }

    fn validate_options(options: &RenderOptions) -> Result<(), RenderError> {
        if options.currency.decimals > MAX_DECIMAL_PLACES {
            return Err(RenderError::InvalidConfiguration(format!(
                "decimal places must be within 0..={}, got {}",
                MAX_DECIMAL_PLACES, options.currency.decimals
            )));
        }
        Ok(())
    }

    /// Runs the full layout: logo, header, parties, line items, totals,
    /// refund, notes and notice, then the final footer.
    pub fn layout(
        &self,
        model: &DocumentModel,
        options: &RenderOptions,
    ) -> Result<LaidOutDocument, RenderError> {
        Self::validate_options(options)?;
        let label = model.display_number().to_string();
        if let Some(logger) = self.debug.as_deref() {
            logger.log_json(&serde_json::json!({
                "type": "render.start",
                "document": label,
                "kind": model.kind.title(),
                "items": model.items.len(),
            }));
        }

        let logo = self.assets.normalize(options.logo.as_deref());
        let mut images = ImageResources::new();
        let (status, logo_size) = match &logo {
            LogoAsset::Ready(normalized) => {
                if normalized.flattened {
                    self.debug_event("asset.flattened", &label, "alpha composited onto white");
                }
                images.insert(
                    LOGO_RESOURCE_ID.to_string(),
                    ImageResource {
                        width: normalized.width,
                        height: normalized.height,
                        jpeg: normalized.jpeg.clone(),
                    },
                );
                let size = normalized
                    .fit_within(Pt::from_i32(LOGO_BOX_WIDTH), Pt::from_i32(LOGO_BOX_HEIGHT));
                (
                    LogoStatus::Embedded {
                        flattened: normalized.flattened,
                    },
                    Some(size),
                )
            }
            LogoAsset::Unavailable(reason) => {
                if *reason != AssetUnavailable::NoSource {
                    self.debug_event("asset.fallback", &label, &reason.to_string());
                }
                (LogoStatus::Placeholder(reason.clone()), None)
            }
        };

        let header = Arc::new(HeaderContent {
            company: Arc::clone(&self.company),
            title: model.kind.title(),
            number: label.clone(),
            logo_size,
        });
        let footer_text = Arc::clone(&self.footer_text);
        let footer_number = label.clone();
        let template = PageTemplate::new(model.kind.title(), self.page_size)
            .with_margins(self.margins)
            .with_reserves(self.header_reserve, self.footer_reserve)
            .set_on_header(move |canvas, ctx| paint_header(canvas, ctx, &header))
            .set_on_footer(move |canvas, ctx| {
                paint_footer(canvas, ctx, &footer_text, &footer_number)
            });

        let started = Instant::now();
        let mut pages = PageManager::start(template);
        if let Some(logger) = &self.debug {
            pages = pages.with_debug(Arc::clone(logger), label.clone());
        }

        draw_parties(&mut pages, model);

        let item_rows: Vec<Vec<String>> = model
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                vec![
                    (idx + 1).to_string(),
                    item.display_description(),
                    format_quantity(item.quantity),
                    options.currency.format(item.unit_price),
                    options.currency.format(item.line_total),
                ]
            })
            .collect();
        TableRenderer::new(&TableLayout::line_items()).render(&mut pages, &item_rows);

        let mut totals = model.totals.clone();
        if let Some(applicable) = options.vat_applicable {
            totals = totals.with_vat_applicable(applicable);
        }
        let builder =
            TotalsBlockBuilder::new(TotalsPolicy::for_kind(model.kind), options.currency.clone());
        let rows = builder.build(&totals);
        builder.draw(&mut pages, &rows);

        if let Some(refund) = &model.refund {
            draw_refund(&mut pages, refund);
        }
        if let Some(note) = model.note.as_deref().filter(|n| !n.trim().is_empty()) {
            draw_notes(&mut pages, note);
        }
        NoticeBlock::new(self.notice_lines.clone()).draw(&mut pages);

        let (document, mut metrics) = pages.finish();
        metrics.total_render_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(LaidOutDocument {
            document,
            metrics,
            images,
            logo: status,
        })
    }

    pub fn render_to_buffer(
        &self,
        model: &DocumentModel,
        options: &RenderOptions,
    ) -> Result<(Vec<u8>, LaidOutDocument), RenderError> {
        let mut laid_out = self.layout(model, options)?;
        let info = PdfInfo {
            title: Some(format!("{} {}", model.kind.title(), model.display_number())),
        };
        let bytes = document_to_pdf(&laid_out.document, &laid_out.images, &info);
        laid_out.metrics.total_bytes = bytes.len();
        Ok((bytes, laid_out))
    }

    /// Renders and finalizes: a preview handle or a persisted file.
    pub fn render(
        &self,
        model: &DocumentModel,
        options: &RenderOptions,
    ) -> Result<RenderedDocument, RenderError> {
        let (bytes, laid_out) = self.render_to_buffer(model, options)?;
        let label = model.display_number();
        let finalizer = OutputFinalizer::new(self.previews.clone());
        let output = finalizer.finalize(bytes, &options.output, label)?;
        match &output {
            RenderOutput::Preview(handle) => self.debug_event("output.preview", label, &handle.url),
            RenderOutput::Persisted { path, .. } => {
                self.debug_event("output.persist", label, &path.display().to_string())
            }
        }
        self.emit_debug_summary("render");
        Ok(RenderedDocument {
            output,
            metrics: laid_out.metrics,
            logo: laid_out.logo,
        })
    }
}

fn paint_header(canvas: &mut Canvas, ctx: &DocContext, header: &HeaderContent) {
    let geometry = ctx.geometry;
    let left = geometry.content_left();
    let right = geometry.content_right();
    let top = geometry.header_top();
    let box_w = Pt::from_i32(LOGO_BOX_WIDTH);
    let box_h = Pt::from_i32(LOGO_BOX_HEIGHT);

    match header.logo_size {
        Some((width, height)) => canvas.draw_image(left, top, width, height, LOGO_RESOURCE_ID),
        None => {
            canvas.set_stroke_color(Color::rgb(RULE_GREY, RULE_GREY, RULE_GREY));
            canvas.set_line_width(Pt::from_i32(1));
            canvas.stroke_rect(left, top, box_w, box_h);
            let size = Pt::from_i32(8);
            canvas.set_fill_color(Color::rgb(0.5, 0.5, 0.5));
            canvas.set_font(FontFace::Bold, size);
            let text_w = measure_text_width(FontFace::Bold, size, LOGO_PLACEHOLDER_TEXT);
            canvas.draw_string(
                left + (box_w - text_w) / 2,
                top + (box_h - size) / 2,
                LOGO_PLACEHOLDER_TEXT,
            );
        }
    }

    let company = &header.company;
    let x = left + box_w + Pt::from_i32(12);
    let company_width = (right - x - Pt::from_i32(TITLE_COLUMN_WIDTH)).max(Pt::ZERO);
    let limit = geometry.content_top() - Pt::from_i32(10);
    let mut y = top;
    canvas.set_fill_color(Color::BLACK);
    if !company.name.trim().is_empty() {
        let size = Pt::from_i32(HEADING_FONT_SIZE);
        canvas.set_font(FontFace::Bold, size);
        canvas.draw_string(x, y, fit_text(FontFace::Bold, size, &company.name, company_width));
        y += Pt::from_i32(14);
    }
    let mut details: Vec<String> = company.address_lines.clone();
    if let Some(contact) = company.contact.as_deref().filter(|c| !c.trim().is_empty()) {
        details.push(contact.to_string());
    }
    if let Some(tax_id) = company.tax_id.as_deref().filter(|t| !t.trim().is_empty()) {
        details.push(format!("Tax ID: {tax_id}"));
    }
    let detail_size = Pt::from_i32(8);
    canvas.set_font(FontFace::Regular, detail_size);
    for line in details {
        if y + detail_size > limit {
            break;
        }
        canvas.draw_string(x, y, fit_text(FontFace::Regular, detail_size, &line, company_width));
        y += Pt::from_i32(10);
    }

    let title_size = Pt::from_i32(16);
    canvas.set_font(FontFace::Bold, title_size);
    let title_w = measure_text_width(FontFace::Bold, title_size, header.title);
    canvas.draw_string(right - title_w, top, header.title);
    let number = format!("No. {}", header.number);
    let number_size = Pt::from_i32(BODY_FONT_SIZE);
    canvas.set_font(FontFace::Regular, number_size);
    let number = fit_text(
        FontFace::Regular,
        number_size,
        &number,
        Pt::from_i32(TITLE_COLUMN_WIDTH),
    );
    let number_w = measure_text_width(FontFace::Regular, number_size, &number);
    canvas.draw_string(right - number_w, top + Pt::from_i32(22), number);

    let rule_y = geometry.content_top() - Pt::from_i32(6);
    canvas.set_stroke_color(Color::rgb(RULE_GREY, RULE_GREY, RULE_GREY));
    canvas.set_line_width(Pt::from_f32(0.75));
    canvas.line(left, rule_y, right, rule_y);
}

/// The footer label is the template name (the document title) plus the
/// document number.
fn paint_footer(canvas: &mut Canvas, ctx: &DocContext, text: &str, number: &str) {
    let geometry = ctx.geometry;
    let left = geometry.content_left();
    let right = geometry.content_right();
    let rule_y = geometry.footer_top() + Pt::from_i32(8);
    canvas.set_stroke_color(Color::rgb(RULE_GREY, RULE_GREY, RULE_GREY));
    canvas.set_line_width(Pt::from_f32(0.75));
    canvas.line(left, rule_y, right, rule_y);
    let size = Pt::from_i32(8);
    canvas.set_fill_color(Color::rgb(0.35, 0.35, 0.35));
    canvas.set_font(FontFace::Regular, size);
    let text_y = rule_y + Pt::from_i32(6);
    let label = format!("{} {}", ctx.template_name, number);
    let label_w = measure_text_width(FontFace::Regular, size, &label);
    canvas.draw_string(right - label_w, text_y, label);
    canvas.draw_string(left, text_y, text);
    canvas.set_fill_color(Color::BLACK);
}

fn draw_parties(pages: &mut PageManager, model: &DocumentModel) {
    let geometry = pages.geometry().clone();
    let left = geometry.content_left();
    let column = geometry.content_width() / 2;
    let top = geometry.cursor();
    let line = Pt::from_i32(INFO_LINE_HEIGHT);
    let size = Pt::from_i32(BODY_FONT_SIZE);
    let text_width = (column - Pt::from_i32(8)).max(Pt::ZERO);

    let party = &model.counterpart;
    let address = party
        .address
        .as_deref()
        .map(|a| a.lines().map(str::trim).collect::<Vec<_>>().join(", "));
    let left_lines = [
        display_or_na(party.name.as_deref()).to_string(),
        display_or_na(party.contact.as_deref()).to_string(),
        display_or_na(address.as_deref()).to_string(),
    ];
    let right_lines = [
        ("Number:", model.display_number()),
        ("Date:", display_or_na(model.issue_date.as_deref())),
    ];

    let canvas = pages.canvas();
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(FontFace::Bold, size);
    canvas.draw_string(left, top, model.kind.counterpart_caption());
    canvas.set_font(FontFace::Regular, size);
    for (idx, text) in left_lines.iter().enumerate() {
        let y = top + line * (idx as i32 + 1);
        canvas.draw_string(left, y, fit_text(FontFace::Regular, size, text, text_width));
    }
    let label_x = left + column;
    let value_x = label_x + Pt::from_i32(50);
    let value_width = (text_width - Pt::from_i32(50)).max(Pt::ZERO);
    for (idx, (caption, value)) in right_lines.iter().enumerate() {
        let y = top + line * idx as i32;
        canvas.set_font(FontFace::Bold, size);
        canvas.draw_string(label_x, y, *caption);
        canvas.set_font(FontFace::Regular, size);
        canvas.draw_string(value_x, y, fit_text(FontFace::Regular, size, value, value_width));
    }
    pages.advance(line * (left_lines.len() as i32 + 1) + Pt::from_i32(SECTION_GAP));
}

fn draw_heading(pages: &mut PageManager, text: &str) {
    let top = pages.geometry().cursor() + Pt::from_i32(SECTION_GAP);
    let left = pages.geometry().content_left();
    let canvas = pages.canvas();
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(FontFace::Bold, Pt::from_i32(HEADING_FONT_SIZE));
    canvas.draw_string(left, top, text);
    pages.advance(Pt::from_i32(SECTION_GAP + HEADING_HEIGHT));
}

/// Wrapped body text, one line at a time; a line that does not fit starts
/// the next page.
fn draw_wrapped(pages: &mut PageManager, text: &str, reason: BreakReason) {
    let size = Pt::from_i32(BODY_FONT_SIZE);
    let line = Pt::from_i32(INFO_LINE_HEIGHT);
    let width = pages.geometry().content_width();
    for text_line in wrap_text(FontFace::Regular, size, text, width) {
        if !pages.fits(line) {
            pages.page_break(reason);
        }
        let left = pages.geometry().content_left();
        let top = pages.geometry().cursor();
        let canvas = pages.canvas();
        canvas.set_fill_color(Color::BLACK);
        canvas.set_font(FontFace::Regular, size);
        if !text_line.is_empty() {
            canvas.draw_string(left, top, text_line);
        }
        pages.advance(line);
    }
}

fn draw_refund(pages: &mut PageManager, refund: &RefundDetail) {
    let layout = TableLayout::refund_lines();
    let lead = Pt::from_i32(SECTION_GAP + HEADING_HEIGHT)
        + layout.style.header_height
        + layout.style.row_height;
    pages.ensure_room(lead, BreakReason::RefundOverflow);
    draw_heading(pages, "Refund Details");
    if let Some(note) = refund.note.as_deref().filter(|n| !n.trim().is_empty()) {
        draw_wrapped(pages, note, BreakReason::RefundOverflow);
        pages.advance(Pt::from_i32(4));
    }
    let rows: Vec<Vec<String>> = refund
        .items
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            vec![
                (idx + 1).to_string(),
                display_or_na(line.description.as_deref()).to_string(),
                format_quantity(line.quantity),
            ]
        })
        .collect();
    TableRenderer::new(&layout).render(pages, &rows);
}

fn draw_notes(pages: &mut PageManager, note: &str) {
    let lead = Pt::from_i32(SECTION_GAP + HEADING_HEIGHT + INFO_LINE_HEIGHT);
    pages.ensure_room(lead, BreakReason::NotesOverflow);
    draw_heading(pages, "Notes");
    draw_wrapped(pages, note, BreakReason::NotesOverflow);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::model::{DocumentKind, LineItem, Party, RefundLine, TotalsInputs};
    use crate::page::{META_FOOTER_KEY, META_HEADER_KEY};
    use crate::table::{META_TABLE_HEADER_KEY, META_TABLE_ROW_KEY};
    use base64::Engine;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).expect("decimal literal")
    }

    fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("ledgerpdf_{}_{}_{}", std::process::id(), nanos, name))
    }

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::builder()
            .company(CompanyProfile {
                name: "Al Noor Trading LLC".to_string(),
                address_lines: vec!["PO Box 112".to_string(), "Muscat, Oman".to_string()],
                contact: Some("+968 2400 0000".to_string()),
                tax_id: Some("OM1100223344".to_string()),
            })
            .notice_lines(vec![
                "Payment due within 30 days.".to_string(),
                "Goods remain our property until paid in full.".to_string(),
            ])
            .asset_timeout(Duration::from_millis(500))
            .build()
            .expect("renderer")
    }

    fn invoice(items: usize) -> DocumentModel {
        let items: Vec<LineItem> = (1..=items)
            .map(|n| LineItem::new(format!("Item {n}"), dec("1"), dec("10")))
            .collect();
        let subtotal = dec("10") * Decimal::from(items.len());
        DocumentModel {
            kind: DocumentKind::Invoice,
            document_number: Some("INV/2024/001".to_string()),
            counterpart: Party {
                name: Some("Customer One".to_string()),
                contact: None,
                address: Some("Street 1\nRuwi".to_string()),
            },
            issue_date: Some("2024-05-01".to_string()),
            items,
            totals: TotalsInputs::new(subtotal),
            refund: None,
            note: None,
        }
    }

    fn texts(laid_out: &LaidOutDocument) -> Vec<&str> {
        laid_out
            .document
            .pages
            .iter()
            .flat_map(|page| page.texts())
            .collect()
    }

    fn png_data_uri() -> String {
        let image = image::RgbaImage::from_pixel(40, 20, image::Rgba([0, 128, 0, 100]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode png");
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        )
    }

    #[test]
    fn simple_invoice_fits_one_page() {
        let model = invoice(2);
        let laid_out = renderer()
            .layout(&model, &RenderOptions::default())
            .expect("layout");
        assert_eq!(laid_out.document.pages.len(), 1);
        let texts = texts(&laid_out);
        for expected in [
            "INVOICE",
            "No. INV/2024/001",
            "Bill To",
            "Customer One",
            "Street 1, Ruwi",
            "N/A",
            "Grand Total",
            "OMR 20.000",
            "Page 1 of 1",
            "Payment due within 30 days.",
        ] {
            assert!(texts.contains(&expected), "missing {expected:?} in {texts:?}");
        }
        assert!(!texts.contains(&"Discount"));
        assert!(!texts.contains(&"Refund Amount"));
        assert_eq!(
            laid_out.logo,
            LogoStatus::Placeholder(AssetUnavailable::NoSource)
        );
    }

    #[test]
    fn long_invoice_repeats_header_footer_and_table_header() {
        let model = invoice(120);
        let (bytes, laid_out) = renderer()
            .render_to_buffer(&model, &RenderOptions::default())
            .expect("render");
        let pages = &laid_out.document.pages;
        assert!(pages.len() >= 3, "pages = {}", pages.len());
        assert_eq!(laid_out.metrics.page_count(), pages.len());
        assert_eq!(laid_out.metrics.table_rows(), 120);
        assert_eq!(laid_out.metrics.total_bytes, bytes.len());

        for (idx, page) in pages.iter().enumerate() {
            assert_eq!(page.meta_values(META_HEADER_KEY).count(), 1);
            assert_eq!(page.meta_values(META_FOOTER_KEY).count(), 1);
            assert!(matches!(
                page.commands.first(),
                Some(Command::Meta { key, .. }) if key == META_HEADER_KEY
            ));
            let expected_footer = format!("Page {} of {}", idx + 1, pages.len());
            assert_eq!(page.texts().last(), Some(expected_footer.as_str()));
            assert_eq!(page.texts().filter(|t| *t == "INVOICE").count(), 1);
            assert_eq!(page.texts().filter(|t| *t == "INVOICE INV/2024/001").count(), 1);
            if page.meta_values(META_TABLE_ROW_KEY).count() > 0 {
                assert_eq!(page.meta_values(META_TABLE_HEADER_KEY).count(), 1);
            }
        }

        let parsed = lopdf::Document::load_mem(&bytes).expect("parse pdf");
        assert_eq!(parsed.get_pages().len(), pages.len());
    }

    #[test]
    fn unreachable_logo_falls_back_to_placeholder_on_every_page() {
        let options = RenderOptions {
            logo: Some("http://127.0.0.1:9/logo.png".to_string()),
            ..RenderOptions::default()
        };
        let laid_out = renderer().layout(&invoice(80), &options).expect("layout");
        assert!(matches!(
            laid_out.logo,
            LogoStatus::Placeholder(AssetUnavailable::Fetch(_))
        ));
        assert!(laid_out.images.is_empty());
        assert!(laid_out.document.pages.len() > 1);
        for page in &laid_out.document.pages {
            assert_eq!(page.texts().filter(|t| *t == LOGO_PLACEHOLDER_TEXT).count(), 1);
        }
    }

    #[test]
    fn transparent_logo_is_embedded_flattened() {
        let options = RenderOptions {
            logo: Some(png_data_uri()),
            ..RenderOptions::default()
        };
        let (bytes, laid_out) = renderer()
            .render_to_buffer(&invoice(1), &options)
            .expect("render");
        assert_eq!(laid_out.logo, LogoStatus::Embedded { flattened: true });
        assert!(laid_out.images.contains_key(LOGO_RESOURCE_ID));
        let draws = laid_out.document.pages[0]
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::DrawImage { .. }))
            .count();
        assert_eq!(draws, 1);
        assert!(!laid_out.document.pages[0]
            .texts()
            .any(|t| t == LOGO_PLACEHOLDER_TEXT));
        let pdf = String::from_utf8_lossy(&bytes);
        assert!(pdf.contains("/DCTDecode"));
        assert!(!pdf.contains("/SMask"));
    }

    #[test]
    fn purchase_order_without_vat_shows_zero_vat() {
        let mut model = invoice(0);
        model.kind = DocumentKind::PurchaseOrder;
        model.document_number = Some("PO-17".to_string());
        model.totals = TotalsInputs::new(dec("50")).with_vat(dec("2.5"));
        let options = RenderOptions {
            vat_applicable: Some(false),
            ..RenderOptions::default()
        };
        let laid_out = renderer().layout(&model, &options).expect("layout");
        let texts = texts(&laid_out);
        assert!(texts.contains(&"PURCHASE ORDER"));
        assert!(texts.contains(&"PURCHASE ORDER PO-17"));
        assert!(texts.contains(&"Supplier"));
        assert!(texts.contains(&"No items"));
        assert!(texts.contains(&"VAT"));
        assert!(texts.contains(&"OMR 0.000"));
        assert!(texts.contains(&"OMR 50.000"));
        assert!(!texts.contains(&"OMR 52.500"));
    }

    #[test]
    fn refund_and_notes_follow_the_totals() {
        let mut model = invoice(0);
        model.totals = TotalsInputs::new(dec("100"))
            .with_vat(dec("5"))
            .with_refund(dec("20"));
        model.refund = Some(RefundDetail {
            note: Some("Two units returned damaged.".to_string()),
            items: vec![RefundLine {
                description: Some("Widget".to_string()),
                quantity: dec("2"),
            }],
        });
        model.note = Some("Thank you for your business.".to_string());
        let options = RenderOptions {
            currency: CurrencyFormat::new("USD", 2),
            ..RenderOptions::default()
        };
        let laid_out = renderer().layout(&model, &options).expect("layout");
        let texts = texts(&laid_out);
        let position = |needle: &str| {
            texts
                .iter()
                .position(|t| *t == needle)
                .unwrap_or_else(|| panic!("missing {needle:?}"))
        };
        assert!(position("USD 105.00") < position("USD -20.00"));
        assert!(position("USD -20.00") < position("USD 85.00"));
        assert!(position("USD 85.00") < position("Refund Details"));
        assert!(position("Refund Details") < position("Two units returned damaged."));
        assert!(position("Refunded Item") < position("Widget"));
        assert!(position("Widget") < position("Notes"));
        assert!(position("Notes") < position("Thank you for your business."));
        assert!(position("Thank you for your business.") < position("Payment due within 30 days."));
    }

    #[test]
    fn long_notes_continue_on_the_next_page() {
        let mut model = invoice(1);
        model.note = Some(vec!["line of remarks"; 200].join("\n"));
        let laid_out = renderer()
            .layout(&model, &RenderOptions::default())
            .expect("layout");
        let pages = &laid_out.document.pages;
        assert!(pages.len() >= 2);
        let note_lines: usize = pages
            .iter()
            .map(|page| page.texts().filter(|t| *t == "line of remarks").count())
            .sum();
        assert_eq!(note_lines, 200);
        for page in pages {
            assert_eq!(page.meta_values(META_FOOTER_KEY).count(), 1);
        }
    }

    #[test]
    fn persist_mode_writes_sanitized_file() {
        let dir = temp_path("out");
        let options = RenderOptions {
            output: OutputMode::Persist { dir: dir.clone() },
            ..RenderOptions::default()
        };
        let rendered = renderer().render(&invoice(3), &options).expect("render");
        let path = match rendered.output {
            RenderOutput::Persisted { path, .. } => path,
            other => panic!("unexpected output {other:?}"),
        };
        assert_eq!(path, dir.join("INV_2024_001.pdf"));
        let parsed = lopdf::Document::load(&path).expect("parse persisted pdf");
        assert_eq!(parsed.get_pages().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn preview_mode_publishes_a_fetchable_handle() {
        let renderer = renderer();
        let rendered = renderer
            .render(&invoice(2), &RenderOptions::default())
            .expect("render");
        let handle = match rendered.output {
            RenderOutput::Preview(handle) => handle,
            other => panic!("unexpected output {other:?}"),
        };
        let data = renderer.preview_store().fetch(&handle.url).expect("live");
        assert!(data.starts_with(b"%PDF-"));
        assert_eq!(data.len(), rendered.metrics.total_bytes);
        assert!(renderer.preview_store().revoke(&handle.url));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let options = RenderOptions {
            currency: CurrencyFormat {
                code: "OMR".to_string(),
                decimals: 7,
            },
            ..RenderOptions::default()
        };
        assert!(matches!(
            renderer().layout(&invoice(1), &options),
            Err(RenderError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DocumentRenderer::builder()
                .header_reserve(500.0)
                .footer_reserve(300.0)
                .build(),
            Err(RenderError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DocumentRenderer::builder().footer_reserve(-1.0).build(),
            Err(RenderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn reserves_must_hold_the_page_chrome() {
        for (header, footer) in [(0.0, 28.0), (69.5, 28.0), (96.0, 0.0), (96.0, 20.0)] {
            assert!(
                matches!(
                    DocumentRenderer::builder()
                        .header_reserve(header)
                        .footer_reserve(footer)
                        .build(),
                    Err(RenderError::InvalidConfiguration(_))
                ),
                "header {header} footer {footer} should be rejected"
            );
        }
        let renderer = DocumentRenderer::builder()
            .header_reserve(70.0)
            .footer_reserve(24.0)
            .build()
            .expect("minimum reserves");
        let laid_out = renderer
            .layout(&invoice(1), &RenderOptions::default())
            .expect("layout");
        let page = &laid_out.document.pages[0];
        // The logo placeholder box ends above the body's first row.
        let content_top = Pt::from_i32(36 + 70);
        let placeholder_bottom = page
            .commands
            .iter()
            .find_map(|cmd| match cmd {
                Command::StrokeRect { y, height, .. } => Some(*y + *height),
                _ => None,
            })
            .expect("placeholder box");
        assert!(placeholder_bottom <= content_top);
    }

    #[test]
    fn long_refund_table_repeats_its_header_on_each_page() {
        let path = temp_path("refund.jsonl");
        let renderer = DocumentRenderer::builder()
            .notice_lines(vec!["Refunds are credited within 14 days.".to_string()])
            .debug_log(&path)
            .build()
            .expect("renderer");
        let mut model = invoice(1);
        model.totals = TotalsInputs::new(dec("10")).with_refund(dec("4"));
        model.refund = Some(RefundDetail {
            note: None,
            items: (1..=80)
                .map(|n| RefundLine {
                    description: Some(format!("Returned part {n}")),
                    quantity: dec("1"),
                })
                .collect(),
        });
        let laid_out = renderer
            .layout(&model, &RenderOptions::default())
            .expect("layout");
        renderer.emit_debug_summary("refund");
        let log = std::fs::read_to_string(&path).expect("debug log");
        let _ = std::fs::remove_file(&path);

        let pages = &laid_out.document.pages;
        assert!(pages.len() >= 2, "pages = {}", pages.len());
        let mut refund_rows = 0;
        let mut refund_pages = 0;
        for (idx, page) in pages.iter().enumerate() {
            assert_eq!(page.meta_values(META_HEADER_KEY).count(), 1);
            assert_eq!(page.meta_values(META_FOOTER_KEY).count(), 1);
            let expected_footer = format!("Page {} of {}", idx + 1, pages.len());
            assert_eq!(page.texts().filter(|t| *t == expected_footer).count(), 1);
            let rows = page
                .meta_values(META_TABLE_ROW_KEY)
                .filter(|name| *name == "refund_lines")
                .count();
            let headers = page
                .meta_values(META_TABLE_HEADER_KEY)
                .filter(|name| *name == "refund_lines")
                .count();
            if rows > 0 {
                assert_eq!(headers, 1, "page {} refund header", idx + 1);
                assert_eq!(page.texts().filter(|t| *t == "Refunded Item").count(), 1);
                refund_pages += 1;
            }
            refund_rows += rows;
        }
        assert_eq!(refund_rows, 80);
        assert!(refund_pages >= 2);
        assert_eq!(texts(&laid_out).iter().filter(|t| **t == "Refund Details").count(), 1);
        assert!(log.contains("\"reason\":\"refund_overflow\""));
    }

    #[test]
    fn debug_log_records_breaks_and_summary() {
        let path = temp_path("debug.jsonl");
        let renderer = DocumentRenderer::builder()
            .debug_log(&path)
            .build()
            .expect("renderer");
        renderer
            .render(&invoice(90), &RenderOptions::default())
            .expect("render");
        let log = std::fs::read_to_string(&path).expect("debug log");
        let _ = std::fs::remove_file(&path);
        assert!(log.lines().next().is_some_and(|l| l.contains("\"render.start\"")));
        assert!(log.contains("\"reason\":\"table_overflow\""));
        assert!(log.contains("\"output.preview\""));
        assert!(log.contains("\"debug.summary\""));
        assert!(log.contains("\"layout.page_break\":"));
    }
}
