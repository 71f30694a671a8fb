use crate::canvas::{Canvas, Command, Document};
use crate::debug::DebugLogger;
use crate::doc_context::DocContext;
use crate::geometry::GeometryContext;
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::page_template::PageTemplate;
use crate::types::Pt;
use std::sync::Arc;
use std::time::Instant;

pub const META_HEADER_KEY: &str = "ledger.header";
pub const META_FOOTER_KEY: &str = "ledger.footer";

/// Why a block forced the current page to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    TableOverflow,
    TotalsOverflow,
    RefundOverflow,
    NotesOverflow,
    NoticeOverflow,
}

impl BreakReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakReason::TableOverflow => "table_overflow",
            BreakReason::TotalsOverflow => "totals_overflow",
            BreakReason::RefundOverflow => "refund_overflow",
            BreakReason::NotesOverflow => "notes_overflow",
            BreakReason::NoticeOverflow => "notice_overflow",
        }
    }
}

/// Owns page numbering and the header/footer protocol:
/// footer for page N, then `new_page`, which draws the header for page N+1
/// and resets the cursor before any content is placed.
pub struct PageManager {
    template: PageTemplate,
    canvas: Canvas,
    geometry: GeometryContext,
    page_number: usize,
    footer_drawn: bool,
    page_rows: usize,
    page_start: Instant,
    metrics: DocumentMetrics,
    debug: Option<Arc<DebugLogger>>,
    debug_label: String,
}

impl PageManager {
    /// Opens page 1 and draws its header.
    pub fn start(template: PageTemplate) -> Self {
        let geometry = template.geometry();
        let canvas = Canvas::new(template.page_size);
        let mut manager = Self {
            template,
            canvas,
            geometry,
            page_number: 1,
            footer_drawn: false,
            page_rows: 0,
            page_start: Instant::now(),
            metrics: DocumentMetrics::default(),
            debug: None,
            debug_label: String::new(),
        };
        manager.draw_header();
        manager
    }

    pub(crate) fn with_debug(mut self, debug: Arc<DebugLogger>, label: impl Into<String>) -> Self {
        self.debug = Some(debug);
        self.debug_label = label.into();
        self
    }

    pub fn current(&self) -> usize {
        self.page_number
    }

    pub fn geometry(&self) -> &GeometryContext {
        &self.geometry
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn fits(&self, height: Pt) -> bool {
        self.geometry.fits(height)
    }

    pub fn advance(&mut self, height: Pt) {
        self.geometry.advance(height);
    }

    pub(crate) fn record_table_row(&mut self) {
        self.page_rows += 1;
    }

    /// Draws the footer for the current page. Calling it twice is a no-op.
    pub fn finish_page(&mut self) {
        if self.footer_drawn {
            return;
        }
        self.canvas.meta(META_FOOTER_KEY, self.page_number.to_string());
        if let Some(callback) = self.template.on_footer().cloned() {
            let ctx = DocContext::new(self.page_number, &self.template.name, &self.geometry);
            callback(&mut self.canvas, &ctx);
        }
        self.footer_drawn = true;
    }

    /// Starts the next page. The outgoing page's footer is drawn first if the
    /// caller has not already done so.
    pub fn new_page(&mut self) {
        self.finish_page();
        self.close_page();
        self.page_number += 1;
        self.footer_drawn = false;
        self.geometry.reset_to_top();
        self.draw_header();
    }

    pub fn page_break(&mut self, reason: BreakReason) {
        if let Some(logger) = self.debug.as_deref() {
            logger.page_break(
                &self.debug_label,
                reason.as_str(),
                self.page_number,
                self.page_number + 1,
            );
        }
        self.finish_page();
        self.new_page();
    }

    /// Breaks the page when a block of `height` does not fit. A block taller
    /// than an empty page is placed anyway so pagination keeps moving.
    pub fn ensure_room(&mut self, height: Pt, reason: BreakReason) -> bool {
        if self.geometry.fits(height) || self.geometry.at_content_top() {
            return false;
        }
        self.page_break(reason);
        true
    }

    /// Draws the last footer, resolves `{pages}` in footers and returns the
    /// finished command document.
    pub fn finish(mut self) -> (Document, DocumentMetrics) {
        self.finish_page();
        self.close_page();
        let mut document = self.canvas.finish_without_show();
        let total_pages = document.pages.len();
        for (idx, page) in document.pages.iter_mut().enumerate() {
            substitute_footer_placeholders(&mut page.commands, idx + 1, total_pages);
        }
        (document, self.metrics)
    }

    fn draw_header(&mut self) {
        self.canvas.meta(META_HEADER_KEY, self.page_number.to_string());
        if let Some(callback) = self.template.on_header().cloned() {
            let ctx = DocContext::new(self.page_number, &self.template.name, &self.geometry);
            callback(&mut self.canvas, &ctx);
        }
    }

    fn close_page(&mut self) {
        let elapsed = self.page_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.total_render_ms += elapsed;
        self.metrics.pages.push(PageMetrics {
            page_number: self.page_number,
            render_ms: elapsed,
            command_count: self.canvas.current_command_count(),
            table_rows: self.page_rows,
        });
        self.canvas.show_page();
        self.page_rows = 0;
        self.page_start = Instant::now();
    }
}

/// Footers are the last thing drawn on a page, so only commands after the
/// footer marker are rewritten.
fn substitute_footer_placeholders(commands: &mut [Command], page_number: usize, total: usize) {
    let start = commands
        .iter()
        .rposition(|cmd| matches!(cmd, Command::Meta { key, .. } if key == META_FOOTER_KEY))
        .unwrap_or(commands.len());
    for cmd in &mut commands[start..] {
        if let Command::DrawString { text, .. } = cmd {
            *text = text
                .replace("{page}", &page_number.to_string())
                .replace("{pages}", &total.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Page;
    use crate::types::{Margins, Size};

    fn template() -> PageTemplate {
        PageTemplate::new(
            "H",
            Size {
                width: Pt::from_i32(200),
                height: Pt::from_i32(200),
            },
        )
        .with_margins(Margins::all(10.0))
        .with_reserves(Pt::from_i32(20), Pt::from_i32(20))
        .set_on_header(|canvas, ctx| {
            canvas.draw_string(
                Pt::ZERO,
                ctx.geometry.header_top(),
                format!("{}{}", ctx.template_name, ctx.page_number),
            );
        })
        .set_on_footer(|canvas, ctx| {
            canvas.draw_string(
                Pt::ZERO,
                ctx.geometry.footer_top(),
                format!("F{} of {{pages}}", ctx.page_number),
            );
        })
    }

    fn texts(page: &Page) -> Vec<&str> {
        page.texts().collect()
    }

    #[test]
    fn every_page_gets_one_header_first_and_one_footer_last() {
        let mut pages = PageManager::start(template());
        pages.canvas().draw_string(Pt::ZERO, Pt::ZERO, "body 1");
        pages.page_break(BreakReason::TableOverflow);
        pages.canvas().draw_string(Pt::ZERO, Pt::ZERO, "body 2");
        pages.finish_page();
        pages.new_page();
        assert_eq!(pages.current(), 3);
        let (doc, metrics) = pages.finish();

        assert_eq!(doc.pages.len(), 3);
        assert_eq!(metrics.page_count(), 3);
        assert_eq!(texts(&doc.pages[0]), vec!["H1", "body 1", "F1 of 3"]);
        assert_eq!(texts(&doc.pages[1]), vec!["H2", "body 2", "F2 of 3"]);
        assert_eq!(texts(&doc.pages[2]), vec!["H3", "F3 of 3"]);
        for page in &doc.pages {
            assert_eq!(page.meta_values(META_HEADER_KEY).count(), 1);
            assert_eq!(page.meta_values(META_FOOTER_KEY).count(), 1);
        }
    }

    #[test]
    fn new_page_resets_cursor_to_content_top() {
        let mut pages = PageManager::start(template());
        let top = pages.geometry().content_top();
        pages.advance(Pt::from_i32(50));
        assert!(pages.geometry().cursor() > top);
        pages.page_break(BreakReason::NoticeOverflow);
        assert_eq!(pages.geometry().cursor(), top);
    }

    #[test]
    fn ensure_room_breaks_only_when_needed() {
        let mut pages = PageManager::start(template());
        // content band is 30..170 -> 140pt tall
        assert!(!pages.ensure_room(Pt::from_i32(140), BreakReason::TotalsOverflow));
        pages.advance(Pt::from_i32(100));
        assert!(!pages.ensure_room(Pt::from_i32(40), BreakReason::TotalsOverflow));
        assert!(pages.ensure_room(Pt::from_i32(41), BreakReason::TotalsOverflow));
        assert_eq!(pages.current(), 2);
        // Oversized blocks stay on an empty page instead of looping.
        assert!(!pages.ensure_room(Pt::from_i32(500), BreakReason::TotalsOverflow));
        assert_eq!(pages.current(), 2);
    }

    #[test]
    fn placeholders_outside_the_footer_are_left_alone() {
        let mut pages = PageManager::start(template());
        pages
            .canvas()
            .draw_string(Pt::ZERO, Pt::ZERO, "Widget {pages} edition");
        let (doc, _) = pages.finish();
        assert_eq!(
            texts(&doc.pages[0]),
            vec!["H1", "Widget {pages} edition", "F1 of 1"]
        );
    }
}
