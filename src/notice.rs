use crate::font::{FontFace, fit_text};
use crate::page::{BreakReason, PageManager};
use crate::types::{Color, Pt};

pub const META_NOTICE_KEY: &str = "ledger.notice";

#[derive(Debug, Clone)]
pub struct NoticeStyle {
    pub padding: Pt,
    pub line_height: Pt,
    pub gap_before: Pt,
    pub font_size: Pt,
    pub fill: Color,
    pub border: Color,
}

impl Default for NoticeStyle {
    fn default() -> Self {
        Self {
            padding: Pt::from_i32(8),
            line_height: Pt::from_i32(12),
            gap_before: Pt::from_i32(14),
            font_size: Pt::from_i32(8),
            fill: Color::rgb(1.0, 0.97, 0.86),
            border: Color::rgb(0.85, 0.65, 0.13),
        }
    }
}

/// Highlighted box of fixed text lines (terms, bank details) placed after
/// the body. The box is never split across pages.
#[derive(Debug, Clone)]
pub struct NoticeBlock {
    lines: Vec<String>,
    style: NoticeStyle,
}

impl NoticeBlock {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            style: NoticeStyle::default(),
        }
    }

    pub fn with_style(mut self, style: NoticeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }

    pub fn height(&self) -> Pt {
        self.style.padding * 2 + self.style.line_height * self.lines.len() as i32
    }

    pub fn draw(&self, pages: &mut PageManager) {
        if self.is_empty() {
            return;
        }
        let style = &self.style;
        let height = self.height();
        pages.ensure_room(style.gap_before + height, BreakReason::NoticeOverflow);

        let geometry = pages.geometry().clone();
        let x = geometry.content_left();
        let width = geometry.content_width();
        let y = geometry.cursor() + style.gap_before;
        let inner = (width - style.padding * 2).max(Pt::ZERO);
        let canvas = pages.canvas();
        canvas.meta(META_NOTICE_KEY, self.lines.len().to_string());
        canvas.set_fill_color(style.fill);
        canvas.draw_rect(x, y, width, height);
        canvas.set_stroke_color(style.border);
        canvas.set_line_width(Pt::from_i32(1));
        canvas.stroke_rect(x, y, width, height);
        canvas.set_fill_color(Color::BLACK);
        canvas.set_font(FontFace::Regular, style.font_size);
        let leading = (style.line_height - style.font_size) / 2;
        for (idx, line) in self.lines.iter().enumerate() {
            let top = y + style.padding + style.line_height * idx as i32 + leading;
            let text = fit_text(FontFace::Regular, style.font_size, line, inner);
            if !text.is_empty() {
                canvas.draw_string(x + style.padding, top, text);
            }
        }
        pages.advance(style.gap_before + height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_template::PageTemplate;
    use crate::types::{Margins, Size};

    fn template() -> PageTemplate {
        PageTemplate::new(
            "notice",
            Size {
                width: Pt::from_i32(300),
                height: Pt::from_i32(200),
            },
        )
        .with_margins(Margins::all(10.0))
    }

    fn notice() -> NoticeBlock {
        NoticeBlock::new(vec![
            "Payment due within 30 days.".to_string(),
            "Bank: National Bank of Oman".to_string(),
            "IBAN: OM00 0000 0000 0000".to_string(),
        ])
    }

    #[test]
    fn height_is_padding_plus_lines() {
        assert_eq!(notice().height(), Pt::from_i32(2 * 8 + 3 * 12));
        assert_eq!(NoticeBlock::new(Vec::new()).height(), Pt::from_i32(16));
    }

    #[test]
    fn notice_fits_on_current_page_when_room_remains() {
        let mut pages = PageManager::start(template());
        notice().draw(&mut pages);
        assert_eq!(pages.current(), 1);
        let (doc, _) = pages.finish();
        assert_eq!(doc.pages[0].meta_values(META_NOTICE_KEY).collect::<Vec<_>>(), vec!["3"]);
        assert_eq!(doc.pages[0].texts().count(), 3);
    }

    #[test]
    fn notice_moves_whole_to_the_next_page() {
        let block = notice();
        let mut pages = PageManager::start(template());
        // 180pt band; leave 10pt less than the notice needs.
        pages.advance(Pt::from_i32(180 - 14 - 52 + 10));
        block.draw(&mut pages);
        assert_eq!(pages.current(), 2);
        let (doc, _) = pages.finish();
        assert_eq!(doc.pages[0].meta_values(META_NOTICE_KEY).count(), 0);
        assert_eq!(doc.pages[1].meta_values(META_NOTICE_KEY).count(), 1);
        assert_eq!(doc.pages[1].texts().count(), 3);
    }

    #[test]
    fn blank_notice_draws_nothing() {
        let mut pages = PageManager::start(template());
        NoticeBlock::new(vec!["  ".to_string()]).draw(&mut pages);
        let (doc, _) = pages.finish();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].meta_values(META_NOTICE_KEY).count(), 0);
    }
}
