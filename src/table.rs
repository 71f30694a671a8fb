use crate::font::{FontFace, fit_text, measure_text_width};
use crate::page::{BreakReason, PageManager};
use crate::types::{Color, Pt};

pub const META_TABLE_HEADER_KEY: &str = "ledger.table_header";
pub const META_TABLE_ROW_KEY: &str = "ledger.table_row";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub title: String,
    /// `None` takes whatever width the fixed columns leave.
    pub width: Option<Pt>,
    pub align: Align,
}

impl Column {
    pub fn fixed(title: impl Into<String>, width: f32, align: Align) -> Self {
        Self {
            title: title.into(),
            width: Some(Pt::from_f32(width)),
            align,
        }
    }

    pub fn fill(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: None,
            align: Align::Left,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableStyle {
    pub header_height: Pt,
    pub row_height: Pt,
    pub font_size: Pt,
    pub cell_padding: Pt,
    pub header_fill: Color,
    pub header_text: Color,
    pub rule: Color,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            header_height: Pt::from_i32(20),
            row_height: Pt::from_i32(18),
            font_size: Pt::from_i32(9),
            cell_padding: Pt::from_i32(4),
            header_fill: Color::rgb(0.16, 0.24, 0.36),
            header_text: Color::WHITE,
            rule: Color::rgb(0.8, 0.8, 0.8),
        }
    }
}

/// Column set plus styling for one table.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub style: TableStyle,
    pub empty_text: String,
    pub break_reason: BreakReason,
}

impl TableLayout {
    pub fn line_items() -> Self {
        Self {
            name: "line_items",
            columns: vec![
                Column::fixed("#", 40.0, Align::Left),
                Column::fill("Description"),
                Column::fixed("Qty", 60.0, Align::Right),
                Column::fixed("Unit Price", 80.0, Align::Right),
                Column::fixed("Total", 90.0, Align::Right),
            ],
            style: TableStyle::default(),
            empty_text: "No items".to_string(),
            break_reason: BreakReason::TableOverflow,
        }
    }

    pub fn refund_lines() -> Self {
        Self {
            name: "refund_lines",
            columns: vec![
                Column::fixed("#", 40.0, Align::Left),
                Column::fill("Refunded Item"),
                Column::fixed("Qty", 60.0, Align::Right),
            ],
            style: TableStyle::default(),
            empty_text: "No refunded items".to_string(),
            break_reason: BreakReason::RefundOverflow,
        }
    }

    /// Resolves column widths against the available content width.
    pub fn column_widths(&self, available: Pt) -> Vec<Pt> {
        let fixed: Pt = self.columns.iter().filter_map(|col| col.width).sum();
        let fill_count = self.columns.iter().filter(|col| col.width.is_none()).count();
        let leftover = (available - fixed).max(Pt::ZERO);
        let fill_width = if fill_count == 0 {
            Pt::ZERO
        } else {
            leftover / fill_count as i32
        };
        self.columns
            .iter()
            .map(|col| col.width.unwrap_or(fill_width))
            .collect()
    }
}

/// Draws a header row and fixed-height body rows, repeating the header on
/// every page the body spills onto.
pub struct TableRenderer<'a> {
    layout: &'a TableLayout,
}

impl<'a> TableRenderer<'a> {
    pub fn new(layout: &'a TableLayout) -> Self {
        Self { layout }
    }

    pub fn render(&self, pages: &mut PageManager, rows: &[Vec<String>]) {
        let style = &self.layout.style;
        pages.ensure_room(
            style.header_height + style.row_height,
            self.layout.break_reason,
        );
        self.draw_header_row(pages);

        if rows.is_empty() {
            self.draw_placeholder_row(pages);
            return;
        }

        for row in rows {
            if !pages.fits(style.row_height) {
                pages.page_break(self.layout.break_reason);
                self.draw_header_row(pages);
            }
            self.draw_body_row(pages, row);
        }
    }

    fn draw_header_row(&self, pages: &mut PageManager) {
        let style = &self.layout.style;
        let geometry = pages.geometry().clone();
        let widths = self.layout.column_widths(geometry.content_width());
        let top = geometry.cursor();
        let canvas = pages.canvas();
        canvas.meta(META_TABLE_HEADER_KEY, self.layout.name);
        canvas.set_fill_color(style.header_fill);
        canvas.draw_rect(
            geometry.content_left(),
            top,
            geometry.content_width(),
            style.header_height,
        );
        canvas.set_fill_color(style.header_text);
        canvas.set_font(FontFace::Bold, style.font_size);
        let text_y = top + (style.header_height - style.font_size) / 2;
        let mut x = geometry.content_left();
        for (column, width) in self.layout.columns.iter().zip(&widths) {
            self.draw_cell(canvas, FontFace::Bold, &column.title, column.align, x, *width, text_y);
            x += *width;
        }
        canvas.set_fill_color(Color::BLACK);
        pages.advance(style.header_height);
    }

    fn draw_body_row(&self, pages: &mut PageManager, row: &[String]) {
        let style = &self.layout.style;
        let geometry = pages.geometry().clone();
        let widths = self.layout.column_widths(geometry.content_width());
        let top = geometry.cursor();
        let canvas = pages.canvas();
        canvas.meta(META_TABLE_ROW_KEY, self.layout.name);
        canvas.set_fill_color(Color::BLACK);
        canvas.set_font(FontFace::Regular, style.font_size);
        let text_y = top + (style.row_height - style.font_size) / 2;
        let mut x = geometry.content_left();
        for (idx, (column, width)) in self.layout.columns.iter().zip(&widths).enumerate() {
            let text = row.get(idx).map(String::as_str).unwrap_or("");
            self.draw_cell(canvas, FontFace::Regular, text, column.align, x, *width, text_y);
            x += *width;
        }
        let bottom = top + style.row_height;
        canvas.set_stroke_color(style.rule);
        canvas.set_line_width(Pt::from_f32(0.5));
        canvas.line(geometry.content_left(), bottom, geometry.content_right(), bottom);
        pages.advance(style.row_height);
        pages.record_table_row();
    }

    fn draw_placeholder_row(&self, pages: &mut PageManager) {
        let style = &self.layout.style;
        let geometry = pages.geometry().clone();
        let top = geometry.cursor();
        let canvas = pages.canvas();
        canvas.set_fill_color(Color::rgb(0.4, 0.4, 0.4));
        canvas.set_font(FontFace::Regular, style.font_size);
        let text_y = top + (style.row_height - style.font_size) / 2;
        canvas.draw_string(
            geometry.content_left() + style.cell_padding,
            text_y,
            self.layout.empty_text.clone(),
        );
        canvas.set_fill_color(Color::BLACK);
        pages.advance(style.row_height);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_cell(
        &self,
        canvas: &mut crate::Canvas,
        face: FontFace,
        text: &str,
        align: Align,
        x: Pt,
        width: Pt,
        y: Pt,
    ) {
        let padding = self.layout.style.cell_padding;
        let font_size = self.layout.style.font_size;
        let inner = (width - padding * 2).max(Pt::ZERO);
        let text = fit_text(face, font_size, text, inner);
        if text.is_empty() {
            return;
        }
        let text_x = match align {
            Align::Left => x + padding,
            Align::Right => x + width - padding - measure_text_width(face, font_size, &text),
        };
        canvas.draw_string(text_x, y, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{META_FOOTER_KEY, META_HEADER_KEY};
    use crate::page_template::PageTemplate;
    use crate::types::{Margins, Size};

    // Content band: 300 - 2*10 margins - 40 header - 20 footer = 220pt.
    // The 20pt table header leaves 200pt, so floor(200 / 18) = 11 rows fit.
    fn template() -> PageTemplate {
        PageTemplate::new(
            "table",
            Size {
                width: Pt::from_i32(400),
                height: Pt::from_i32(300),
            },
        )
        .with_margins(Margins::all(10.0))
        .with_reserves(Pt::from_i32(40), Pt::from_i32(20))
        .set_on_header(|canvas, ctx| {
            canvas.draw_string(Pt::ZERO, ctx.geometry.header_top(), "HEADER")
        })
        .set_on_footer(|canvas, ctx| {
            canvas.draw_string(Pt::ZERO, ctx.geometry.footer_top(), "FOOTER")
        })
    }

    fn rows(count: usize) -> Vec<Vec<String>> {
        (1..=count)
            .map(|n| {
                vec![
                    n.to_string(),
                    format!("Item {n}"),
                    "1".to_string(),
                    "OMR 1.000".to_string(),
                    "OMR 1.000".to_string(),
                ]
            })
            .collect()
    }

    #[test]
    fn description_column_takes_remaining_width() {
        let layout = TableLayout::line_items();
        let widths = layout.column_widths(Pt::from_i32(500));
        assert_eq!(widths[1], Pt::from_i32(500 - 40 - 60 - 80 - 90));
        let narrow = layout.column_widths(Pt::from_i32(100));
        assert_eq!(narrow[1], Pt::ZERO);
    }

    #[test]
    fn long_tables_paginate_and_repeat_the_header_row() {
        let layout = TableLayout::line_items();
        let style = &layout.style;
        let per_page_height = template().geometry().content_height() - style.header_height;
        let rows_per_page =
            (per_page_height.to_milli_i64() / style.row_height.to_milli_i64()) as usize;
        assert_eq!(rows_per_page, 11);

        for count in [1usize, 11, 12, 30, 33, 34] {
            let mut pages = PageManager::start(template());
            TableRenderer::new(&layout).render(&mut pages, &rows(count));
            let (doc, metrics) = pages.finish();

            let expected = count.div_ceil(rows_per_page);
            assert_eq!(doc.pages.len(), expected, "rows={count}");
            assert_eq!(metrics.table_rows(), count);
            for page in &doc.pages {
                assert_eq!(page.meta_values(META_TABLE_HEADER_KEY).count(), 1);
                assert!(page.meta_values(META_TABLE_ROW_KEY).count() > 0);
                assert_eq!(page.meta_values(META_HEADER_KEY).count(), 1);
                assert_eq!(page.meta_values(META_FOOTER_KEY).count(), 1);
                assert_eq!(page.texts().next(), Some("HEADER"));
                assert_eq!(page.texts().last(), Some("FOOTER"));
            }
        }
    }

    #[test]
    fn empty_tables_render_a_placeholder_row() {
        let layout = TableLayout::line_items();
        let mut pages = PageManager::start(template());
        TableRenderer::new(&layout).render(&mut pages, &[]);
        let (doc, _) = pages.finish();
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.pages[0].texts().any(|t| t == "No items"));
        assert!(doc.pages[0].texts().any(|t| t == "Description"));
    }

    #[test]
    fn right_aligned_cells_end_at_the_column_edge() {
        let layout = TableLayout::line_items();
        let mut pages = PageManager::start(template());
        TableRenderer::new(&layout).render(&mut pages, &rows(1));
        let (doc, _) = pages.finish();
        let right_edge = Pt::from_i32(400 - 10) - layout.style.cell_padding;
        let total_cell = doc.pages[0]
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                crate::Command::DrawString { x, text, .. } if text == "OMR 1.000" => Some(*x),
                _ => None,
            })
            .last()
            .expect("total cell");
        let width = measure_text_width(FontFace::Regular, layout.style.font_size, "OMR 1.000");
        assert_eq!(total_cell + width, right_edge);
    }
}
