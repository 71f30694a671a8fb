use crate::types::{Margins, Pt, Size};

/// Page dimensions, reserved header/footer bands and the vertical write
/// cursor. Only `advance` and `reset_to_top` move the cursor.
#[derive(Debug, Clone)]
pub struct GeometryContext {
    page_size: Size,
    margins: Margins,
    header_reserve: Pt,
    footer_reserve: Pt,
    cursor_y: Pt,
}

impl GeometryContext {
    pub fn new(page_size: Size, margins: Margins, header_reserve: Pt, footer_reserve: Pt) -> Self {
        let mut geometry = Self {
            page_size,
            margins,
            header_reserve: header_reserve.max(Pt::ZERO),
            footer_reserve: footer_reserve.max(Pt::ZERO),
            cursor_y: Pt::ZERO,
        };
        geometry.cursor_y = geometry.content_top();
        geometry
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    /// First writable y offset, below the header band.
    pub fn content_top(&self) -> Pt {
        self.margins.top + self.header_reserve
    }

    /// Last writable y offset, above the footer band.
    pub fn content_bottom(&self) -> Pt {
        self.page_size.height - self.margins.bottom - self.footer_reserve
    }

    pub fn content_height(&self) -> Pt {
        (self.content_bottom() - self.content_top()).max(Pt::ZERO)
    }

    pub fn content_left(&self) -> Pt {
        self.margins.left
    }

    pub fn content_right(&self) -> Pt {
        self.page_size.width - self.margins.right
    }

    pub fn content_width(&self) -> Pt {
        (self.content_right() - self.content_left()).max(Pt::ZERO)
    }

    /// Top of the header band.
    pub fn header_top(&self) -> Pt {
        self.margins.top
    }

    /// Top of the footer band.
    pub fn footer_top(&self) -> Pt {
        self.content_bottom()
    }

    pub fn cursor(&self) -> Pt {
        self.cursor_y
    }

    pub fn remaining(&self) -> Pt {
        (self.content_bottom() - self.cursor_y).max(Pt::ZERO)
    }

    pub fn at_content_top(&self) -> bool {
        self.cursor_y <= self.content_top()
    }

    pub fn fits(&self, height: Pt) -> bool {
        self.cursor_y + height.max(Pt::ZERO) <= self.content_bottom()
    }

    pub fn advance(&mut self, height: Pt) {
        self.cursor_y += height.max(Pt::ZERO);
    }

    pub(crate) fn reset_to_top(&mut self) {
        self.cursor_y = self.content_top();
    }
}
