use crate::Canvas;
use crate::doc_context::DocContext;
use crate::geometry::GeometryContext;
use crate::types::{Margins, Pt, Size};
use std::sync::Arc;

pub type OnPageCallback = Arc<dyn Fn(&mut Canvas, &DocContext) + Send + Sync>;

/// Page geometry plus the page-local header and footer painters.
#[derive(Clone)]
pub struct PageTemplate {
    pub name: String,
    pub page_size: Size,
    pub margins: Margins,
    pub header_reserve: Pt,
    pub footer_reserve: Pt,
    header: Option<OnPageCallback>,
    footer: Option<OnPageCallback>,
}

impl PageTemplate {
    pub fn new(name: impl Into<String>, page_size: Size) -> Self {
        Self {
            name: name.into(),
            page_size,
            margins: Margins::all(36.0),
            header_reserve: Pt::ZERO,
            footer_reserve: Pt::ZERO,
            header: None,
            footer: None,
        }
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_reserves(mut self, header_reserve: Pt, footer_reserve: Pt) -> Self {
        self.header_reserve = header_reserve;
        self.footer_reserve = footer_reserve;
        self
    }

    pub fn set_on_header<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.header = Some(Arc::new(callback));
        self
    }

    pub fn set_on_footer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.footer = Some(Arc::new(callback));
        self
    }

    pub fn on_header(&self) -> Option<&OnPageCallback> {
        self.header.as_ref()
    }

    pub fn on_footer(&self) -> Option<&OnPageCallback> {
        self.footer.as_ref()
    }

    pub fn geometry(&self) -> GeometryContext {
        GeometryContext::new(
            self.page_size,
            self.margins,
            self.header_reserve,
            self.footer_reserve,
        )
    }
}
