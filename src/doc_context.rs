use crate::geometry::GeometryContext;

/// What a header or footer painter knows about the page it is drawing on.
#[derive(Debug, Clone, Copy)]
pub struct DocContext<'a> {
    pub page_number: usize,
    pub template_name: &'a str,
    pub geometry: &'a GeometryContext,
}

impl<'a> DocContext<'a> {
    pub fn new(page_number: usize, template_name: &'a str, geometry: &'a GeometryContext) -> Self {
        Self {
            page_number,
            template_name,
            geometry,
        }
    }
}
