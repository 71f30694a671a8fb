mod asset;
mod canvas;
mod debug;
mod doc_context;
mod error;
mod font;
mod format;
mod geometry;
mod metrics;
mod model;
mod notice;
mod output;
mod page;
mod page_template;
mod pdf;
mod render;
mod table;
mod totals;
mod types;

pub use asset::{AssetNormalizer, AssetUnavailable, LogoAsset, NormalizedLogo, flatten_alpha};
pub use canvas::{Canvas, Command, Document, Page};
pub use doc_context::DocContext;
pub use error::RenderError;
pub use font::{FontFace, fit_text, measure_text_width, wrap_text};
pub use format::{
    CurrencyFormat, MAX_DECIMAL_PLACES, VISIBILITY_THRESHOLD, format_quantity, format_quantity_str,
    is_present, parse_amount,
};
pub use geometry::GeometryContext;
pub use metrics::{DocumentMetrics, PageMetrics};
pub use model::{
    CompanyProfile, DocumentKind, DocumentModel, LineItem, NOT_AVAILABLE, Party, RefundDetail,
    RefundLine, TotalsInputs,
};
pub use notice::NoticeBlock;
pub use output::{
    OutputFinalizer, OutputMode, PreviewHandle, PreviewStore, RenderOutput, sanitize_file_name,
};
pub use page::{BreakReason, META_FOOTER_KEY, META_HEADER_KEY, PageManager};
pub use page_template::{OnPageCallback, PageTemplate};
pub use pdf::{ImageResource, ImageResources, PdfInfo, document_to_pdf};
pub use render::{
    DocumentRenderer, DocumentRendererBuilder, LOGO_PLACEHOLDER_TEXT, LaidOutDocument,
    LogoStatus, RenderOptions, RenderedDocument,
};
pub use table::{Align, Column, TableLayout, TableRenderer};
pub use totals::{RenderedRow, RowStyle, TotalsBlockBuilder, TotalsPolicy};
pub use types::{Color, Margins, Pt, Size};
