use crate::canvas::{Command, Document, Page};
use crate::font::FontFace;
use crate::types::{Color, Pt};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const PDF_FIRST_FONT_ID: usize = 4;

pub const PRODUCER: &str = "ledgerpdf";

/// A JPEG ready for embedding with `/DCTDecode`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResource {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Images referenced by `Command::DrawImage::resource_id`.
pub type ImageResources = BTreeMap<String, ImageResource>;

#[derive(Debug, Clone, Default)]
pub struct PdfInfo {
    pub title: Option<String>,
}

const FONTS: [(FontFace, &str); 2] = [(FontFace::Regular, "F1"), (FontFace::Bold, "F2")];

fn font_resource(name: &str) -> &'static str {
    match FontFace::from_pdf_name(name) {
        Some(FontFace::Bold) => "F2",
        _ => "F1",
    }
}

/// Serializes the command document. Object layout: catalog, page tree,
/// shared resources, the two base-14 fonts, images, then one content stream
/// and page object per page, then `/Info`.
pub fn document_to_pdf(document: &Document, images: &ImageResources, info: &PdfInfo) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    objects.push(format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID));
    // Page tree is filled in once page ids are known.
    objects.push(String::new());

    let image_start = PDF_FIRST_FONT_ID + FONTS.len();
    let mut image_names: BTreeMap<&str, String> = BTreeMap::new();
    let mut xobjects = String::new();
    for (index, (resource_id, _)) in images.iter().enumerate() {
        let name = format!("Im{}", index + 1);
        let _ = write!(xobjects, " /{} {} 0 R", name, image_start + index);
        image_names.insert(resource_id.as_str(), name);
    }
    let mut fonts = String::new();
    for (index, (_, resource)) in FONTS.iter().enumerate() {
        let _ = write!(fonts, " /{} {} 0 R", resource, PDF_FIRST_FONT_ID + index);
    }
    let mut resources = format!("<< /ProcSet [/PDF /Text /ImageC] /Font <<{} >>", fonts);
    if !xobjects.is_empty() {
        let _ = write!(resources, " /XObject <<{} >>", xobjects);
    }
    resources.push_str(" >>");
    objects.push(resources);

    for (face, _) in FONTS {
        objects.push(font_object(face.pdf_name()));
    }
    for image in images.values() {
        objects.push(image_object(image));
    }

    let page_height = document.page_size.height;
    let media_box = format!(
        "[0 0 {} {}]",
        fmt_pt(document.page_size.width),
        fmt_pt(page_height)
    );
    let mut page_ids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let content = page_content(page, page_height, &image_names);
        objects.push(stream_object(&content));
        let content_id = objects.len();
        objects.push(format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox {} /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID, media_box, PDF_RESOURCES_ID, content_id
        ));
        page_ids.push(objects.len());
    }
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    objects[PDF_PAGES_ID - 1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        page_ids.len()
    );

    objects.push(info_object(info));
    let info_id = objects.len();
    build_pdf(objects, PDF_CATALOG_ID, info_id)
}

fn page_content(page: &Page, page_height: Pt, images: &BTreeMap<&str, String>) -> String {
    let mut out = String::new();
    let mut font_name = FontFace::Regular.pdf_name().to_string();
    let mut font_size = Pt::from_i32(12);
    for command in &page.commands {
        match command {
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => {
                let _ = writeln!(out, "{} rg", fmt_color(*color));
            }
            Command::SetStrokeColor(color) => {
                let _ = writeln!(out, "{} RG", fmt_color(*color));
            }
            Command::SetLineWidth(width) => {
                let _ = writeln!(out, "{} w", fmt_pt(*width));
            }
            Command::SetFontName(name) => font_name = name.clone(),
            Command::SetFontSize(size) => font_size = *size,
            Command::MoveTo { x, y } => {
                let _ = writeln!(out, "{} {} m", fmt_pt(*x), fmt_pt(page_height - *y));
            }
            Command::LineTo { x, y } => {
                let _ = writeln!(out, "{} {} l", fmt_pt(*x), fmt_pt(page_height - *y));
            }
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                // y is the top of the text box; PDF wants the baseline.
                let baseline = page_height - *y - font_size;
                let _ = writeln!(
                    out,
                    "BT /{} {} Tf {} {} Td ({}) Tj ET",
                    font_resource(&font_name),
                    fmt_pt(font_size),
                    fmt_pt(*x),
                    fmt_pt(baseline),
                    escape_pdf_string(text)
                );
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                let operands = rect_operands(*x, *y, *width, *height, page_height);
                let _ = writeln!(out, "{operands} re f");
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                let operands = rect_operands(*x, *y, *width, *height, page_height);
                let _ = writeln!(out, "{operands} re S");
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                let Some(name) = images.get(resource_id.as_str()) else {
                    continue;
                };
                let _ = writeln!(
                    out,
                    "q {} 0 0 {} {} {} cm /{} Do Q",
                    fmt_pt(*width),
                    fmt_pt(*height),
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    name
                );
            }
        }
    }
    out
}

fn rect_operands(x: Pt, y: Pt, width: Pt, height: Pt, page_height: Pt) -> String {
    format!(
        "{} {} {} {}",
        fmt_pt(x),
        fmt_pt(page_height - y - height),
        fmt_pt(width),
        fmt_pt(height)
    )
}

fn font_object(base_font: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base_font
    )
}

fn image_object(image: &ImageResource) -> String {
    let mut data = ascii_hex_encode(&image.jpeg);
    data.push('>');
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /DCTDecode] >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        data.len(),
        data
    )
}

fn stream_object(content: &str) -> String {
    let length = content.len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn info_object(info: &PdfInfo) -> String {
    let mut entries = Vec::new();
    if let Some(title) = info.title.as_deref() {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    entries.push(format!("/Producer ({})", PRODUCER));
    format!("<< {} >>", entries.join(" "))
}

fn build_pdf(objects: Vec<String>, catalog_id: usize, info_id: usize) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    let trailer = format!(
        "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
        objects.len() + 1,
        catalog_id,
        info_id,
        xref_start
    );
    out.extend_from_slice(trailer.as_bytes());
    out
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (index, byte) in data.iter().enumerate() {
        let _ = write!(out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

/// Escapes a literal string for WinAnsi text. Characters outside cp1252
/// become `?`; bytes outside printable ASCII are written as octal escapes.
pub(crate) fn escape_pdf_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            _ => b'?',
        };
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if !(0x20..0x7f).contains(&b) => {
                let _ = write!(out, "\\{:03o}", b);
            }
            b => out.push(b as char),
        }
    }
    out
}

fn fmt_color(color: Color) -> String {
    format!(
        "{} {} {}",
        fmt_unit(color.r),
        fmt_unit(color.g),
        fmt_unit(color.b)
    )
}

fn fmt_unit(value: f32) -> String {
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    fmt_pt(Pt::from_f32(clamped))
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        return format!("{}{}", sign, int_part);
    }
    let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
    while s.ends_with('0') {
        s.pop();
    }
    s
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}
