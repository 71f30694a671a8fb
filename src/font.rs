use crate::types::Pt;

/// The engine draws with the two standard Helvetica faces only; widths come
/// from the Adobe core font metrics so no font program is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
}

impl FontFace {
    pub fn pdf_name(self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
        }
    }

    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "Helvetica" => Some(FontFace::Regular),
            "Helvetica-Bold" => Some(FontFace::Bold),
            _ => None,
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            FontFace::Regular => &HELVETICA_WIDTHS,
            FontFace::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    fn advance_for_char(self, ch: char) -> u16 {
        let code = ch as u32;
        if (32..=126).contains(&code) {
            self.widths()[(code - 32) as usize]
        } else {
            MISSING_WIDTH
        }
    }
}

const MISSING_WIDTH: u16 = 556;

// Glyph advances in 1/1000 em for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

pub fn measure_text_width(face: FontFace, font_size: Pt, text: &str) -> Pt {
    let units: i64 = text.chars().map(|ch| face.advance_for_char(ch) as i64).sum();
    Pt::from_milli_i64(font_size.to_milli_i64().saturating_mul(units) / 1000)
}

/// Truncates `text` with a trailing "..." so it fits in `max_width`.
pub fn fit_text(face: FontFace, font_size: Pt, text: &str, max_width: Pt) -> String {
    if measure_text_width(face, font_size, text) <= max_width {
        return text.to_string();
    }
    let ellipsis = "...";
    let budget = max_width - measure_text_width(face, font_size, ellipsis);
    if budget <= Pt::ZERO {
        return String::new();
    }
    let mut out = String::new();
    for ch in text.chars() {
        let mut candidate = out.clone();
        candidate.push(ch);
        if measure_text_width(face, font_size, &candidate) > budget {
            break;
        }
        out = candidate;
    }
    let trimmed = out.trim_end();
    format!("{trimmed}{ellipsis}")
}

/// Greedy word wrap. Words longer than a line are truncated with `fit_text`.
pub fn wrap_text(face: FontFace, font_size: Pt, text: &str, max_width: Pt) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure_text_width(face, font_size, &candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure_text_width(face, font_size, word) <= max_width {
                current = word.to_string();
            } else {
                lines.push(fit_text(face, font_size, word, max_width));
            }
        }
        lines.push(current);
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}
