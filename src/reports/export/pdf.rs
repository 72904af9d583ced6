//! Minimal PDF 1.4 writer: uncompressed content streams, the two standard Helvetica
//! faces with WinAnsi encoding, text, lines and filled rectangles. Coordinates are
//! given from the top-left corner of the page and flipped on output.

use std::fmt::Write as _;

pub const A4_WIDTH: f64 = 595.0;
pub const A4_HEIGHT: f64 = 842.0;

/// Average Helvetica glyph width relative to the font size.
const AVG_GLYPH_WIDTH: f64 = 0.52;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f64, pub f64, pub f64);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

#[derive(Debug)]
struct Page {
    width: f64,
    height: f64,
    content: String,
}

#[derive(Debug)]
pub struct PdfDocument {
    title: String,
    created: Option<String>,
    pages: Vec<Page>,
    font: Font,
}

pub fn text_width(text: &str, size: f64) -> f64 {
    text.chars().count() as f64 * size * AVG_GLYPH_WIDTH
}

/// Cuts `text` so it fits `max_width`, ending with "..." when shortened.
pub fn fit_text(text: &str, size: f64, max_width: f64) -> String {
    if text_width(text, size) <= max_width {
        return text.to_string();
    }
    let budget = (max_width / (size * AVG_GLYPH_WIDTH)).floor() as usize;
    if budget <= 3 {
        return text.chars().take(budget).collect();
    }
    let mut cut: String = text.chars().take(budget - 3).collect();
    cut.push_str("...");
    cut
}

impl PdfDocument {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            created: None,
            pages: Vec::new(),
            font: Font::Regular,
        }
    }

    pub fn add_page(&mut self, width: f64, height: f64) {
        self.pages.push(Page {
            width,
            height,
            content: String::new(),
        });
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_metadata(&mut self, title: &str, created: &str) {
        self.title = title.to_string();
        self.created = Some(created.to_string());
    }

    pub fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    fn current(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.add_page(A4_WIDTH, A4_HEIGHT);
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn set_fill_color(&mut self, color: Rgb) {
        let page = self.current();
        let _ = writeln!(page.content, "{:.3} {:.3} {:.3} rg", color.0, color.1, color.2);
    }

    pub fn set_stroke_color(&mut self, color: Rgb) {
        let page = self.current();
        let _ = writeln!(page.content, "{:.3} {:.3} {:.3} RG", color.0, color.1, color.2);
    }

    pub fn set_line_width(&mut self, width: f64) {
        let page = self.current();
        let _ = writeln!(page.content, "{width:.2} w");
    }

    pub fn draw_rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: bool, stroke: bool) {
        let op = match (fill, stroke) {
            (true, true) => "B",
            (true, false) => "f",
            (false, true) => "S",
            (false, false) => return,
        };
        let page = self.current();
        let bottom = page.height - y - h;
        let _ = writeln!(page.content, "{x:.2} {bottom:.2} {w:.2} {h:.2} re {op}");
    }

    pub fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let page = self.current();
        let (y1, y2) = (page.height - y1, page.height - y2);
        let _ = writeln!(page.content, "{x1:.2} {y1:.2} m {x2:.2} {y2:.2} l S");
    }

    /// Draws `text` with its baseline at `y`.
    pub fn draw_text(&mut self, text: &str, x: f64, y: f64, font_size: f64) {
        let font = self.font.resource();
        let encoded = encode_text(text);
        let page = self.current();
        let baseline = page.height - y;
        let _ = writeln!(
            page.content,
            "BT /{font} {font_size:.1} Tf {x:.2} {baseline:.2} Td ({encoded}) Tj ET"
        );
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::new();

        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| 6 + 2 * i).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");

        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{kids}] /Count {} >>",
                self.pages.len()
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
            self.info_dictionary(),
        ];

        for (i, page) in self.pages.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                page.width,
                page.height,
                7 + 2 * i
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}endstream",
                page.content.len(),
                page.content
            ));
        }

        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in &offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }

    fn info_dictionary(&self) -> String {
        let mut info = format!(
            "<< /Title ({}) /Producer (crmserver)",
            encode_text(&self.title)
        );
        if let Some(ref created) = self.created {
            let _ = write!(info, " /CreationDate ({})", encode_text(created));
        }
        info.push_str(" >>");
        info
    }
}

/// Escapes a string for a PDF literal. Latin-1 characters are written as octal
/// escapes (WinAnsi agrees with Latin-1 above 0xA0); anything else becomes '?'.
fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_escapes() {
        assert_eq!(encode_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(encode_text("Relatório"), "Relat\\363rio");
        assert_eq!(encode_text("漢"), "?");
    }

    #[test]
    fn test_document_structure() {
        let mut pdf = PdfDocument::new("Test");
        pdf.add_page(A4_WIDTH, A4_HEIGHT);
        pdf.draw_text("Hello", 40.0, 60.0, 12.0);
        pdf.add_page(A4_WIDTH, A4_HEIGHT);
        pdf.add_metadata("Test", "2026-03-01T00:00:00Z");

        let bytes = pdf.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(text.contains("/Count 2"));
        assert!(text.contains("(Hello) Tj"));
        assert!(text.trim_end().ends_with("%%EOF"));

        let startxref: usize = text
            .split("startxref\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(bytes[startxref..].starts_with(b"xref"));
    }

    #[test]
    fn test_fit_text() {
        assert_eq!(fit_text("short", 10.0, 100.0), "short");
        let cut = fit_text("a very long company name indeed", 10.0, 52.0);
        assert_eq!(cut, "a very ...");
    }
}
