//! Minimal PDF writer for translated text.
//!
//! Produces PDF 1.4 with the built-in Helvetica font in WinAnsi encoding, so
//! no font files are embedded. That limits output to Latin-1 plus a few
//! typographic characters; anything else is rejected as unsupported.

use async_trait::async_trait;
use bytes::Bytes;

use super::DocumentRenderer;
use super::error::ServiceError;

/// A4 in points.
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
/// 10 mm.
const MARGIN: f32 = 28.35;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.55;
const LINE_SPACING: f32 = 1.4;

/// Renders plain text onto A4 pages.
pub struct PdfRenderer {
    font_size: f32,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self { font_size: 12.0 }
    }
}

impl PdfRenderer {
    fn chars_per_line(&self) -> usize {
        (((PAGE_WIDTH - 2.0 * MARGIN) / (self.font_size * AVG_GLYPH_WIDTH)) as usize).max(1)
    }

    fn lines_per_page(&self) -> usize {
        (((PAGE_HEIGHT - 2.0 * MARGIN) / (self.font_size * LINE_SPACING)) as usize).max(1)
    }

    /// Lay out and serialize `text`.
    pub fn render_bytes(&self, text: &str) -> Result<Vec<u8>, ServiceError> {
        let encoded = encode_win_ansi(text)?;
        let lines = wrap_lines(&encoded, self.chars_per_line());
        let pages: Vec<&[Vec<u8>]> = if lines.is_empty() {
            vec![lines.as_slice()]
        } else {
            lines.chunks(self.lines_per_page()).collect()
        };
        Ok(self.write_document(&pages))
    }

    fn write_document(&self, pages: &[&[Vec<u8>]]) -> Vec<u8> {
        let mut writer = ObjectWriter::new();

        // Objects 1-3 are fixed; each page then takes two ids (page, content).
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + i * 2).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");

        writer.object(b"<< /Type /Catalog /Pages 2 0 R >>");
        writer.object(
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()).as_bytes(),
        );
        writer.object(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );

        for (page_id, lines) in page_ids.iter().zip(pages) {
            writer.object(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH,
                    PAGE_HEIGHT,
                    page_id + 1
                )
                .as_bytes(),
            );
            writer.stream(&self.page_content(lines));
        }

        writer.finish()
    }

    fn page_content(&self, lines: &[Vec<u8>]) -> Vec<u8> {
        let leading = self.font_size * LINE_SPACING;
        let mut content = format!(
            "BT\n/F1 {:.1} Tf\n{:.2} TL\n{:.2} {:.2} Td\n",
            self.font_size,
            leading,
            MARGIN,
            PAGE_HEIGHT - MARGIN - self.font_size
        )
        .into_bytes();

        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                content.extend_from_slice(b"T*\n");
            }
            content.push(b'(');
            for &byte in line {
                if matches!(byte, b'(' | b')' | b'\\') {
                    content.push(b'\\');
                }
                content.push(byte);
            }
            content.extend_from_slice(b") Tj\n");
        }
        content.extend_from_slice(b"ET\n");
        content
    }
}

#[async_trait]
impl DocumentRenderer for PdfRenderer {
    async fn render(&self, text: &str) -> Result<Bytes, ServiceError> {
        self.render_bytes(text).map(Bytes::from)
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// Tracks byte offsets of numbered objects for the xref table.
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) -> usize {
        self.offsets.push(self.buf.len());
        let id = self.offsets.len();
        self.buf.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
        id
    }

    fn object(&mut self, body: &[u8]) {
        self.begin();
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, data: &[u8]) {
        self.begin();
        self.buf
            .extend_from_slice(format!("<< /Length {} >>\nstream\n", data.len()).as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let count = self.offsets.len() + 1;
        self.buf
            .extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", count).as_bytes());
        for offset in &self.offsets {
            self.buf
                .extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        self.buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                count, xref_offset
            )
            .as_bytes(),
        );
        self.buf
    }
}

// ============================================================================
// Text handling
// ============================================================================

/// Encode text as WinAnsi bytes. `\n` is kept as a paragraph break.
fn encode_win_ansi(text: &str) -> Result<Vec<u8>, ServiceError> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = match ch {
            '\n' => b'\n',
            '\t' => b' ',
            '\r' => continue,
            c if c.is_control() => continue,
            c if (' '..='~').contains(&c) => c as u8,
            c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c => {
                return Err(ServiceError::Unsupported(format!(
                    "character {:?} (U+{:04X}) has no glyph in the document font",
                    c, c as u32
                )));
            }
        };
        out.push(byte);
    }
    Ok(out)
}

/// Greedy word wrap over encoded bytes. Words longer than a line are split.
fn wrap_lines(encoded: &[u8], width: usize) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();

    for paragraph in encoded.split(|&b| b == b'\n') {
        let mut line: Vec<u8> = Vec::new();
        for word in paragraph.split(|&b| b == b' ').filter(|w| !w.is_empty()) {
            for piece in word.chunks(width) {
                let needed = if line.is_empty() { piece.len() } else { piece.len() + 1 };
                if line.len() + needed > width {
                    lines.push(std::mem::take(&mut line));
                }
                if !line.is_empty() {
                    line.push(b' ');
                }
                line.extend_from_slice(piece);
            }
        }
        lines.push(line);
    }

    // Drop trailing blank lines left by trailing newlines.
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
