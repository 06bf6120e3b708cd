use std::fmt::Write as _;

use super::fonts::{encode_win_ansi, Font};

/// US Letter in points.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(255, 255, 255);
    pub const BLACK: Color = Color(0, 0, 0);

    fn operands(self) -> String {
        format!(
            "{} {} {}",
            num(f32::from(self.0) / 255.0),
            num(f32::from(self.1) / 255.0),
            num(f32::from(self.2) / 255.0)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Fill,
    Stroke,
    FillStroke,
}

#[derive(Debug, Clone)]
struct Link {
    rect: [f32; 4],
    uri: String,
}

#[derive(Debug, Clone, Default)]
struct Page {
    content: Vec<u8>,
    links: Vec<Link>,
}

/// A small PDF writer with buffered pages.
///
/// Callers use a top-left origin with y growing downward, the same frame
/// the report layouts reason in; the writer flips coordinates when it emits
/// operators. Every page stays in memory until [`PdfDocument::finish`], so
/// earlier pages can be revisited with [`PdfDocument::switch_to_page`] to
/// stamp footers once the final page count is known.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pages: Vec<Page>,
    current: usize,
    font: Font,
    font_size: f32,
    fill: Color,
    stroke: Color,
    line_width: f32,
    title: Option<String>,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    /// Starts a document with one empty page.
    pub fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            current: 0,
            font: Font::Helvetica,
            font_size: 12.0,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            title: None,
        }
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Appends a page and makes it current.
    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.current = self.pages.len() - 1;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    /// Makes an already-created page current. Out-of-range indexes are ignored.
    pub fn switch_to_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.current = index;
        }
    }

    pub fn set_font(&mut self, font: Font, size: f32) -> &mut Self {
        self.font = font;
        self.font_size = size;
        self
    }

    /// Colour for fills and text.
    pub fn set_fill_color(&mut self, color: Color) -> &mut Self {
        self.fill = color;
        self
    }

    pub fn set_stroke_color(&mut self, color: Color) -> &mut Self {
        self.stroke = color;
        self
    }

    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.line_width = width;
        self
    }

    pub fn text_width(&self, text: &str) -> f32 {
        self.font.text_width(text, self.font_size)
    }

    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: Paint) {
        let mut ops = String::new();
        let _ = writeln!(ops, "q");
        if matches!(paint, Paint::Fill | Paint::FillStroke) {
            let _ = writeln!(ops, "{} rg", self.fill.operands());
        }
        if matches!(paint, Paint::Stroke | Paint::FillStroke) {
            let _ = writeln!(ops, "{} RG {} w", self.stroke.operands(), num(self.line_width));
        }
        let op = match paint {
            Paint::Fill => "f",
            Paint::Stroke => "S",
            Paint::FillStroke => "B",
        };
        let _ = writeln!(
            ops,
            "{} {} {} {} re {op}",
            num(x),
            num(PAGE_HEIGHT - y - h),
            num(w),
            num(h)
        );
        let _ = writeln!(ops, "Q");
        self.push(ops.as_bytes());
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let ops = format!(
            "q\n{} RG {} w\n{} {} m {} {} l S\nQ\n",
            self.stroke.operands(),
            num(self.line_width),
            num(x1),
            num(PAGE_HEIGHT - y1),
            num(x2),
            num(PAGE_HEIGHT - y2)
        );
        self.push(ops.as_bytes());
    }

    /// Draws a single line of text whose top edge sits at `y`.
    pub fn text(&mut self, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        let baseline = PAGE_HEIGHT - y - Font::ASCENDER * self.font_size;

        let mut out = format!(
            "BT\n{} rg\n/{} {} Tf\n{} {} Td\n(",
            self.fill.operands(),
            self.font.resource(),
            num(self.font_size),
            num(x),
            num(baseline)
        )
        .into_bytes();
        for byte in encode_win_ansi(text) {
            if matches!(byte, b'(' | b')' | b'\\') {
                out.push(b'\\');
            }
            out.push(byte);
        }
        out.extend_from_slice(b") Tj\nET\n");
        self.push(&out);
    }

    /// Draws text aligned inside a box of the given width. Text wider than
    /// the box starts at the box's left edge.
    pub fn text_in_box(&mut self, x: f32, y: f32, width: f32, align: Align, text: &str) {
        let slack = (width - self.text_width(text)).max(0.0);
        let offset = match align {
            Align::Left => 0.0,
            Align::Center => slack / 2.0,
            Align::Right => slack,
        };
        self.text(x + offset, y, text);
    }

    /// Text centred across the full page width.
    pub fn text_centered(&mut self, y: f32, text: &str) {
        self.text_in_box(0.0, y, PAGE_WIDTH, Align::Center, text);
    }

    /// Adds a clickable URI annotation over the given area.
    pub fn link(&mut self, x: f32, y: f32, w: f32, h: f32, uri: &str) {
        let rect = [x, PAGE_HEIGHT - y - h, x + w, PAGE_HEIGHT - y];
        self.pages[self.current].links.push(Link {
            rect,
            uri: uri.to_string(),
        });
    }

    fn push(&mut self, bytes: &[u8]) {
        self.pages[self.current].content.extend_from_slice(bytes);
    }

    /// Serialises the document into PDF 1.4 bytes.
    pub fn finish(self) -> Vec<u8> {
        let mut writer = ObjectWriter::new();

        // 1: catalog, 2: pages, 3..=5: fonts, 6: info, then per page
        // a page object, a content stream and one object per link.
        let font_ids: Vec<usize> = (3..3 + Font::ALL.len()).collect();
        let info_id = 3 + Font::ALL.len();
        let mut next_id = info_id + 1;

        let mut page_ids = Vec::with_capacity(self.pages.len());
        let mut layout = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let page_id = next_id;
            let content_id = next_id + 1;
            let link_ids: Vec<usize> = (0..page.links.len()).map(|i| content_id + 1 + i).collect();
            next_id = content_id + 1 + page.links.len();
            page_ids.push(page_id);
            layout.push((page_id, content_id, link_ids));
        }

        writer.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
        writer.object(
            2,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_ids.len()
            )
            .as_bytes(),
        );

        for (font, id) in Font::ALL.iter().zip(&font_ids) {
            writer.object(
                *id,
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    font.base_name()
                )
                .as_bytes(),
            );
        }

        let mut info = b"<< /Producer (AURA Studio)".to_vec();
        if let Some(title) = &self.title {
            info.extend_from_slice(b" /Title (");
            info.extend(escape_literal(&encode_win_ansi(title)));
            info.push(b')');
        }
        info.extend_from_slice(b" >>");
        writer.object(info_id, &info);

        let font_resources: Vec<String> = Font::ALL
            .iter()
            .zip(&font_ids)
            .map(|(font, id)| format!("/{} {id} 0 R", font.resource()))
            .collect();
        let font_resources = font_resources.join(" ");

        for (page, (page_id, content_id, link_ids)) in self.pages.iter().zip(&layout) {
            let annots = if link_ids.is_empty() {
                String::new()
            } else {
                let refs: Vec<String> = link_ids.iter().map(|id| format!("{id} 0 R")).collect();
                format!(" /Annots [{}]", refs.join(" "))
            };
            writer.object(
                *page_id,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << {font_resources} >> >> /Contents {content_id} 0 R{annots} >>",
                    num(PAGE_WIDTH),
                    num(PAGE_HEIGHT)
                )
                .as_bytes(),
            );

            writer.stream(*content_id, &page.content);

            for (link, id) in page.links.iter().zip(link_ids) {
                let mut annot = format!(
                    "<< /Type /Annot /Subtype /Link /Border [0 0 0] /Rect [{} {} {} {}] /A << /S /URI /URI (",
                    num(link.rect[0]),
                    num(link.rect[1]),
                    num(link.rect[2]),
                    num(link.rect[3])
                )
                .into_bytes();
                annot.extend(escape_literal(link.uri.as_bytes()));
                annot.extend_from_slice(b") >> >>");
                writer.object(*id, &annot);
            }
        }

        writer.finish(next_id, info_id)
    }
}

/// Tracks byte offsets of numbered objects for the cross-reference table.
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl ObjectWriter {
    fn new() -> Self {
        let mut buf = b"%PDF-1.4\n".to_vec();
        // Binary marker so transfer tools treat the file as binary.
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, data: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self, size: usize, info_id: usize) -> Vec<u8> {
        self.offsets.sort_by_key(|(id, _)| *id);

        let xref_offset = self.buf.len();
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        let mut expected = 1;
        for (id, offset) in &self.offsets {
            // Unused ids between objects are written as free entries.
            while expected < *id {
                xref.push_str("0000000000 65535 f \n");
                expected += 1;
            }
            let _ = writeln!(xref, "{offset:010} 00000 n ");
            expected += 1;
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

fn escape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &byte in bytes {
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

/// Compact decimal formatting for content-stream operands.
fn num(v: f32) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
