use crate::models::invoice::format_money;
use crate::models::reservation::truncate_chars;
use crate::models::Invoice;
use crate::services::pdf::{Align, Color, Flow, Font, Paint, PdfDocument, PAGE_HEIGHT, PAGE_WIDTH};

const MARKET_GREEN: Color = Color(29, 132, 69);
const MARKET_RED: Color = Color(212, 84, 56);
const FOOTER_GRAY: Color = Color(100, 100, 100);

/// The receipt is laid out in millimetres and converted to points here.
fn mm(v: f32) -> f32 {
    v * 72.0 / 25.4
}

const COLUMNS: [(&str, f32); 5] = [
    ("UPC", 25.0),
    ("Descripcion", 80.0),
    ("Cant.", 20.0),
    ("Precio", 25.0),
    ("Total", 30.0),
];

#[derive(Clone, Copy)]
struct CellStyle {
    font: Font,
    size: f32,
    color: Color,
    fill: Option<Color>,
    border: bool,
}

impl CellStyle {
    const fn plain(font: Font, size: f32, color: Color) -> Self {
        Self {
            font,
            size,
            color,
            fill: None,
            border: false,
        }
    }

    const fn framed(self) -> Self {
        Self {
            border: true,
            ..self
        }
    }

    const fn filled(self, fill: Color) -> Self {
        Self {
            fill: Some(fill),
            ..self
        }
    }
}

/// A single-line box with optional background and frame; text is centred
/// vertically and padded 1mm horizontally.
fn cell(doc: &mut PdfDocument, x: f32, y: f32, w: f32, h: f32, text: &str, align: Align, style: CellStyle) {
    doc.set_stroke_color(Color::BLACK).set_line_width(0.57);
    match (style.fill, style.border) {
        (Some(fill), true) => {
            doc.set_fill_color(fill);
            doc.rect(x, y, w, h, Paint::FillStroke);
        }
        (Some(fill), false) => {
            doc.set_fill_color(fill);
            doc.rect(x, y, w, h, Paint::Fill);
        }
        (None, true) => doc.rect(x, y, w, h, Paint::Stroke),
        (None, false) => {}
    }

    doc.set_font(style.font, style.size).set_fill_color(style.color);
    let top = y + (h - Font::ASCENDER * style.size) / 2.0;
    let padding = mm(1.0);
    doc.text_in_box(x + padding, top, w - 2.0 * padding, align, text);
}

pub fn invoice_number(factura_id: i64) -> String {
    format!("{factura_id:06}")
}

/// Renders the market receipt for a stored invoice.
pub fn build_invoice(factura_id: i64, invoice: &Invoice) -> PdfDocument {
    let left = mm(10.0);
    let full_width = PAGE_WIDTH - 2.0 * left;
    let page_bottom = PAGE_HEIGHT - mm(20.0);

    let mut doc = PdfDocument::new();
    doc.set_title(&format!("Factura {}", invoice_number(factura_id)));
    let mut flow = Flow::new(mm(10.0), mm(10.0));

    let black = Color::BLACK;
    cell(
        &mut doc,
        left,
        flow.y,
        full_width,
        mm(10.0),
        "EL MEXIQUENSE MARKET",
        Align::Center,
        CellStyle::plain(Font::HelveticaBold, 20.0, MARKET_GREEN),
    );
    flow.advance(mm(10.0));
    cell(
        &mut doc,
        left,
        flow.y,
        full_width,
        mm(6.0),
        "Sistema de Facturacion",
        Align::Center,
        CellStyle::plain(Font::Helvetica, 12.0, black),
    );
    flow.advance(mm(11.0));

    let info = [
        (
            format!("FACTURA #{}", invoice_number(factura_id)),
            CellStyle::plain(Font::HelveticaBold, 12.0, black),
            6.0,
        ),
        (
            format!("Fecha: {}", invoice.fecha.format("%d/%m/%Y")),
            CellStyle::plain(Font::Helvetica, 10.0, black),
            5.0,
        ),
        (
            format!("Cliente: {}", invoice.cliente),
            CellStyle::plain(Font::Helvetica, 10.0, black),
            5.0,
        ),
    ];
    for (text, style, height) in info {
        cell(&mut doc, left, flow.y, full_width, mm(height), &text, Align::Left, style);
        flow.advance(mm(height));
    }
    flow.advance(mm(5.0));

    draw_table_header(&mut doc, left, flow.y);
    flow.advance(mm(7.0));

    let row_height = mm(6.0);
    let row_style = CellStyle::plain(Font::Helvetica, 9.0, black).framed();
    for line in &invoice.lines {
        if flow.break_if_past(&mut doc, page_bottom - row_height) {
            draw_table_header(&mut doc, left, flow.y);
            flow.advance(mm(7.0));
        }

        let values = [
            (truncate_chars(&line.upc, 12), Align::Left),
            (truncate_chars(&line.descripcion, 40), Align::Left),
            (format_money(line.cantidad), Align::Center),
            (format!("${}", format_money(line.precio)), Align::Right),
            (format!("${}", format_money(line.total)), Align::Right),
        ];
        let mut x = left;
        for ((text, align), (_, width)) in values.iter().zip(COLUMNS) {
            cell(&mut doc, x, flow.y, mm(width), row_height, text, *align, row_style);
            x += mm(width);
        }
        flow.advance(row_height);
    }
    flow.advance(mm(5.0));

    let has_credits = invoice.creditos > rust_decimal::Decimal::ZERO;
    let totals_height = mm(6.0 + if has_credits { 6.0 } else { 0.0 } + 8.0 + 10.0 + 10.0);
    flow.break_if_past(&mut doc, page_bottom - totals_height);

    let label_x = left + mm(130.0);
    let value_x = label_x + mm(25.0);
    let total_row = |doc: &mut PdfDocument, flow: &mut Flow, label: &str, value: String, style: CellStyle, h: f32| {
        cell(doc, label_x, flow.y, mm(25.0), mm(h), label, Align::Right, style);
        cell(doc, value_x, flow.y, mm(30.0), mm(h), &value, Align::Right, style);
        flow.advance(mm(h));
    };

    total_row(
        &mut doc,
        &mut flow,
        "Subtotal:",
        format!("${}", format_money(invoice.subtotal)),
        CellStyle::plain(Font::HelveticaBold, 11.0, black),
        6.0,
    );
    if has_credits {
        total_row(
            &mut doc,
            &mut flow,
            "Creditos:",
            format!("-${}", format_money(invoice.creditos)),
            CellStyle::plain(Font::HelveticaBold, 11.0, MARKET_GREEN),
            6.0,
        );
    }
    total_row(
        &mut doc,
        &mut flow,
        "TOTAL:",
        format!("${}", format_money(invoice.total)),
        CellStyle::plain(Font::HelveticaBold, 14.0, MARKET_RED),
        8.0,
    );
    flow.advance(mm(10.0));

    let footer = CellStyle::plain(Font::HelveticaOblique, 8.0, FOOTER_GRAY);
    for text in [
        "Gracias por su compra - El Mexiquense Market",
        "Sistema de Facturacion v1.0",
    ] {
        cell(&mut doc, left, flow.y, full_width, mm(5.0), text, Align::Center, footer);
        flow.advance(mm(5.0));
    }

    doc
}

pub fn render_invoice(factura_id: i64, invoice: &Invoice) -> Vec<u8> {
    build_invoice(factura_id, invoice).finish()
}

fn draw_table_header(doc: &mut PdfDocument, left: f32, y: f32) {
    let style = CellStyle::plain(Font::HelveticaBold, 10.0, Color::WHITE)
        .framed()
        .filled(MARKET_GREEN);
    let mut x = left;
    for (label, width) in COLUMNS {
        cell(doc, x, y, mm(width), mm(7.0), label, Align::Center, style);
        x += mm(width);
    }
}
