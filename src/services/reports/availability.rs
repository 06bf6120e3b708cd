use chrono::{Datelike, NaiveDate};

use super::{display_phone, row_background, BRAND_BROWN, BRAND_CREAM, DARK_TEXT, LIGHT_GRAY, ROW_TEXT};
use crate::models::reservation::MONTH_NAMES;
use crate::models::{AvailabilityDay, AvailabilityExportRequest, Slot, SlotLevel};
use crate::services::pdf::{Align, Color, Flow, Font, Paint, PdfDocument, PAGE_WIDTH};

pub const FILENAME: &str = "Disponibilidad.pdf";
pub const WEBSITE: &str = "aurapilates.app";
const ADDRESS: &str = "Amado Nervo #38, Zitácuaro, Mich.";

const LEFT: f32 = 40.0;
const WIDTH: f32 = 532.0;
const TOP: f32 = 50.0;
const DAYS_PER_PAGE: usize = 10;
const DAY_HEADER_HEIGHT: f32 = 25.0;
const COLUMN_HEADER_HEIGHT: f32 = 18.0;
const ROW_HEIGHT: f32 = 20.0;
/// Lowest y a day block may reach before it is moved to the next page.
const BOTTOM: f32 = 752.0;
const LEGEND_BREAK: f32 = 650.0;
const CONTACT_BREAK: f32 = 680.0;

const AVAILABLE_COLOR: Color = Color(0xD4, 0xF1, 0xD4);
const URGENT_COLOR: Color = Color(0xFF, 0xE4, 0xB5);
const FULL_COLOR: Color = Color(0xE0, 0xE0, 0xE0);

pub fn level_color(level: SlotLevel) -> Color {
    match level {
        SlotLevel::Available => AVAILABLE_COLOR,
        SlotLevel::Urgent => URGENT_COLOR,
        SlotLevel::Full => FULL_COLOR,
    }
}

/// Builds the printable grid of open class times for a date range.
pub fn build_availability(request: &AvailabilityExportRequest, studio_phone: &str) -> PdfDocument {
    let phone = display_phone(studio_phone);
    let mut doc = PdfDocument::new();
    doc.set_title("Horarios Disponibles");

    draw_title(&mut doc, request, &phone);

    let mut flow = Flow::new(185.0, TOP);
    for (i, day) in request.availability.iter().enumerate() {
        let block = block_height(day);
        let page_full = i > 0 && i % DAYS_PER_PAGE == 0;
        if page_full || (flow.y + block > BOTTOM && flow.y > flow.top()) {
            flow.new_page(&mut doc);
        }
        draw_day(&mut doc, &mut flow, day);
        flow.advance(5.0);
    }

    if !flow.break_if_past(&mut doc, LEGEND_BREAK) {
        flow.advance(20.0);
    }
    draw_legend(&mut doc, &mut flow, request.max_capacity.unwrap_or(5));

    if !flow.break_if_past(&mut doc, CONTACT_BREAK) {
        flow.advance(30.0);
    }
    draw_contact(&mut doc, &mut flow, &phone);

    doc
}

pub fn render_availability(request: &AvailabilityExportRequest, studio_phone: &str) -> Vec<u8> {
    build_availability(request, studio_phone).finish()
}

fn block_height(day: &AvailabilityDay) -> f32 {
    let rows = day.morning.len().max(day.afternoon.len());
    DAY_HEADER_HEIGHT + COLUMN_HEADER_HEIGHT + rows as f32 * ROW_HEIGHT
}

/// Parses the leading `YYYY-MM-DD` of a date or timestamp string.
fn parse_date(s: &str) -> Option<NaiveDate> {
    s.trim()
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn month_lower(date: NaiveDate) -> String {
    MONTH_NAMES[date.month0() as usize].to_lowercase()
}

/// "marzo de 2025"
pub fn month_and_year(date: &str) -> String {
    match parse_date(date) {
        Some(d) => format!("{} de {}", month_lower(d), d.year()),
        None => date.to_string(),
    }
}

/// "(Del 1 de marzo al 15 de marzo)"
pub fn range_caption(start: &str, end: &str) -> String {
    match (parse_date(start), parse_date(end)) {
        (Some(s), Some(e)) => format!(
            "(Del {} de {} al {} de {})",
            s.day(),
            month_lower(s),
            e.day(),
            month_lower(e)
        ),
        _ => String::new(),
    }
}

fn draw_title(doc: &mut PdfDocument, request: &AvailabilityExportRequest, phone: &str) {
    doc.set_font(Font::HelveticaBold, 28.0).set_fill_color(BRAND_BROWN);
    doc.text_centered(80.0, "AURA STUDIO");

    doc.set_font(Font::Helvetica, 16.0).set_fill_color(DARK_TEXT);
    doc.text_centered(
        110.0,
        &format!(
            "Horarios Disponibles - {} / {}",
            month_and_year(&request.start_date),
            month_and_year(&request.end_date)
        ),
    );

    doc.set_font(Font::Helvetica, 12.0).set_fill_color(LIGHT_GRAY);
    doc.text_centered(130.0, &range_caption(&request.start_date, &request.end_date));

    doc.set_font(Font::HelveticaOblique, 10.0).set_fill_color(DARK_TEXT);
    doc.text_centered(
        150.0,
        &format!("Pilates a tu medida • {ADDRESS} • Tel: {phone}"),
    );

    doc.set_stroke_color(BRAND_BROWN).set_line_width(1.5);
    doc.line(LEFT, 170.0, LEFT + WIDTH, 170.0);
}

fn draw_day(doc: &mut PdfDocument, flow: &mut Flow, day: &AvailabilityDay) {
    doc.set_fill_color(BRAND_CREAM)
        .set_stroke_color(BRAND_BROWN)
        .set_line_width(1.0);
    doc.rect(LEFT, flow.y, WIDTH, DAY_HEADER_HEIGHT, Paint::FillStroke);
    doc.set_font(Font::HelveticaBold, 11.0).set_fill_color(DARK_TEXT);
    doc.text(45.0, flow.y + 7.0, &day.header());
    flow.advance(DAY_HEADER_HEIGHT);

    doc.set_fill_color(BRAND_BROWN).set_stroke_color(BRAND_BROWN);
    doc.rect(LEFT, flow.y, WIDTH, COLUMN_HEADER_HEIGHT, Paint::FillStroke);
    doc.set_font(Font::HelveticaBold, 9.0).set_fill_color(Color::WHITE);
    doc.text_in_box(100.0, flow.y + 5.0, 236.0, Align::Center, "Mañana (6:00 - 11:00)");
    doc.text_in_box(336.0, flow.y + 5.0, 236.0, Align::Center, "Tarde (17:00 - 20:00)");
    flow.advance(COLUMN_HEADER_HEIGHT);

    for (row, (morning, afternoon)) in day.rows().enumerate() {
        doc.set_fill_color(row_background(row)).set_stroke_color(BRAND_BROWN);
        doc.rect(LEFT, flow.y, WIDTH, ROW_HEIGHT, Paint::FillStroke);

        if let Some(slot) = morning {
            draw_slot(doc, 105.0, flow.y, slot);
        }
        if let Some(slot) = afternoon {
            draw_slot(doc, 341.0, flow.y, slot);
        }
        flow.advance(ROW_HEIGHT);
    }
}

fn draw_slot(doc: &mut PdfDocument, x: f32, y: f32, slot: &Slot) {
    doc.set_fill_color(level_color(slot.level()))
        .set_stroke_color(BRAND_BROWN);
    doc.rect(x, y + 4.0, 12.0, 12.0, Paint::FillStroke);

    doc.set_font(Font::Helvetica, 8.0).set_fill_color(ROW_TEXT);
    doc.text_in_box(x + 17.0, y + 5.0, 206.0, Align::Left, &slot.label());
}

fn draw_legend(doc: &mut PdfDocument, flow: &mut Flow, max_capacity: u32) {
    doc.set_font(Font::HelveticaBold, 14.0).set_fill_color(DARK_TEXT);
    doc.text(LEFT, flow.y, "Leyenda:");
    flow.advance(25.0);

    let items = [
        (AVAILABLE_COLOR, format!("{max_capacity} - 3 cupos disponibles")),
        (URGENT_COLOR, "2 - 1 cupo disponible (¡último lugar!)".to_string()),
        (
            FULL_COLOR,
            format!("Completo = Horario lleno (máx. {max_capacity} personas)"),
        ),
    ];
    for (color, label) in items {
        doc.set_fill_color(color).set_stroke_color(BRAND_BROWN);
        doc.rect(LEFT, flow.y, 20.0, 15.0, Paint::FillStroke);
        doc.set_font(Font::Helvetica, 10.0).set_fill_color(ROW_TEXT);
        doc.text(70.0, flow.y + 3.0, &label);
        flow.advance(25.0);
    }
}

fn draw_contact(doc: &mut PdfDocument, flow: &mut Flow, phone: &str) {
    doc.set_font(Font::HelveticaBold, 11.0).set_fill_color(DARK_TEXT);
    doc.text_centered(flow.y, "Reservas online:");
    flow.advance(20.0);

    doc.set_font(Font::Helvetica, 10.0).set_fill_color(BRAND_BROWN);
    doc.text_centered(flow.y, WEBSITE);
    let width = doc.text_width(WEBSITE);
    doc.link((PAGE_WIDTH - width) / 2.0, flow.y, width, 12.0, &format!("https://{WEBSITE}"));
    flow.advance(20.0);

    doc.set_fill_color(DARK_TEXT);
    doc.text_centered(flow.y, &format!("WhatsApp: {phone}"));
}
