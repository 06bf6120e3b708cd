use chrono::NaiveDateTime;

use super::{row_background, BRAND_BROWN, BRAND_CREAM, DARK_TEXT, LIGHT_GRAY, ROW_TEXT};
use crate::models::reservation::{format_spanish_date, group_by_date, truncate_chars};
use crate::models::Reservation;
use crate::services::pdf::{stamp_pages, Align, Color, Flow, Font, Paint, PdfDocument};

const LEFT: f32 = 50.0;
const TABLE_WIDTH: f32 = 512.0;
const TOP: f32 = 50.0;
/// A new date block starts on a fresh page past this line.
const DATE_BREAK: f32 = 680.0;
/// A reservation row starts on a fresh page past this line.
const ROW_BREAK: f32 = 720.0;
const ROW_HEIGHT: f32 = 18.0;
const HEADER_HEIGHT: f32 = 20.0;
const FOOTER_LINE: f32 = 742.0;

const COLUMNS: [(&str, f32, f32); 4] = [
    ("Hora", 50.0, 70.0),
    ("Cliente", 120.0, 200.0),
    ("Teléfono", 320.0, 120.0),
    ("Notas", 440.0, 122.0),
];

/// Builds the reservation calendar: one card and table per date, a period
/// summary, and a footer with page numbers on every page.
pub fn build_calendar(reservations: &[Reservation], generated_at: NaiveDateTime) -> PdfDocument {
    let mut doc = PdfDocument::new();
    doc.set_title("Calendario de Reservaciones");

    draw_title(&mut doc, generated_at);

    let by_date = group_by_date(reservations);
    let mut flow = Flow::new(145.0, TOP);

    for (date, day_reservations) in &by_date {
        flow.break_if_past(&mut doc, DATE_BREAK);

        doc.set_fill_color(BRAND_CREAM)
            .set_stroke_color(BRAND_BROWN)
            .set_line_width(1.0);
        doc.rect(LEFT, flow.y, TABLE_WIDTH, 30.0, Paint::FillStroke);
        doc.set_font(Font::HelveticaBold, 12.0).set_fill_color(DARK_TEXT);
        doc.text_in_box(LEFT, flow.y + 10.0, TABLE_WIDTH, Align::Center, &format_spanish_date(date));
        flow.advance(35.0);

        draw_table_header(&mut doc, flow.y);
        flow.advance(HEADER_HEIGHT);

        for (idx, reservation) in day_reservations.iter().enumerate() {
            if flow.break_if_past(&mut doc, ROW_BREAK) {
                draw_table_header(&mut doc, flow.y);
                flow.advance(HEADER_HEIGHT);
            }
            draw_row(&mut doc, flow.y, idx, reservation);
            flow.advance(ROW_HEIGHT);
        }

        flow.advance(15.0);
    }

    flow.break_if_past(&mut doc, DATE_BREAK);
    flow.advance(10.0);
    draw_summary(&mut doc, flow.y, reservations.len(), by_date.len());

    stamp_pages(&mut doc, draw_footer);
    doc
}

pub fn render_calendar(reservations: &[Reservation], generated_at: NaiveDateTime) -> Vec<u8> {
    build_calendar(reservations, generated_at).finish()
}

/// `calendario_reservas_aura_2025-03-01_093005`
pub fn calendar_stem(generated_at: NaiveDateTime) -> String {
    format!(
        "calendario_reservas_aura_{}",
        generated_at.format("%Y-%m-%d_%H%M%S")
    )
}

pub fn calendar_filename(generated_at: NaiveDateTime) -> String {
    format!("{}.pdf", calendar_stem(generated_at))
}

fn draw_title(doc: &mut PdfDocument, generated_at: NaiveDateTime) {
    doc.set_font(Font::HelveticaBold, 24.0).set_fill_color(BRAND_BROWN);
    doc.text_centered(50.0, "AURA STUDIO");

    doc.set_font(Font::Helvetica, 14.0)
        .set_fill_color(Color(0x64, 0x64, 0x64));
    doc.text_centered(80.0, "Calendario de Reservaciones");

    doc.set_font(Font::HelveticaOblique, 9.0).set_fill_color(LIGHT_GRAY);
    doc.text_centered(
        105.0,
        &format!("Generado el {}", generated_at.format("%d/%m/%Y %H:%M")),
    );

    doc.set_stroke_color(BRAND_BROWN).set_line_width(1.5);
    doc.line(LEFT, 125.0, LEFT + TABLE_WIDTH, 125.0);
}

fn draw_table_header(doc: &mut PdfDocument, y: f32) {
    doc.set_fill_color(BRAND_BROWN)
        .set_stroke_color(BRAND_BROWN)
        .set_line_width(1.0);
    doc.rect(LEFT, y, TABLE_WIDTH, HEADER_HEIGHT, Paint::FillStroke);

    doc.set_font(Font::HelveticaBold, 10.0).set_fill_color(Color::WHITE);
    for (label, x, width) in COLUMNS {
        doc.text_in_box(x, y + 5.0, width, Align::Center, label);
    }
}

fn draw_row(doc: &mut PdfDocument, y: f32, idx: usize, reservation: &Reservation) {
    doc.set_fill_color(row_background(idx))
        .set_stroke_color(BRAND_BROWN)
        .set_line_width(1.0);
    doc.rect(LEFT, y, TABLE_WIDTH, ROW_HEIGHT, Paint::FillStroke);

    doc.set_font(Font::Helvetica, 9.0).set_fill_color(ROW_TEXT);
    let [time, name, phone, notes] = COLUMNS;
    doc.text_in_box(time.1, y + 4.0, time.2, Align::Center, &reservation.time);
    doc.text_in_box(
        name.1 + 5.0,
        y + 4.0,
        name.2 - 10.0,
        Align::Left,
        &truncate_chars(&reservation.name, 35),
    );
    doc.text_in_box(phone.1, y + 4.0, phone.2, Align::Center, &reservation.phone);
    doc.text_in_box(
        notes.1 + 5.0,
        y + 4.0,
        notes.2 - 10.0,
        Align::Left,
        &truncate_chars(&reservation.notes, 25),
    );
}

fn draw_summary(doc: &mut PdfDocument, y: f32, total_reservations: usize, total_days: usize) {
    doc.set_fill_color(BRAND_CREAM)
        .set_stroke_color(BRAND_BROWN)
        .set_line_width(1.0);
    doc.rect(LEFT, y, TABLE_WIDTH, 50.0, Paint::FillStroke);

    doc.set_font(Font::HelveticaBold, 12.0).set_fill_color(DARK_TEXT);
    doc.text_in_box(LEFT, y + 10.0, TABLE_WIDTH, Align::Center, "Resumen del Periodo");

    doc.set_font(Font::Helvetica, 10.0)
        .set_fill_color(Color(0x3C, 0x3C, 0x3C));
    doc.text_in_box(
        LEFT,
        y + 28.0,
        TABLE_WIDTH,
        Align::Center,
        &format!("Total de Reservaciones: {total_reservations}"),
    );
    doc.text_in_box(
        LEFT,
        y + 43.0,
        TABLE_WIDTH,
        Align::Center,
        &format!("Total de Días con Reservaciones: {total_days}"),
    );
}

fn draw_footer(doc: &mut PdfDocument, index: usize, total: usize) {
    doc.set_stroke_color(BRAND_BROWN).set_line_width(1.5);
    doc.line(LEFT, FOOTER_LINE, LEFT + TABLE_WIDTH, FOOTER_LINE);

    doc.set_font(Font::HelveticaOblique, 8.0).set_fill_color(LIGHT_GRAY);
    doc.text_in_box(
        LEFT,
        750.0,
        TABLE_WIDTH,
        Align::Center,
        "AURA Studio - Sistema de Gestión de Reservaciones",
    );

    doc.set_font(Font::Helvetica, 8.0);
    doc.text_in_box(
        LEFT,
        760.0,
        TABLE_WIDTH,
        Align::Center,
        &format!("Página {} de {total}", index + 1),
    );
}
