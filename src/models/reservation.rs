use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DAY_NAMES: [&str; 7] = [
    "Domingo", "Lunes", "Martes", "Miércoles", "Jueves", "Viernes", "Sábado",
];

pub const MONTH_NAMES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto", "Septiembre",
    "Octubre", "Noviembre", "Diciembre",
];

/// A single booked class as sent by the admin calendar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct CalendarExportRequest {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

/// Groups reservations by their `date` key. Keys iterate in ascending order,
/// which for `YYYY-MM-DD` strings is chronological.
pub fn group_by_date(reservations: &[Reservation]) -> BTreeMap<&str, Vec<&Reservation>> {
    let mut grouped: BTreeMap<&str, Vec<&Reservation>> = BTreeMap::new();
    for reservation in reservations {
        grouped
            .entry(reservation.date.as_str())
            .or_default()
            .push(reservation);
    }
    grouped
}

/// "Lunes, 3 de Marzo de 2025". Unparseable dates are returned verbatim.
pub fn format_spanish_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(d) => {
            let day_name = DAY_NAMES[d.weekday().num_days_from_sunday() as usize];
            let month = MONTH_NAMES[d.month0() as usize];
            format!("{day_name}, {} de {month} de {}", d.day(), d.year())
        }
        Err(_) => date.to_string(),
    }
}

/// Character-based truncation; byte slicing would split accented letters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
