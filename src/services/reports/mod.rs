//! Report layouts rendered with the in-house PDF writer.

pub mod availability;
pub mod calendar;
pub mod invoice;

use crate::services::pdf::Color;

pub const BRAND_BROWN: Color = Color(0x8B, 0x6E, 0x55);
pub const BRAND_CREAM: Color = Color(0xEF, 0xE9, 0xE1);
pub const DARK_TEXT: Color = Color(0x50, 0x3C, 0x2D);
pub const LIGHT_GRAY: Color = Color(0x78, 0x78, 0x78);
pub const ROW_TEXT: Color = Color(0x32, 0x32, 0x32);
pub const ROW_ALT: Color = Color(0xFA, 0xF8, 0xF5);

/// Alternating row background, starting with white.
pub fn row_background(index: usize) -> Color {
    if index % 2 == 0 {
        Color::WHITE
    } else {
        ROW_ALT
    }
}

/// Formats a stored studio number (`527151596586`) the way it is printed
/// on flyers: country code dropped, grouped 3-3-4.
pub fn display_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let local = match digits.len() {
        12 if digits.starts_with("52") => &digits[2..],
        _ => digits.as_str(),
    };
    if local.len() == 10 {
        format!("{} {} {}", &local[..3], &local[3..6], &local[6..])
    } else {
        raw.to_string()
    }
}
