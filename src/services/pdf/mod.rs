//! Minimal PDF generation for the studio and market reports.

pub mod document;
pub mod flow;
pub mod fonts;

pub use document::{Align, Color, Paint, PdfDocument, PAGE_HEIGHT, PAGE_WIDTH};
pub use flow::{stamp_pages, Flow};
pub use fonts::Font;
