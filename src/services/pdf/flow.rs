use super::document::PdfDocument;

/// Vertical cursor for top-to-bottom report layout.
///
/// Layouts draw at `y`, advance it, and call [`Flow::break_if_past`] before
/// each block; once the cursor has passed the threshold a new page is added
/// and the cursor returns to `top`.
#[derive(Debug, Clone, Copy)]
pub struct Flow {
    pub y: f32,
    top: f32,
}

impl Flow {
    pub fn new(start: f32, top: f32) -> Self {
        Self { y: start, top }
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    /// Starts a new page when the cursor is strictly below `threshold`.
    /// Returns whether a page was added.
    pub fn break_if_past(&mut self, doc: &mut PdfDocument, threshold: f32) -> bool {
        if self.y > threshold {
            self.new_page(doc);
            true
        } else {
            false
        }
    }

    pub fn new_page(&mut self, doc: &mut PdfDocument) {
        doc.add_page();
        self.y = self.top;
    }
}

/// Revisits every buffered page once the total is known and lets `stamp`
/// draw on it. `stamp` receives the zero-based page index and the count.
pub fn stamp_pages<F>(doc: &mut PdfDocument, mut stamp: F)
where
    F: FnMut(&mut PdfDocument, usize, usize),
{
    let total = doc.page_count();
    for index in 0..total {
        doc.switch_to_page(index);
        stamp(doc, index, total);
    }
}
