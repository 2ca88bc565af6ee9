//! Text measurement collaborator.
//!
//! The engine never measures text itself. Node sizes come from a
//! [`TextMeasurer`] supplied by the host; [`MonospaceMeasurer`] is a
//! font-free implementation for headless use and tests.

#[cfg(test)]
#[path = "measure_test.rs"]
mod measure_test;

use crate::consts::{DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};
use crate::store::Style;

/// A measured box in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Content-driven sizing for node text.
pub trait TextMeasurer {
    /// Natural size of `text` laid out without a width limit.
    fn measure(&self, text: &str, style: Option<&Style>) -> Size;

    /// Size of `text` wrapped to `max_width`. The returned width is `max_width`.
    fn reflow(&self, text: &str, max_width: f64, style: Option<&Style>) -> Size;
}

/// Fixed-pitch measurer: every character is `char_width` wide.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    pub char_width: f64,
    pub line_height: f64,
    /// Inner padding on every side.
    pub padding: f64,
    /// Font size the metrics above are given for; a `fontSize` style scales them.
    pub base_font_size: f64,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self { char_width: 8.0, line_height: 20.0, padding: 10.0, base_font_size: 16.0 }
    }
}

impl MonospaceMeasurer {
    fn scale(&self, style: Option<&Style>) -> f64 {
        style
            .and_then(|s| s.get("fontSize"))
            .and_then(serde_json::Value::as_f64)
            .filter(|f| f.is_finite() && *f > 0.0)
            .map_or(1.0, |f| f / self.base_font_size)
    }

    fn height_for(&self, lines: usize, scale: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let lines = lines.max(1) as f64;
        (lines * self.line_height * scale + 2.0 * self.padding).max(DEFAULT_NODE_HEIGHT)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, style: Option<&Style>) -> Size {
        let scale = self.scale(style);
        let lines: Vec<&str> = text.split('\n').collect();
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let content = widest as f64 * self.char_width * scale;
        let width = (content + 2.0 * self.padding).max(DEFAULT_NODE_WIDTH);
        Size::new(width, self.height_for(lines.len(), scale))
    }

    fn reflow(&self, text: &str, max_width: f64, style: Option<&Style>) -> Size {
        let scale = self.scale(style);
        let inner = (max_width - 2.0 * self.padding).max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let per_line = ((inner / (self.char_width * scale)).floor() as usize).max(1);
        let lines: usize = text.split('\n').map(|p| wrap_paragraph(p, per_line)).sum();
        Size::new(max_width, self.height_for(lines, scale))
    }
}

/// Number of lines greedy word wrap needs for `paragraph` at `per_line` columns.
/// Words longer than a line are broken across lines.
fn wrap_paragraph(paragraph: &str, per_line: usize) -> usize {
    let mut lines = 1;
    let mut used = 0;
    for word in paragraph.split_whitespace() {
        let mut len = word.chars().count();
        let needed = if used == 0 { len } else { used + 1 + len };
        if needed <= per_line {
            used = needed;
            continue;
        }
        if used > 0 {
            lines += 1;
        }
        while len > per_line {
            len -= per_line;
            lines += 1;
        }
        used = len;
    }
    lines
}
