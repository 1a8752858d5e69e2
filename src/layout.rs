//! Text-layout measurement seam.
//!
//! Mapping a token index to a pixel position requires knowing how the
//! embedding UI lays the script out. The engine only needs two
//! measurements, expressed as a trait so the presentation layer can plug in
//! real text metrics. [`UniformLayout`] is the reference implementation used
//! by the simulator and tests.

use crate::script::ScriptIndex;

/// Measures the rendered script: offset-to-pixel mapping and total extent.
pub trait ScrollLayout: Send {
    /// Vertical pixel position of the line containing the given byte offset.
    fn pixel_for_offset(&self, script: &ScriptIndex, byte_offset: usize) -> f64;

    /// Maximum scrollable extent of the rendered script in pixels.
    fn max_extent(&self, script: &ScriptIndex) -> f64;

    /// Average pixels a single token occupies, used to convert speaking rate
    /// into scroll speed. Derived from the extent by default.
    fn px_per_token(&self, script: &ScriptIndex) -> f64 {
        let tokens = script.token_count();
        if tokens == 0 {
            return 0.0;
        }
        self.max_extent(script) / tokens as f64
    }
}

/// Fixed-width line-wrap approximation of text layout.
///
/// Assumes a monospace-like rendering: `chars_per_line` characters fit on a
/// line, every line is `line_height_px` tall.
#[derive(Debug, Clone)]
pub struct UniformLayout {
    pub chars_per_line: usize,
    pub line_height_px: f64,
}

impl Default for UniformLayout {
    fn default() -> Self {
        Self {
            chars_per_line: 40,
            line_height_px: 48.0,
        }
    }
}

impl ScrollLayout for UniformLayout {
    fn pixel_for_offset(&self, script: &ScriptIndex, byte_offset: usize) -> f64 {
        // Offsets are byte positions into the text; lines wrap on character
        // counts, which differ for multi-byte scripts
        let chars_before = script
            .text()
            .char_indices()
            .take_while(|(i, _)| *i < byte_offset)
            .count();
        let line = chars_before / self.chars_per_line.max(1);
        line as f64 * self.line_height_px
    }

    fn max_extent(&self, script: &ScriptIndex) -> f64 {
        let chars = script.text().chars().count();
        if chars == 0 {
            return 0.0;
        }
        let lines = chars.div_ceil(self.chars_per_line.max(1));
        lines as f64 * self.line_height_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_line_mapping() {
        let layout = UniformLayout {
            chars_per_line: 10,
            line_height_px: 20.0,
        };
        let script = ScriptIndex::build("0123456789 0123456789 0123456789");

        assert_eq!(layout.pixel_for_offset(&script, 0), 0.0);
        assert_eq!(layout.pixel_for_offset(&script, 9), 0.0);
        assert_eq!(layout.pixel_for_offset(&script, 10), 20.0);
        assert_eq!(layout.pixel_for_offset(&script, 25), 40.0);
    }

    #[test]
    fn test_uniform_layout_extent() {
        let layout = UniformLayout {
            chars_per_line: 10,
            line_height_px: 20.0,
        };
        // 32 chars -> 4 lines
        let script = ScriptIndex::build("0123456789 0123456789 0123456789");
        assert_eq!(layout.max_extent(&script), 80.0);

        let empty = ScriptIndex::build("");
        assert_eq!(layout.max_extent(&empty), 0.0);
    }

    #[test]
    fn test_multibyte_text_wraps_on_chars_not_bytes() {
        let layout = UniformLayout {
            chars_per_line: 5,
            line_height_px: 10.0,
        };
        // Five two-byte chars fill the first line; "aa" starts at byte 11
        // but char 6, which is line two
        let script = ScriptIndex::build("ééééé aa");
        let second = script.token(1).unwrap();
        assert_eq!(layout.pixel_for_offset(&script, second.start_offset), 10.0);
        assert_eq!(layout.max_extent(&script), 20.0);
    }

    #[test]
    fn test_px_per_token() {
        let layout = UniformLayout {
            chars_per_line: 10,
            line_height_px: 20.0,
        };
        let script = ScriptIndex::build("0123456789 0123456789 0123456789");
        assert_eq!(script.token_count(), 3);
        assert!((layout.px_per_token(&script) - 80.0 / 3.0).abs() < 1e-9);
    }
}
