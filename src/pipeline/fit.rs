//! Font-fit: pick the largest font size at which translated text is
//! estimated to fit its block rectangle.
//!
//! The estimate is deliberately coarse. Character widths are approximated as
//! `fontsize * glyph_width_factor`, and the line count is the character
//! count divided by characters-per-line, rounded up. Exact measurement would
//! need font metrics; the engine's own wrap decides the final layout.

use crate::config::FitOptions;
use crate::output::Rect;

/// Outcome of [`fit_font_size`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    /// Chosen size, never below `min_fontsize`.
    pub fontsize: f32,
    /// Candidate sizes tried.
    pub iterations: u32,
    /// `false` when the floor was reached without the estimate fitting.
    pub fits: bool,
    /// Estimated line count at `fontsize`.
    pub lines: usize,
}

/// Estimated characters per line at `fontsize`.
pub fn chars_per_line(width: f32, fontsize: f32, opts: &FitOptions) -> usize {
    let glyph = (fontsize * opts.glyph_width_factor).max(f32::EPSILON);
    let estimate = (width.max(0.0) / glyph).floor() as usize;
    estimate.max(opts.min_chars_per_line).max(1)
}

/// Estimated line count for `text` at `fontsize` in a box `width` wide.
pub fn estimate_lines(text: &str, width: f32, fontsize: f32, opts: &FitOptions) -> usize {
    let chars = text.chars().count();
    chars.div_ceil(chars_per_line(width, fontsize, opts)).max(1)
}

/// Estimated height `text` needs at `fontsize`.
pub fn estimate_height(text: &str, width: f32, fontsize: f32, opts: &FitOptions) -> f32 {
    estimate_lines(text, width, fontsize, opts) as f32 * fontsize * opts.line_spacing
}

/// Shrink from `initial_fontsize` in steps of one point until the estimate
/// fits `rect` or `min_fontsize` is reached.
///
/// Terminates after at most `initial_fontsize - min_fontsize + 1` candidates.
pub fn fit_font_size(rect: &Rect, text: &str, opts: &FitOptions) -> FitResult {
    let floor = opts.min_fontsize;
    let mut size = opts.initial_fontsize.max(floor);
    let mut iterations = 0u32;

    loop {
        iterations += 1;
        let lines = estimate_lines(text, rect.width(), size, opts);
        let needed = lines as f32 * size * opts.line_spacing;
        let fits = needed <= rect.height();

        if fits || size <= floor {
            return FitResult {
                fontsize: size,
                iterations,
                fits,
                lines,
            };
        }
        size = (size - 1.0).max(floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> FitOptions {
        FitOptions {
            initial_fontsize: 10.0,
            min_fontsize: 6.0,
            line_spacing: 1.15,
            glyph_width_factor: 0.5,
            min_chars_per_line: 20,
        }
    }

    #[test]
    fn short_text_keeps_initial_size() {
        let r = fit_font_size(&Rect::new(0.0, 0.0, 100.0, 20.0), "Hello", &opts());
        assert_eq!(r.fontsize, 10.0);
        assert_eq!(r.iterations, 1);
        assert!(r.fits);
        assert_eq!(r.lines, 1);
    }

    #[test]
    fn oversized_text_hits_the_floor() {
        let text = "x".repeat(500);
        let r = fit_font_size(&Rect::new(0.0, 0.0, 50.0, 15.0), &text, &opts());
        assert_eq!(r.fontsize, 6.0);
        assert!(!r.fits);
        assert_eq!(r.iterations, 5);
    }

    #[test]
    fn shrinks_one_point_at_a_time() {
        // 60 chars in 100pt: at 10 → 20 cpl, 3 lines, 34.5pt; at 8 → 25 cpl,
        // 3 lines, 27.6pt; at 7 → 28 cpl, 3 lines, 24.15pt.
        let text = "y".repeat(60);
        let r = fit_font_size(&Rect::new(0.0, 0.0, 100.0, 25.0), &text, &opts());
        assert_eq!(r.fontsize, 7.0);
        assert_eq!(r.iterations, 4);
        assert!(r.fits);
    }

    #[test]
    fn iteration_count_is_bounded() {
        let o = FitOptions {
            initial_fontsize: 24.0,
            min_fontsize: 4.0,
            ..opts()
        };
        let text = "z".repeat(10_000);
        let r = fit_font_size(&Rect::new(0.0, 0.0, 10.0, 1.0), &text, &o);
        assert_eq!(r.fontsize, 4.0);
        assert!(r.iterations <= (24.0 - 4.0 + 1.0) as u32);
    }

    #[test]
    fn fractional_range_never_goes_below_floor() {
        let o = FitOptions {
            initial_fontsize: 9.5,
            min_fontsize: 6.0,
            ..opts()
        };
        let r = fit_font_size(&Rect::new(0.0, 0.0, 10.0, 1.0), &"w".repeat(400), &o);
        assert_eq!(r.fontsize, 6.0);
        assert_eq!(r.iterations, 5);
    }

    #[test]
    fn chars_per_line_has_a_floor() {
        assert_eq!(chars_per_line(10.0, 10.0, &opts()), 20);
        assert_eq!(chars_per_line(500.0, 10.0, &opts()), 100);
    }
}
