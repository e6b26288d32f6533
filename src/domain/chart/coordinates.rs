//! Bidirectional mapping between the data domain (fractional candle index,
//! price) and device-independent pixels inside a layout rectangle.
//!
//! Every function is pure. Degenerate domains (flat price range, single-cell
//! index window) map to the rectangle's center instead of dividing by zero.

use super::value_objects::{Rect, Viewport};

/// Minimum on-screen candle body width.
pub const MIN_BODY_WIDTH: f64 = 2.0;
/// Body width as a share of the candle cell.
pub const BODY_RATIO: f64 = 0.8;

pub fn price_to_y(price: f64, viewport: &Viewport, rect: &Rect) -> f64 {
    let range = viewport.price_range();
    if range.abs() <= f64::EPSILON || !range.is_finite() {
        return rect.center_y();
    }
    let normalized = (price - viewport.price_min) / range;
    rect.bottom() - normalized * rect.height
}

pub fn y_to_price(y: f64, viewport: &Viewport, rect: &Rect) -> f64 {
    let range = viewport.price_range();
    if range.abs() <= f64::EPSILON || rect.height <= 0.0 || !range.is_finite() {
        return viewport.price_min;
    }
    let normalized = (rect.bottom() - y) / rect.height;
    viewport.price_min + normalized * range
}

/// Width of one candle cell in pixels. `offset_x` blank cells are reserved
/// past the last index, so the window does not stretch into them.
pub fn candle_spacing(viewport: &Viewport, rect: &Rect) -> f64 {
    let cells = viewport.visible_candles() + viewport.offset_x.max(0.0);
    if cells <= 0.0 || !cells.is_finite() {
        return rect.width;
    }
    rect.width / cells
}

/// Center of the cell holding `index`.
pub fn index_to_x(index: f64, viewport: &Viewport, rect: &Rect) -> f64 {
    if viewport.index_span().abs() <= f64::EPSILON {
        return rect.center_x();
    }
    let cell = candle_spacing(viewport, rect);
    rect.x + (index - viewport.start_index + 0.5) * cell
}

pub fn x_to_index(x: f64, viewport: &Viewport, rect: &Rect) -> f64 {
    let cell = candle_spacing(viewport, rect);
    if viewport.index_span().abs() <= f64::EPSILON || cell <= 0.0 {
        return viewport.start_index;
    }
    viewport.start_index + (x - rect.x) / cell - 0.5
}

pub fn candle_body_width(viewport: &Viewport, rect: &Rect) -> f64 {
    (candle_spacing(viewport, rect) * BODY_RATIO).max(MIN_BODY_WIDTH)
}

/// Round a raw step to 1, 2, 5 or 10 times a power of ten.
pub fn nice_step(range: f64, target_ticks: usize) -> f64 {
    if !(range > 0.0) || !range.is_finite() || target_ticks == 0 {
        return 1.0;
    }
    let raw_step = range / target_ticks as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick prices inside `[min, max]` on the nice-number grid.
pub fn price_ticks(min: f64, max: f64, target_ticks: usize) -> Vec<f64> {
    if !(max > min) || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    let step = nice_step(max - min, target_ticks);
    let first = (min / step).ceil() * step;
    let count = ((max - first) / step).floor().max(-1.0) as i64 + 1;
    (0..count.clamp(0, 1000)).map(|i| first + i as f64 * step).collect()
}

/// Stride in candles between time labels so labels sit at least
/// `min_label_px` apart. Snapped to a readable sequence.
pub fn time_label_stride(spacing: f64, min_label_px: f64) -> usize {
    const STRIDES: [usize; 14] = [1, 2, 3, 5, 10, 15, 20, 30, 60, 120, 240, 480, 960, 1440];
    if !(spacing > 0.0) {
        return 1;
    }
    let raw = (min_label_px / spacing).ceil().max(1.0) as usize;
    STRIDES.iter().copied().find(|s| *s >= raw).unwrap_or(raw)
}
