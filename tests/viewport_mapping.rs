use price_chart_engine::domain::chart::coordinates::{candle_body_width, candle_spacing, index_to_x};
use price_chart_engine::domain::chart::{Rect, Viewport};

#[test]
fn hundred_candle_window_fills_nine_hundred_pixels() {
    let vp = Viewport::new(0.0, 99.0, 100.0, 110.0);
    let rect = Rect::new(0.0, 0.0, 900.0, 500.0);

    let first = index_to_x(0.0, &vp, &rect);
    let last = index_to_x(99.0, &vp, &rect);
    assert!(first >= rect.x && first <= rect.right());
    assert!(last >= rect.x && last <= rect.right());
    assert!((index_to_x(49.5, &vp, &rect) - rect.center_x()).abs() < 1e-9);

    assert!((candle_spacing(&vp, &rect) - 9.0).abs() < 1e-9);
    assert!((candle_body_width(&vp, &rect) - 7.2).abs() < 1e-9);
}

#[test]
fn body_width_never_drops_below_two_pixels() {
    let vp = Viewport::new(0.0, 4999.0, 1.0, 2.0);
    let rect = Rect::new(0.0, 0.0, 900.0, 500.0);
    assert_eq!(candle_body_width(&vp, &rect), 2.0);
}
