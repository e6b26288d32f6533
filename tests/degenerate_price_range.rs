use price_chart_engine::domain::chart::coordinates::{index_to_x, price_to_y};
use price_chart_engine::domain::chart::{Rect, Viewport};

#[test]
fn flat_price_range_maps_to_vertical_midpoint() {
    let vp = Viewport::new(0.0, 49.0, 100.0, 100.0);
    let rect = Rect::new(0.0, 10.0, 800.0, 400.0);
    assert_eq!(price_to_y(100.0, &vp, &rect), 210.0);
    assert_eq!(price_to_y(250.0, &vp, &rect), 210.0);
}

#[test]
fn single_index_window_maps_to_horizontal_center() {
    let vp = Viewport::new(7.0, 7.0, 90.0, 110.0);
    let rect = Rect::new(0.0, 0.0, 800.0, 400.0);
    assert_eq!(index_to_x(7.0, &vp, &rect), 400.0);
}
