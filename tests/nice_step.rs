use price_chart_engine::domain::chart::coordinates::{nice_step, price_ticks};

#[test]
fn snaps_raw_step_to_one_two_five() {
    assert_eq!(nice_step(37.0, 5), 10.0);
    assert!((nice_step(0.37, 5) - 0.1).abs() < 1e-12);
    assert_eq!(nice_step(8.0, 5), 2.0);
    assert_eq!(nice_step(20.0, 5), 5.0);
}

#[test]
fn ticks_sit_on_the_step_grid_inside_the_range() {
    let ticks = price_ticks(101.3, 138.0, 5);
    assert_eq!(ticks.len(), 3);
    for (tick, expected) in ticks.iter().zip([110.0, 120.0, 130.0]) {
        assert!((tick - expected).abs() < 1e-9);
    }
}
