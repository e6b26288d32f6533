//! Frame painter. Each layer reads the [`RenderFrame`] and emits draw calls
//! in a fixed z-order; nothing here mutates engine state.

use super::dom_renderer::DomRenderer;
use super::frame::RenderFrame;
use super::surface::{DrawSurface, Layer, TextAlign, TextStyle};
use super::text;
use crate::domain::chart::coordinates::{index_to_x, price_to_y};
use crate::domain::chart::formatting::{format_millions, format_percent, format_price, format_volume};
use crate::domain::chart::{Color, DrawingObject, DrawingType, FIB_LEVELS, IndicatorKind, MeasureReadout, Rect};
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{Candle, OiDirection};
use crate::log_warn;
use crate::time_utils::{format_full_time, format_time_label};

const CROSSHAIR_DASH: [f64; 2] = [4.0, 4.0];
const AXIS_FONT: f64 = 11.0;
const TOOLTIP_FONT: f64 = 11.0;
const TOOLTIP_LINE: f64 = 15.0;
const TOOLTIP_PADDING: f64 = 8.0;

pub struct ChartRenderer;

impl ChartRenderer {
    pub fn render(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let dims = frame.dimensions;
        surface.begin_layer(Layer::Background);
        surface.clear(dims.width, dims.height, frame.colors.background);

        if frame.dom_fullscreen {
            surface.begin_layer(Layer::DomFullscreen);
            DomRenderer::render_fullscreen(frame, surface);
            return;
        }

        if frame.series.is_empty() || frame.derived.visible.is_none() {
            Self::render_empty(frame, surface);
            return;
        }

        surface.begin_layer(Layer::Grid);
        if frame.config.show_grid {
            Self::render_grid(frame, surface);
        }

        surface.set_clip(Some(frame.price_pane()));
        surface.begin_layer(Layer::Candles);
        Self::render_candles(frame, surface);
        surface.set_clip(None);

        if frame.config.show_volume {
            surface.begin_layer(Layer::Volume);
            Self::render_volume(frame, surface);
        }

        surface.set_clip(Some(frame.price_pane()));
        surface.begin_layer(Layer::Indicators);
        Self::render_indicators(frame, surface);

        if frame.config.oi_overlay {
            surface.begin_layer(Layer::OiBubbles);
            Self::render_oi_bubbles(frame, surface);
        }

        surface.begin_layer(Layer::Drawings);
        Self::render_drawings(frame, surface);
        surface.set_clip(None);

        surface.begin_layer(Layer::PriceAxis);
        Self::render_price_axis(frame, surface);

        surface.begin_layer(Layer::TimeAxis);
        Self::render_time_axis(frame, surface);

        if frame.config.show_dom && frame.order_book.is_some() {
            surface.begin_layer(Layer::DomPanel);
            DomRenderer::render_panel(frame, surface);
        }

        surface.begin_layer(Layer::Watermark);
        Self::render_watermark(frame, surface);

        if frame.crosshair.visible {
            surface.begin_layer(Layer::Crosshair);
            Self::render_crosshair(frame, surface);

            surface.begin_layer(Layer::Tooltip);
            Self::render_tooltip(frame, surface);
        }
    }

    fn render_empty(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let dims = frame.dimensions;
        surface.begin_layer(Layer::PriceAxis);
        surface.fill_rect(dims.price_axis(), frame.colors.axis_background);
        surface.begin_layer(Layer::TimeAxis);
        surface.fill_rect(dims.time_axis(), frame.colors.axis_background);
        surface.begin_layer(Layer::NoData);
        let area = dims.chart_area;
        text(
            surface,
            "No data",
            area.center_x(),
            area.center_y(),
            &TextStyle::new(frame.colors.text, 16.0).align(TextAlign::Center),
        );
    }

    fn render_grid(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let pane = frame.price_pane();
        let area = frame.dimensions.chart_area;
        for &tick in &frame.derived.price_ticks {
            let y = price_to_y(tick, frame.viewport, &pane);
            surface.line((area.x, y), (area.right(), y), frame.colors.grid, 1.0);
        }
        for index in Self::label_indices(frame) {
            let x = index_to_x(index as f64, frame.viewport, &area);
            surface.line((x, area.y), (x, area.bottom()), frame.colors.grid, 1.0);
        }
    }

    /// Indices of the visible window aligned to the time-label stride.
    fn label_indices(frame: &RenderFrame) -> impl Iterator<Item = usize> {
        let stride = frame.derived.time_label_stride.max(1);
        let (start, end) = frame.derived.visible.unwrap_or((1, 0));
        let first = start.div_ceil(stride) * stride;
        (first..=end).step_by(stride)
    }

    fn render_candles(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let Some((start, end)) = frame.derived.visible else {
            return;
        };
        let pane = frame.price_pane();
        let area = frame.dimensions.chart_area;
        let body = frame.derived.body_width;
        for (offset, candle) in frame.series.candles().get(start..=end).unwrap_or_default().iter().enumerate() {
            let x = index_to_x((start + offset) as f64, frame.viewport, &area);
            if x < area.x - body || x > area.right() + body {
                continue;
            }
            let color = if candle.is_bullish() { frame.colors.bullish } else { frame.colors.bearish };
            let ohlcv = &candle.ohlcv;
            let y_high = price_to_y(ohlcv.high.value(), frame.viewport, &pane);
            let y_low = price_to_y(ohlcv.low.value(), frame.viewport, &pane);
            let y_open = price_to_y(ohlcv.open.value(), frame.viewport, &pane);
            let y_close = price_to_y(ohlcv.close.value(), frame.viewport, &pane);
            surface.line((x, y_high), (x, y_low), color, 1.0);
            let top = y_open.min(y_close);
            let height = (y_open - y_close).abs().max(1.0);
            surface.fill_rect(Rect::new(x - body / 2.0, top, body, height), color);
        }
    }

    fn render_volume(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let (Some((start, end)), max) = (frame.derived.visible, frame.derived.max_volume) else {
            return;
        };
        if max <= 0.0 {
            return;
        }
        let pane = frame.volume_pane();
        let area = frame.dimensions.chart_area;
        let body = frame.derived.body_width;
        for (offset, candle) in frame.series.candles().get(start..=end).unwrap_or_default().iter().enumerate() {
            let x = index_to_x((start + offset) as f64, frame.viewport, &area);
            if x < area.x - body || x > area.right() + body {
                continue;
            }
            let height = candle.ohlcv.volume.value() / max * pane.height;
            let color = if candle.is_bullish() { frame.colors.volume_bullish } else { frame.colors.volume_bearish };
            surface.fill_rect(Rect::new(x - body / 2.0, pane.bottom() - height, body, height), color);
        }
    }

    fn render_indicators(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let Some((start, end)) = frame.derived.visible else {
            return;
        };
        let pane = frame.price_pane();
        let area = frame.dimensions.chart_area;
        // one extra point each side so lines run off the edges
        let from = start.saturating_sub(1);
        let to = (end + 1).min(frame.series.len().saturating_sub(1));
        for indicator in frame.indicators.iter().filter(|i| i.visible && i.kind == IndicatorKind::Overlay) {
            let mut segment: Vec<(f64, f64)> = Vec::new();
            for index in from..=to {
                match indicator.value_at(index) {
                    Some(value) => segment.push((
                        index_to_x(index as f64, frame.viewport, &area),
                        price_to_y(value, frame.viewport, &pane),
                    )),
                    None => Self::flush_segment(&mut segment, indicator.color, surface),
                }
            }
            Self::flush_segment(&mut segment, indicator.color, surface);
        }
    }

    fn flush_segment(segment: &mut Vec<(f64, f64)>, color: Color, surface: &mut dyn DrawSurface) {
        if segment.len() > 1 {
            surface.polyline(segment, color, 1.5);
        }
        segment.clear();
    }

    fn render_oi_bubbles(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let Some((start, end)) = frame.derived.visible else {
            return;
        };
        let pane = frame.price_pane();
        let area = frame.dimensions.chart_area;
        let tolerance = frame.config.oi.match_tolerance_ms;
        for bubble in &frame.derived.bubbles {
            let Some(price) = bubble.price else {
                continue;
            };
            let Some(index) = frame.series.nearest_index(bubble.timestamp, tolerance) else {
                continue;
            };
            if index < start || index > end {
                continue;
            }
            let center = (index_to_x(index as f64, frame.viewport, &area), price_to_y(price, frame.viewport, &pane));
            let color = match bubble.direction {
                OiDirection::Increase => frame.colors.oi_increase,
                OiDirection::Decrease => frame.colors.oi_decrease,
            };
            let radius = bubble.size.radius();
            if let Err(e) = surface.radial_disc(center, radius, color.with_alpha(0.85), color.with_alpha(0.0)) {
                log_warn!(LogComponent::Infrastructure("Renderer"), "bubble skipped: {}", e);
                continue;
            }
            if bubble.size.shows_label() {
                text(
                    surface,
                    &format_millions(bubble.oi_delta),
                    center.0,
                    center.1,
                    &TextStyle::new(frame.colors.text, 10.0).align(TextAlign::Center).bold(),
                );
            }
        }
    }

    fn render_drawings(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        for drawing in frame.drawings.iter().chain(frame.pending_drawing) {
            Self::render_drawing(frame, drawing, surface);
        }
        if let Some(readout) = frame.measure {
            Self::render_measure(frame, &readout, surface);
        }
    }

    fn anchor_xy(frame: &RenderFrame, index: f64, price: f64) -> (f64, f64) {
        let area = frame.dimensions.chart_area;
        (index_to_x(index, frame.viewport, &area), price_to_y(price, frame.viewport, &frame.price_pane()))
    }

    fn render_drawing(frame: &RenderFrame, drawing: &DrawingObject, surface: &mut dyn DrawSurface) {
        let area = frame.dimensions.chart_area;
        let pane = frame.price_pane();
        let points: Vec<(f64, f64)> =
            drawing.anchors.iter().map(|a| Self::anchor_xy(frame, a.index, a.price)).collect();
        let label = TextStyle::new(drawing.color, 10.0).align(TextAlign::Right);

        match (drawing.kind, points.as_slice()) {
            (DrawingType::Horizontal, [p, ..]) => {
                surface.line((area.x, p.1), (area.right(), p.1), drawing.color, drawing.width);
                text(surface, &format_price(drawing.anchors[0].price), area.right() - 4.0, p.1 - 8.0, &label);
            }
            (DrawingType::Vertical, [p, ..]) => {
                surface.line((p.0, area.y), (p.0, area.bottom()), drawing.color, drawing.width);
            }
            (DrawingType::Trendline, [a, b, ..]) => {
                surface.line(*a, *b, drawing.color, drawing.width);
            }
            (DrawingType::Rectangle, [a, b, ..]) => {
                let rect = Rect::new(a.0.min(b.0), a.1.min(b.1), (a.0 - b.0).abs(), (a.1 - b.1).abs());
                surface.fill_rect(rect, drawing.color.with_alpha(0.15));
                surface.stroke_rect(rect, drawing.color, drawing.width);
            }
            (DrawingType::Fibonacci, [a, b, ..]) => {
                let (from, to) = (&drawing.anchors[0], &drawing.anchors[1]);
                let left = a.0.min(b.0);
                let right = a.0.max(b.0).max(left + 1.0);
                for level in FIB_LEVELS {
                    let price = to.price - (to.price - from.price) * level;
                    let y = price_to_y(price, frame.viewport, &pane);
                    surface.line((left, y), (right, y), drawing.color.with_alpha(0.8), drawing.width);
                    let caption = format!("{:.1}% {}", level * 100.0, format_price(price));
                    text(surface, &caption, right - 2.0, y - 7.0, &label);
                }
                if let Err(e) = surface.dashed_line(*a, *b, drawing.color.with_alpha(0.5), 1.0, &CROSSHAIR_DASH) {
                    log_warn!(LogComponent::Infrastructure("Renderer"), "fibonacci guide skipped: {}", e);
                }
            }
            // first anchor of a two-point tool still waiting for its second click
            (_, [p]) => {
                surface.fill_rect(Rect::new(p.0 - 3.0, p.1 - 3.0, 6.0, 6.0), drawing.color);
            }
            _ => {}
        }
    }

    fn render_measure(frame: &RenderFrame, readout: &MeasureReadout, surface: &mut dyn DrawSurface) {
        let a = Self::anchor_xy(frame, readout.from.index, readout.from.price);
        let b = Self::anchor_xy(frame, readout.to.index, readout.to.price);
        let color = frame.colors.measure;
        let rect = Rect::new(a.0.min(b.0), a.1.min(b.1), (a.0 - b.0).abs(), (a.1 - b.1).abs());
        surface.fill_rect(rect, color.with_alpha(0.15));
        surface.line(a, b, color, 1.0);

        let delta = if readout.price_delta >= 0.0 {
            format!("+{}", format_price(readout.price_delta))
        } else {
            format!("-{}", format_price(-readout.price_delta))
        };
        let caption = format!("{} ({})  {} bars", delta, format_percent(readout.percent_change), readout.bars);
        let style = TextStyle::new(frame.colors.text, 11.0).align(TextAlign::Center).bold();
        let width = surface.measure_text(&caption, 11.0) + 12.0;
        let box_rect = Rect::new(b.0 - width / 2.0, b.1 - 28.0, width, 18.0);
        surface.fill_rect(box_rect, color.with_alpha(0.85));
        text(surface, &caption, box_rect.center_x(), box_rect.center_y(), &style);
    }

    fn render_price_axis(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let axis = frame.dimensions.price_axis();
        let pane = frame.price_pane();
        surface.fill_rect(axis, frame.colors.axis_background);
        surface.line((axis.x, axis.y), (axis.x, axis.bottom()), frame.colors.grid, 1.0);

        let style = TextStyle::new(frame.colors.text, AXIS_FONT);
        for &tick in &frame.derived.price_ticks {
            let y = price_to_y(tick, frame.viewport, &pane);
            if y < pane.y || y > pane.bottom() {
                continue;
            }
            text(surface, &format_price(tick), axis.x + 6.0, y, &style);
        }

        if let Some(last) = frame.series.latest() {
            let close = last.ohlcv.close.value();
            let y = price_to_y(close, frame.viewport, &pane).clamp(pane.y, pane.bottom());
            let marker = if last.is_bullish() { frame.colors.bullish } else { frame.colors.bearish };
            surface.line((pane.x, y), (axis.x, y), frame.colors.last_price.with_alpha(0.6), 1.0);
            surface.fill_rect(Rect::new(axis.x, y - 9.0, axis.width, 18.0), marker);
            text(surface, &format_price(close), axis.x + 6.0, y, &style.with_color(Color::WHITE).bold());
        }
    }

    fn render_time_axis(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let axis = frame.dimensions.time_axis();
        let area = frame.dimensions.chart_area;
        surface.fill_rect(axis, frame.colors.axis_background);
        surface.line((axis.x, axis.y), (axis.right(), axis.y), frame.colors.grid, 1.0);

        let span = frame.config.interval.duration_ms() * frame.derived.time_label_stride.max(1) as u64;
        let style = TextStyle::new(frame.colors.text, AXIS_FONT).align(TextAlign::Center);
        for index in Self::label_indices(frame) {
            let Some(candle) = frame.series.get(index) else {
                continue;
            };
            let x = index_to_x(index as f64, frame.viewport, &area);
            if x < area.x || x > area.right() {
                continue;
            }
            let label = format_time_label(candle.timestamp.value(), span);
            text(surface, &label, x, axis.center_y(), &style);
        }
    }

    fn render_watermark(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        if frame.watermark.is_empty() {
            return;
        }
        let area = frame.dimensions.chart_area;
        let style = TextStyle::new(frame.colors.watermark, 48.0).align(TextAlign::Center).bold();
        text(surface, frame.watermark, area.center_x(), area.center_y(), &style);
    }

    fn render_crosshair(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let crosshair = frame.crosshair;
        let area = frame.dimensions.chart_area;
        let color = frame.colors.crosshair;
        let dashed = [
            surface.dashed_line((crosshair.x, area.y), (crosshair.x, area.bottom()), color, 1.0, &CROSSHAIR_DASH),
            surface.dashed_line((area.x, crosshair.y), (area.right(), crosshair.y), color, 1.0, &CROSSHAIR_DASH),
        ];
        for result in dashed {
            if let Err(e) = result {
                log_warn!(LogComponent::Infrastructure("Renderer"), "crosshair line skipped: {}", e);
            }
        }

        let label = TextStyle::new(Color::WHITE, AXIS_FONT);
        let axis = frame.dimensions.price_axis();
        if frame.price_pane().contains(area.x, crosshair.y) {
            surface.fill_rect(Rect::new(axis.x, crosshair.y - 9.0, axis.width, 18.0), color);
            text(surface, &format_price(crosshair.price), axis.x + 6.0, crosshair.y, &label);
        }
        if let Some(time) = crosshair.time {
            let time_axis = frame.dimensions.time_axis();
            let caption = format_full_time(time.value());
            let width = surface.measure_text(&caption, AXIS_FONT) + 12.0;
            surface.fill_rect(Rect::new(crosshair.x - width / 2.0, time_axis.y, width, time_axis.height), color);
            text(surface, &caption, crosshair.x, time_axis.center_y(), &label.align(TextAlign::Center));
        }
    }

    /// Tooltip lines for the candle under the crosshair.
    pub fn tooltip_lines(candle: &Candle) -> Vec<String> {
        let o = &candle.ohlcv;
        vec![
            format_full_time(candle.timestamp.value()),
            format!("O {}", format_price(o.open.value())),
            format!("H {}", format_price(o.high.value())),
            format!("L {}", format_price(o.low.value())),
            format!("C {}", format_price(o.close.value())),
            format!("Chg {}", format_percent(candle.change_percent())),
            format!("V {}", format_volume(o.volume.value())),
        ]
    }

    fn render_tooltip(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let Some(candle) = frame.crosshair.candle_index.and_then(|i| frame.series.get(i)) else {
            return;
        };
        let lines = Self::tooltip_lines(candle);
        let width = lines.iter().map(|l| surface.measure_text(l, TOOLTIP_FONT)).fold(0.0, f64::max)
            + TOOLTIP_PADDING * 2.0;
        let height = lines.len() as f64 * TOOLTIP_LINE + TOOLTIP_PADDING * 2.0;
        let area = frame.dimensions.chart_area;

        // keep the box inside the chart area, flipping to the left of the pointer when needed
        let mut x = frame.crosshair.x + 16.0;
        if x + width > area.right() {
            x = frame.crosshair.x - 16.0 - width;
        }
        let x = x.max(area.x);
        let y = (frame.crosshair.y + 16.0).min(area.bottom() - height).max(area.y);

        let rect = Rect::new(x, y, width, height);
        surface.fill_rect(rect, frame.colors.tooltip_background);
        surface.stroke_rect(rect, frame.colors.grid, 1.0);
        let accent = if candle.is_bullish() { frame.colors.bullish } else { frame.colors.bearish };
        for (i, line) in lines.iter().enumerate() {
            let color = if i == 0 { frame.colors.text } else { accent };
            let line_y = y + TOOLTIP_PADDING + TOOLTIP_LINE * (i as f64 + 0.5);
            text(surface, line, x + TOOLTIP_PADDING, line_y, &TextStyle::new(color, TOOLTIP_FONT));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ChartEngine;
    use crate::domain::chart::{ChartConfig, IndicatorData};
    use crate::domain::market_data::{OHLCV, Price, Symbol, Timestamp, Volume};
    use crate::infrastructure::rendering::{DrawCommand, RecordingSurface};

    fn engine(len: u64) -> ChartEngine {
        let mut engine = ChartEngine::new(Symbol::from("BTCUSDT"), ChartConfig::default()).unwrap();
        engine.resize(972.0, 526.0);
        engine.set_candles(
            (0..len)
                .map(|i| Candle::new(Timestamp::from_millis(i * 60_000), OHLCV::flat(100.0 + i as f64, 1.0)))
                .collect(),
        );
        engine
    }

    fn paint(engine: &ChartEngine) -> RecordingSurface {
        let mut surface = RecordingSurface::new();
        engine.render(&mut surface);
        surface
    }

    fn indicator(id: &str, kind: IndicatorKind, values: Vec<Option<f64>>) -> IndicatorData {
        IndicatorData { id: id.into(), name: id.into(), kind, values, color: Color::WHITE, visible: true }
    }

    #[test]
    fn overlay_lines_break_at_gaps_and_oscillators_stay_off_pane() {
        let mut engine = engine(30);
        let mut overlay: Vec<Option<f64>> = (0..30).map(|i| Some(100.0 + i as f64)).collect();
        overlay[10] = None;
        engine.set_indicators(vec![
            indicator("ema", IndicatorKind::Overlay, overlay),
            indicator("rsi", IndicatorKind::Oscillator, vec![Some(50.0); 30]),
        ]);

        let surface = paint(&engine);
        let polylines = surface
            .commands_in(Layer::Indicators)
            .into_iter()
            .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
            .count();
        assert_eq!(polylines, 2);
    }

    #[test]
    fn fibonacci_draws_every_level_and_a_dashed_guide() {
        let mut engine = engine(30);
        engine.select_tool(Some(DrawingType::Fibonacci), false);
        engine.click(200.0, 300.0);
        engine.click(600.0, 100.0);

        let surface = paint(&engine);
        let lines: Vec<bool> = surface
            .commands_in(Layer::Drawings)
            .into_iter()
            .filter_map(|c| match c {
                DrawCommand::Line { dashed, .. } => Some(*dashed),
                _ => None,
            })
            .collect();
        assert_eq!(lines.iter().filter(|d| !**d).count(), FIB_LEVELS.len());
        assert_eq!(lines.iter().filter(|d| **d).count(), 1);
    }

    #[test]
    fn tooltip_lists_ohlc_change_and_volume() {
        let candle = Candle::new(
            Timestamp::from_millis(0),
            OHLCV::new(Price::from(100.0), Price::from(110.0), Price::from(95.0), Price::from(105.0), Volume::from(1500.0)),
        );
        let lines = ChartRenderer::tooltip_lines(&candle);
        assert_eq!(lines[0], "1970-01-01 00:00");
        assert_eq!(lines[4], "C 105.0000");
        assert_eq!(lines.len(), 7);
        assert!(lines[6].starts_with("V 1.5"));
    }
}
