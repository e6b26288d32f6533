//! Depth-of-market ladder: the compact floating panel and the fullscreen
//! ladder with value-area highlighting.

use super::frame::RenderFrame;
use super::surface::{DrawSurface, TextAlign, TextStyle};
use super::text;
use crate::domain::chart::formatting::{format_percent, format_price, format_volume};
use crate::domain::chart::{Color, DomColumn, Rect};
use crate::domain::market_data::{ConnectionStatus, OrderBookSnapshot, ValueArea};
use strum::Display as StrumDisplay;

const HEADER_HEIGHT: f64 = 24.0;
const ROW_HEIGHT: f64 = 16.0;
const FOOTER_HEIGHT: f64 = 28.0;
const PANEL_MARGIN: f64 = 8.0;
const FULLSCREEN_ROW_HEIGHT: f64 = 20.0;
const FULLSCREEN_HEADER: f64 = 56.0;

/// Geometry of the imbalance fill inside its track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImbalanceBar {
    pub x: f64,
    pub width: f64,
    pub bids_dominate: bool,
}

/// Fill starts at the track center and grows right for positive imbalance
/// (bids dominate) and left for negative, `|imbalance| / 100` of a half-width.
pub fn imbalance_bar_geometry(imbalance: f64, track: Rect) -> ImbalanceBar {
    let half = track.width / 2.0;
    let center = track.center_x();
    let magnitude = if imbalance.is_finite() { imbalance.abs().min(100.0) } else { 0.0 };
    let width = magnitude / 100.0 * half;
    if imbalance >= 0.0 {
        ImbalanceBar { x: center, width, bids_dominate: true }
    } else {
        ImbalanceBar { x: center - width, width, bids_dominate: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum LevelTag {
    #[strum(serialize = "POC")]
    Poc,
    #[strum(serialize = "VAH")]
    Vah,
    #[strum(serialize = "VAL")]
    Val,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSide {
    Ask,
    Bid,
}

/// One ladder row with its synthetic columns derived from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomRow {
    pub side: RowSide,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub bid_depth: f64,
    pub ask_depth: f64,
    /// bid + ask quantity at the level
    pub volume: f64,
    /// bid / (bid + ask) in percent; `None` for an empty level
    pub buy_percent: Option<f64>,
    /// bid - ask
    pub delta: f64,
    pub tag: Option<LevelTag>,
    pub in_value_area: bool,
}

impl DomRow {
    fn new(side: RowSide, price: f64, book: &OrderBookSnapshot, value_area: Option<&ValueArea>) -> Self {
        let bid_level = book.bids.iter().find(|l| l.price == price);
        let ask_level = book.asks.iter().find(|l| l.price == price);
        let bid = bid_level.map_or(0.0, |l| l.quantity);
        let ask = ask_level.map_or(0.0, |l| l.quantity);
        let volume = bid + ask;
        let tag = value_area.and_then(|va| {
            if price == va.poc {
                Some(LevelTag::Poc)
            } else if price == va.vah {
                Some(LevelTag::Vah)
            } else if price == va.val {
                Some(LevelTag::Val)
            } else {
                None
            }
        });
        Self {
            side,
            price,
            bid,
            ask,
            bid_depth: bid_level.map_or(0.0, |l| l.total),
            ask_depth: ask_level.map_or(0.0, |l| l.total),
            volume,
            buy_percent: (volume > 0.0).then(|| bid / volume * 100.0),
            delta: bid - ask,
            tag,
            in_value_area: value_area.is_some_and(|va| va.contains(price)),
        }
    }
}

/// Ladder rows top to bottom: up to `per_side` asks (highest first, best ask
/// last) followed by up to `per_side` bids (best bid first).
pub fn ladder_rows(book: &OrderBookSnapshot, value_area: Option<&ValueArea>, per_side: usize) -> Vec<DomRow> {
    let mut rows: Vec<DomRow> = book
        .asks
        .iter()
        .take(per_side)
        .rev()
        .map(|l| DomRow::new(RowSide::Ask, l.price, book, value_area))
        .collect();
    rows.extend(book.bids.iter().take(per_side).map(|l| DomRow::new(RowSide::Bid, l.price, book, value_area)));
    rows
}

pub struct DomRenderer;

impl DomRenderer {
    /// Compact panel anchored to the top-right of the chart area.
    pub fn panel_rect(frame: &RenderFrame) -> Rect {
        let area = frame.dimensions.chart_area;
        let rows = (frame.config.dom_rows_per_side * 2 + 1) as f64;
        let height = HEADER_HEIGHT + ROW_HEIGHT * (rows + 1.0) + FOOTER_HEIGHT;
        let width = frame.config.dom_panel_width.min(area.width - 2.0 * PANEL_MARGIN);
        Rect::new(
            area.right() - width - PANEL_MARGIN,
            area.y + PANEL_MARGIN,
            width,
            height.min(area.height - 2.0 * PANEL_MARGIN),
        )
    }

    pub fn render_panel(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let Some(book) = frame.order_book else {
            return;
        };
        let colors = frame.colors;
        let panel = Self::panel_rect(frame);
        if panel.width <= 0.0 || panel.height <= HEADER_HEIGHT + FOOTER_HEIGHT {
            return;
        }
        surface.fill_rect(panel, colors.dom_background);
        surface.stroke_rect(panel, colors.grid, 1.0);

        let title = match frame.connection_status {
            ConnectionStatus::Connected => format!("{}  Order Book", book.symbol),
            status => format!("{}  Order Book ({})", book.symbol, status),
        };
        text(
            surface,
            &title,
            panel.x + 8.0,
            panel.y + HEADER_HEIGHT / 2.0,
            &TextStyle::new(colors.text, 12.0).bold(),
        );

        let col_w = panel.width / 4.0;
        let col_x = |i: f64| panel.x + col_w * (i + 0.5);
        let small = TextStyle::new(colors.text.with_alpha(0.6), 10.0).align(TextAlign::Center);
        let header_y = panel.y + HEADER_HEIGHT + ROW_HEIGHT / 2.0;
        for (i, label) in ["Bid", "Price", "Ask", "Total"].iter().enumerate() {
            text(surface, label, col_x(i as f64), header_y, &small);
        }

        let rows_room = ((panel.height - HEADER_HEIGHT - FOOTER_HEIGHT) / ROW_HEIGHT).floor() as usize;
        let per_side = frame.config.dom_rows_per_side.min(rows_room.saturating_sub(2) / 2);
        let rows = ladder_rows(book, None, per_side);
        let max_qty = rows.iter().map(|r| r.bid.max(r.ask)).fold(0.0, f64::max);
        let asks = rows.iter().filter(|r| r.side == RowSide::Ask).count();

        let mut y = panel.y + HEADER_HEIGHT + ROW_HEIGHT;
        let cell = TextStyle::new(colors.text, 11.0).align(TextAlign::Center);
        for (i, row) in rows.iter().enumerate() {
            if i == asks {
                Self::spread_row(frame, book, surface, Rect::new(panel.x, y, panel.width, ROW_HEIGHT));
                y += ROW_HEIGHT;
            }
            let (qty, side_color, depth) = match row.side {
                RowSide::Ask => (row.ask, colors.ask, row.ask_depth),
                RowSide::Bid => (row.bid, colors.bid, row.bid_depth),
            };
            if max_qty > 0.0 {
                let bar_w = qty / max_qty * panel.width;
                surface.fill_rect(Rect::new(panel.right() - bar_w, y + 1.0, bar_w, ROW_HEIGHT - 2.0), side_color.with_alpha(0.18));
            }
            let mid_y = y + ROW_HEIGHT / 2.0;
            if row.side == RowSide::Bid {
                text(surface, &format_volume(qty), col_x(0.0), mid_y, &cell.with_color(colors.bid));
            } else {
                text(surface, &format_volume(qty), col_x(2.0), mid_y, &cell.with_color(colors.ask));
            }
            text(surface, &format_price(row.price), col_x(1.0), mid_y, &cell.with_color(side_color));
            text(surface, &format_volume(depth), col_x(3.0), mid_y, &cell);
            y += ROW_HEIGHT;
        }
        if asks == rows.len() {
            Self::spread_row(frame, book, surface, Rect::new(panel.x, y, panel.width, ROW_HEIGHT));
        }

        let track = Rect::new(panel.x + 8.0, panel.bottom() - FOOTER_HEIGHT / 2.0 - 4.0, panel.width - 16.0, 8.0);
        Self::imbalance_footer(frame, book.imbalance, track, surface);
    }

    fn spread_row(frame: &RenderFrame, book: &OrderBookSnapshot, surface: &mut dyn DrawSurface, row: Rect) {
        surface.fill_rect(row, frame.colors.spread_row);
        let label = match (book.mid_price, book.spread) {
            (Some(mid), Some(spread)) => format!("{}  spread {}", format_price(mid), format_price(spread)),
            _ => "-".to_string(),
        };
        text(
            surface,
            &label,
            row.center_x(),
            row.center_y(),
            &TextStyle::new(frame.colors.text, 11.0).align(TextAlign::Center).bold(),
        );
    }

    fn imbalance_footer(frame: &RenderFrame, imbalance: f64, track: Rect, surface: &mut dyn DrawSurface) {
        surface.fill_rect(track, frame.colors.grid);
        let bar = imbalance_bar_geometry(imbalance, track);
        let color = if bar.bids_dominate { frame.colors.bid } else { frame.colors.ask };
        surface.fill_rect(Rect::new(bar.x, track.y, bar.width, track.height), color);
        surface.line(
            (track.center_x(), track.y - 2.0),
            (track.center_x(), track.bottom() + 2.0),
            frame.colors.text,
            1.0,
        );
    }

    /// Expanded ladder covering the whole canvas.
    pub fn render_fullscreen(frame: &RenderFrame, surface: &mut dyn DrawSurface) {
        let colors = frame.colors;
        let full = frame.dimensions.full();
        let Some(book) = frame.order_book else {
            text(
                surface,
                "Waiting for order book",
                full.center_x(),
                full.center_y(),
                &TextStyle::new(colors.text, 14.0).align(TextAlign::Center),
            );
            return;
        };
        let value_area = frame.derived.value_area;

        let summary = format!(
            "{}  mid {}  spread {}  imbalance {}",
            book.symbol,
            book.mid_price.map_or("-".to_string(), format_price),
            book.spread.map_or("-".to_string(), format_price),
            format_percent(book.imbalance),
        );
        text(surface, &summary, full.x + 12.0, full.y + 16.0, &TextStyle::new(colors.text, 14.0).bold());
        if let Some(va) = value_area {
            let line = format!(
                "POC {}  VAH {}  VAL {}  ({:.0}% of volume)",
                format_price(va.poc),
                format_price(va.vah),
                format_price(va.val),
                va.coverage() * 100.0
            );
            text(surface, &line, full.x + 12.0, full.y + 36.0, &TextStyle::new(colors.text.with_alpha(0.7), 11.0));
        }
        let track = Rect::new(full.right() - 212.0, full.y + 12.0, 200.0, 8.0);
        Self::imbalance_footer(frame, book.imbalance, track, surface);

        let columns = &frame.config.dom_columns;
        if columns.is_empty() {
            return;
        }
        let total_weight: f64 = columns.iter().map(|c| c.weight()).sum();
        let unit = full.width / total_weight;
        let mut offsets = Vec::with_capacity(columns.len());
        let mut x = full.x;
        for column in columns {
            offsets.push((x, column.weight() * unit));
            x += column.weight() * unit;
        }

        let head_y = full.y + FULLSCREEN_HEADER;
        let head = TextStyle::new(colors.text.with_alpha(0.6), 11.0).align(TextAlign::Center);
        for (column, (cx, cw)) in columns.iter().zip(&offsets) {
            text(surface, column.as_ref(), cx + cw / 2.0, head_y, &head);
        }

        let room = ((full.height - FULLSCREEN_HEADER - FULLSCREEN_ROW_HEIGHT) / FULLSCREEN_ROW_HEIGHT).floor();
        let per_side = (room.max(0.0) as usize) / 2;
        let rows = ladder_rows(book, value_area.as_ref(), per_side);
        let max_volume = rows.iter().map(|r| r.volume).fold(0.0, f64::max);

        let cell = TextStyle::new(colors.text, 11.0).align(TextAlign::Center);
        let mut y = head_y + FULLSCREEN_ROW_HEIGHT / 2.0;
        for row in &rows {
            let row_rect = Rect::new(full.x, y, full.width, FULLSCREEN_ROW_HEIGHT);
            if row.tag == Some(LevelTag::Poc) {
                surface.fill_rect(row_rect, colors.poc);
            } else if row.in_value_area {
                surface.fill_rect(row_rect, colors.value_area);
            }
            let mid_y = y + FULLSCREEN_ROW_HEIGHT / 2.0;
            for (column, (cx, cw)) in columns.iter().zip(&offsets) {
                let center = cx + cw / 2.0;
                match column {
                    DomColumn::Profile => {
                        if max_volume > 0.0 {
                            let w = row.volume / max_volume * (cw - 4.0);
                            let color = if row.delta >= 0.0 { colors.bid } else { colors.ask };
                            surface.fill_rect(Rect::new(cx + 2.0, y + 3.0, w, FULLSCREEN_ROW_HEIGHT - 6.0), color.with_alpha(0.5));
                        }
                    }
                    DomColumn::BidDepth => Self::cell(surface, row.bid_depth, center, mid_y, &cell),
                    DomColumn::BidSize => Self::cell(surface, row.bid, center, mid_y, &cell.with_color(colors.bid)),
                    DomColumn::Price => {
                        let side = if row.side == RowSide::Ask { colors.ask } else { colors.bid };
                        text(surface, &format_price(row.price), center, mid_y, &cell.with_color(side).bold());
                    }
                    DomColumn::AskSize => Self::cell(surface, row.ask, center, mid_y, &cell.with_color(colors.ask)),
                    DomColumn::AskDepth => Self::cell(surface, row.ask_depth, center, mid_y, &cell),
                    DomColumn::Volume => Self::cell(surface, row.volume, center, mid_y, &cell),
                    DomColumn::BuyPercent => {
                        let label = row.buy_percent.map_or("-".to_string(), |p| format!("{:.0}%", p));
                        text(surface, &label, center, mid_y, &cell);
                    }
                    DomColumn::Delta => {
                        let color = if row.delta >= 0.0 { colors.bid } else { colors.ask };
                        let label = if row.delta == 0.0 {
                            "0".to_string()
                        } else {
                            format!("{}{}", if row.delta > 0.0 { "+" } else { "-" }, format_volume(row.delta.abs()))
                        };
                        text(surface, &label, center, mid_y, &cell.with_color(color));
                    }
                    DomColumn::Tag => {
                        if let Some(tag) = row.tag {
                            text(surface, &tag.to_string(), center, mid_y, &cell.with_color(Self::tag_color(tag, frame)).bold());
                        }
                    }
                }
            }
            y += FULLSCREEN_ROW_HEIGHT;
        }
    }

    fn cell(surface: &mut dyn DrawSurface, value: f64, x: f64, y: f64, style: &TextStyle) {
        if value > 0.0 {
            text(surface, &format_volume(value), x, y, style);
        }
    }

    fn tag_color(tag: LevelTag, frame: &RenderFrame) -> Color {
        match tag {
            LevelTag::Poc => frame.colors.last_price,
            LevelTag::Vah | LevelTag::Val => frame.colors.drawing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{OrderBookLevel, Symbol, Timestamp};

    fn book() -> OrderBookSnapshot {
        OrderBookSnapshot::from_levels(
            Symbol::from("BTCUSDT"),
            vec![OrderBookLevel::new(99.0, 3.0), OrderBookLevel::new(98.0, 1.0)],
            vec![OrderBookLevel::new(100.0, 1.0), OrderBookLevel::new(101.0, 4.0)],
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn positive_imbalance_grows_right_from_center() {
        let track = Rect::new(0.0, 0.0, 200.0, 8.0);
        let bar = imbalance_bar_geometry(40.0, track);
        assert_eq!(bar, ImbalanceBar { x: 100.0, width: 40.0, bids_dominate: true });
    }

    #[test]
    fn negative_imbalance_grows_left() {
        let bar = imbalance_bar_geometry(-50.0, Rect::new(0.0, 0.0, 200.0, 8.0));
        assert_eq!((bar.x, bar.width, bar.bids_dominate), (50.0, 50.0, false));
    }

    #[test]
    fn ladder_puts_best_ask_above_best_bid() {
        let rows = ladder_rows(&book(), None, 10);
        let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![101.0, 100.0, 99.0, 98.0]);
        assert_eq!(rows[0].ask_depth, 5.0);
    }

    #[test]
    fn synthetic_columns_are_deterministic() {
        let book = OrderBookSnapshot {
            bids: vec![OrderBookLevel { price: 10.0, quantity: 3.0, total: 3.0 }],
            asks: vec![OrderBookLevel { price: 10.0, quantity: 1.0, total: 1.0 }],
            ..Default::default()
        };
        let row = DomRow::new(RowSide::Bid, 10.0, &book, None);
        assert_eq!(row.volume, 4.0);
        assert_eq!(row.buy_percent, Some(75.0));
        assert_eq!(row.delta, 2.0);
    }

    #[test]
    fn value_area_tags_rows() {
        let book = book();
        let va = ValueArea::compute(&book.merged_levels(), 0.7);
        let rows = ladder_rows(&book, va.as_ref(), 10);
        let poc = rows.iter().find(|r| r.tag == Some(LevelTag::Poc)).unwrap();
        assert_eq!(poc.price, 101.0);
        assert!(poc.in_value_area);
    }
}
