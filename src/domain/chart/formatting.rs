//! Label text for axes, tooltips and the ladder.

/// Price label with precision chosen by magnitude.
pub fn format_price(price: f64) -> String {
    if !price.is_finite() {
        return "-".to_string();
    }
    let abs = price.abs();
    if abs >= 1000.0 {
        group_thousands(price, 2)
    } else if abs >= 1.0 {
        format!("{:.4}", price)
    } else if abs >= 0.01 {
        format!("{:.6}", price)
    } else {
        format!("{:.8}", price)
    }
}

/// Volume with K/M/B suffixes.
pub fn format_volume(volume: f64) -> String {
    if !volume.is_finite() {
        return "-".to_string();
    }
    let abs = volume.abs();
    if abs >= 1e9 {
        format!("{:.2}B", volume / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", volume / 1e6)
    } else if abs >= 1e3 {
        format!("{:.2}K", volume / 1e3)
    } else {
        format!("{:.2}", volume)
    }
}

/// Signed value in millions, used on OI bubble labels.
pub fn format_millions(value: f64) -> String {
    format!("{:+.2}M", value / 1e6)
}

pub fn format_percent(value: f64) -> String {
    format!("{:+.2}%", value)
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut grouped = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if value < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn price_precision_by_magnitude() {
        assert_snapshot!(format_price(43_250.5), @"43,250.50");
        assert_snapshot!(format_price(1_234_567.891), @"1,234,567.89");
        assert_snapshot!(format_price(2.5), @"2.5000");
        assert_snapshot!(format_price(0.0523), @"0.052300");
        assert_snapshot!(format_price(0.00001234), @"0.00001234");
    }

    #[test]
    fn volume_suffixes() {
        assert_snapshot!(format_volume(999.0), @"999.00");
        assert_snapshot!(format_volume(1_500.0), @"1.50K");
        assert_snapshot!(format_volume(2_000_000.0), @"2.00M");
        assert_snapshot!(format_volume(3_250_000_000.0), @"3.25B");
    }

    #[test]
    fn millions_are_signed() {
        assert_snapshot!(format_millions(-2_500_000.0), @"-2.50M");
        assert_snapshot!(format_millions(12_000_000.0), @"+12.00M");
    }
}
