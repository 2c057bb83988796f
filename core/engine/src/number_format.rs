//! FILENAME: core/engine/src/number_format.rs
//! PURPOSE: Number formatting utilities for the text form of computed cells.
//! CONTEXT: Measures and numeric dimension values are rendered according to
//! the `FieldAttributes` attached to them in the cube definition. Dates are
//! serial day numbers where 0 is 1899-12-30.

use hypercube::{FieldAttrType, FieldAttributes};

const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
const DEFAULT_TIME_FORMAT: &str = "hh:mm:ss";
const DEFAULT_MONEY_SYMBOL: &str = "$";

/// Format a number according to the given field attributes.
pub fn format_number(value: f64, attrs: &FieldAttributes) -> String {
    if value.is_nan() {
        return "-".to_string();
    }

    let dec = attrs.dec.as_deref().unwrap_or(".");
    let thou = attrs.thou.as_deref().unwrap_or(",");

    match attrs.attr_type {
        FieldAttrType::Unknown | FieldAttrType::Ascii => format_general(value),
        FieldAttrType::Integer => format_decimal(value, 0, attrs.use_thou, dec, thou),
        FieldAttrType::Real | FieldAttrType::Fixed => {
            format_decimal(value, attrs.n_dec, attrs.use_thou, dec, thou)
        }
        FieldAttrType::Money => {
            let symbol = money_symbol(attrs.fmt.as_deref());
            format_money(value, attrs.n_dec, symbol, dec, thou)
        }
        FieldAttrType::Date => {
            format_date(value, attrs.fmt.as_deref().unwrap_or(DEFAULT_DATE_FORMAT))
        }
        FieldAttrType::Time => {
            format_time(value, attrs.fmt.as_deref().unwrap_or(DEFAULT_TIME_FORMAT))
        }
        FieldAttrType::Timestamp => match attrs.fmt.as_deref() {
            Some(fmt) => format_time(value, &format_date(value, fmt)),
            None => format!(
                "{} {}",
                format_date(value, DEFAULT_DATE_FORMAT),
                format_time(value, DEFAULT_TIME_FORMAT)
            ),
        },
        FieldAttrType::Interval => format_interval(value),
    }
}

/// Format a number in general format (auto-detect best representation).
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "-".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs_value = value.abs();

    // Use scientific notation for very large or very small numbers
    if abs_value >= 1e15 || abs_value < 1e-4 {
        return format!("{:.5e}", value);
    }

    // For integers, don't show decimal point
    if value.fract() == 0.0 {
        return format!("{:.0}", value);
    }

    // For decimals, show up to 10 decimals but trim trailing zeros
    let formatted = format!("{:.10}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format a number with fixed decimals and optional thousands grouping.
fn format_decimal(value: f64, decimal_places: u8, use_thousands: bool, dec: &str, thou: &str) -> String {
    let rounded = format!("{:.prec$}", value, prec = decimal_places as usize);
    let grouping = if use_thousands { Some(thou) } else { None };
    localize(&rounded, dec, grouping)
}

/// Rewrites a plain `-1234.5` rendering with the given separators.
fn localize(plain: &str, dec: &str, thou: Option<&str>) -> String {
    let (integer_part, decimal_part) = match plain.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (plain, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    if negative {
        result.push('-');
    }

    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if let Some(sep) = thou {
            if i > 0 && (len - i) % 3 == 0 {
                result.push_str(sep);
            }
        }
        result.push(c);
    }

    if let Some(decimal) = decimal_part {
        result.push_str(dec);
        result.push_str(decimal);
    }

    result
}

/// A money format string may lead with its currency symbol, e.g. `€#,##0.00`.
fn money_symbol(fmt: Option<&str>) -> &str {
    let Some(fmt) = fmt else {
        return DEFAULT_MONEY_SYMBOL;
    };
    let end = fmt
        .find(|c: char| matches!(c, '#' | '0' | ',' | '.' | ' ' | ';'))
        .unwrap_or(fmt.len());
    if end == 0 {
        DEFAULT_MONEY_SYMBOL
    } else {
        &fmt[..end]
    }
}

/// Money always groups thousands. Negative amounts are parenthesized.
fn format_money(value: f64, decimal_places: u8, symbol: &str, dec: &str, thou: &str) -> String {
    let plain = format!("{:.prec$}", value.abs(), prec = decimal_places as usize);
    let formatted = format!("{}{}", symbol, localize(&plain, dec, Some(thou)));

    if value < 0.0 {
        format!("({})", formatted)
    } else {
        formatted
    }
}

/// Serials without a calendar date fall back to the general format.
fn format_date(value: f64, format: &str) -> String {
    let Some((year, month, day)) = civil_from_serial(value) else {
        return format_general(value);
    };
    format
        .replace("YYYY", &format!("{:04}", year))
        .replace("YY", &format!("{:02}", year.rem_euclid(100)))
        .replace("MM", &format!("{:02}", month))
        .replace("DD", &format!("{:02}", day))
}

/// Format the fractional part of a serial number as a time of day.
fn format_time(value: f64, format: &str) -> String {
    let fraction = value - value.floor();
    let total_seconds = ((fraction * 86400.0).round() as u32).min(86399);

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format
        .replace("hh", &format!("{:02}", hours))
        .replace("mm", &format!("{:02}", minutes))
        .replace("ss", &format!("{:02}", seconds))
}

/// Durations in days rendered as hours:minutes:seconds, hours unbounded.
fn format_interval(value: f64) -> String {
    let total_seconds = (value.abs() * 86400.0).round() as u64;
    let sign = if value < 0.0 { "-" } else { "" };
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

// ============================================================================
// CALENDAR
// ============================================================================

/// Days between 1970-01-01 and 1899-12-30.
const SERIAL_EPOCH_OFFSET: i64 = 25_569;

/// Largest serial magnitude given a calendar date, about 270,000 years.
const MAX_DATE_SERIAL: f64 = 1e8;

/// Serial day number of a calendar date.
pub fn date_serial(year: i32, month: u32, day: u32) -> f64 {
    (days_from_civil(year as i64, month as i64, day as i64) + SERIAL_EPOCH_OFFSET) as f64
}

/// Calendar date of the day containing `serial`. `None` for non-finite
/// serials and for magnitudes above `MAX_DATE_SERIAL`.
pub fn civil_from_serial(serial: f64) -> Option<(i32, u32, u32)> {
    if !serial.is_finite() || serial.abs() > MAX_DATE_SERIAL {
        return None;
    }
    let (y, m, d) = civil_from_days(serial.floor() as i64 - SERIAL_EPOCH_OFFSET);
    Some((y as i32, m as u32, d as u32))
}

// Proleptic Gregorian conversions relative to 1970-01-01, after
// Howard Hinnant's chrono-compatible algorithms.
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_format() {
        assert_eq!(format_general(2016.0), "2016");
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(1.25), "1.25");
        assert_eq!(format_general(-3.5), "-3.5");
        assert_eq!(format_general(f64::NAN), "-");
    }

    #[test]
    fn test_money_with_grouping() {
        let attrs = FieldAttributes::money(2, ".", ",");
        assert_eq!(format_number(5976.0, &attrs), "$5,976.00");
        assert_eq!(format_number(1234567.891, &attrs), "$1,234,567.89");
        assert_eq!(format_number(-42.5, &attrs), "($42.50)");
    }

    #[test]
    fn test_money_custom_separators_and_symbol() {
        let mut attrs = FieldAttributes::money(2, ",", ".");
        attrs.fmt = Some("€#.##0,00".to_string());
        assert_eq!(format_number(1234.5, &attrs), "€1.234,50");
    }

    #[test]
    fn test_fixed_and_integer() {
        assert_eq!(format_number(3.14159, &FieldAttributes::fixed(2)), "3.14");

        let attrs = FieldAttributes {
            attr_type: FieldAttrType::Integer,
            use_thou: true,
            ..Default::default()
        };
        assert_eq!(format_number(1234567.4, &attrs), "1,234,567");
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(date_serial(1899, 12, 30), 0.0);
        assert_eq!(date_serial(1900, 3, 1), 61.0);
        assert_eq!(civil_from_serial(date_serial(2016, 2, 29)), Some((2016, 2, 29)));
        assert_eq!(civil_from_serial(date_serial(2016, 2, 29) + 0.75), Some((2016, 2, 29)));

        let attrs = FieldAttributes {
            attr_type: FieldAttrType::Date,
            ..Default::default()
        };
        assert_eq!(format_number(date_serial(2016, 7, 4), &attrs), "2016-07-04");
    }

    #[test]
    fn test_serials_without_a_date() {
        for serial in [1e300, -1e300, f64::INFINITY, f64::NEG_INFINITY, f64::NAN, 1e8 + 1.0] {
            assert_eq!(civil_from_serial(serial), None, "{}", serial);
        }
        assert!(civil_from_serial(-1e8).is_some());

        let attrs = FieldAttributes {
            attr_type: FieldAttrType::Date,
            ..Default::default()
        };
        assert_eq!(format_number(1e300, &attrs), format_general(1e300));
    }

    #[test]
    fn test_time_and_interval() {
        let attrs = FieldAttributes {
            attr_type: FieldAttrType::Time,
            ..Default::default()
        };
        assert_eq!(format_number(0.5, &attrs), "12:00:00");
        assert_eq!(format_interval(1.25), "30:00:00");
    }
}
