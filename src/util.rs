// Utility helpers for parsing and display formatting.
//
// This module centralizes all the "dirty" number/date handling so the rest
// of the code can assume clean, typed values. The sheet is human-edited and
// pt-BR formatted (`R$`, `.` thousands, `,` decimal), so every parser here
// recovers instead of failing: a bad numeric cell becomes `0` and a bad date
// cell falls back to a caller-supplied date.
use chrono::{Datelike, NaiveDate, Weekday};
use num_format::{Locale, ToFormattedString};

/// Parse a currency-like cell into `f64`.
///
/// - Strips the `R$` symbol and all whitespace.
/// - Drops `.` thousands separators, then converts the decimal comma.
/// - `""`, `"-"`, `"null"` and anything unparseable become `0.0`.
/// - Non-finite parses (a literal `NaN`/`inf` cell) are also clamped to
///   `0.0` so downstream math never sees them.
pub fn parse_currency(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != 'R' && *c != '$' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("null") {
        return 0.0;
    }
    let normalized = cleaned.replace('.', "").replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse a count cell (clicks, purchases, ...) into a non-negative integer.
///
/// Same normalization as [`parse_currency`], then truncation toward zero.
/// Negative or invalid input clamps to 0.
pub fn parse_count(raw: &str) -> u64 {
    let v = parse_currency(raw);
    if v <= 0.0 {
        0
    } else {
        v.trunc() as u64
    }
}

/// Parse a date cell, preferring `DD/MM/YYYY` (a 2-digit year is promoted to
/// the 2000s), then ISO `YYYY-MM-DD`. Anything else yields `fallback`.
///
/// The fallback is an explicit argument so the "unparseable date becomes
/// now" recovery policy is visible at the call site and assertable in tests.
pub fn parse_date_or(raw: &str, fallback: NaiveDate) -> NaiveDate {
    let s = raw.trim();
    if s.is_empty() {
        return fallback;
    }
    if s.contains('/') {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() == 3 {
            if let (Ok(day), Ok(month), Ok(mut year)) = (
                parts[0].trim().parse::<u32>(),
                parts[1].trim().parse::<u32>(),
                parts[2].trim().parse::<i32>(),
            ) {
                if year < 100 {
                    year += 2000;
                }
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    return date;
                }
            }
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date;
    }
    fallback
}

/// `numerator / denominator`, defined as `0.0` when the denominator is not
/// strictly positive. Every derived metric goes through this.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn weekday_name_pt(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "segunda-feira",
        Weekday::Tue => "terça-feira",
        Weekday::Wed => "quarta-feira",
        Weekday::Thu => "quinta-feira",
        Weekday::Fri => "sexta-feira",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

pub fn display_date_pt(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - pt-BR separators (e.g., `1.234.567,89`).
    let neg = n.is_sign_negative() && n.abs() >= 0.5 / 10f64.powi(decimals as i32);
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert the dots into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::pt);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push(',');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push(',');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_currency(n: f64) -> String {
    format!("R$ {}", format_number(n, 2))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages and tables.
    n.to_formatted_string(&Locale::pt)
}
