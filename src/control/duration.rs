//! Duration Text Format
//!
//! Textual durations as carried in the max-age trailer: `250ms`, `90s`,
//! `1h30m`, `1.5s`.

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Units from largest to smallest, with their size in nanoseconds.
const UNITS: [(&str, u128); 6] = [
    ("h", 3_600 * NANOS_PER_SEC),
    ("m", 60 * NANOS_PER_SEC),
    ("s", NANOS_PER_SEC),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

/// Digits past this many in a fraction are ignored.
const MAX_FRACTION_DIGITS: usize = 18;

// == Format ==
/// Formats `d` as an integer count of the largest unit that represents it
/// exactly. Zero formats as `0s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    UNITS
        .iter()
        .find(|(_, size)| nanos % size == 0)
        .map(|(unit, size)| format!("{}{}", nanos / size, unit))
        .unwrap_or_else(|| format!("{}ns", nanos))
}

// == Parse ==
/// Parses a duration such as `250ms`, `1h30m` or `-5s`.
///
/// Negative durations parse to zero. The error carries a description of
/// what was wrong with the input.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    let (negative, mut rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration {:?}", input));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, fraction, after_number) = split_number(rest)
            .ok_or_else(|| format!("invalid duration {:?}: expected a number", input))?;

        let unit_len = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, after_unit) = after_number.split_at(unit_len);
        let size = unit_nanos(unit)
            .ok_or_else(|| format!("invalid duration {:?}: unknown unit {:?}", input, unit))?;

        let component = component_nanos(whole, fraction, size)
            .ok_or_else(|| format!("invalid duration {:?}: out of range", input))?;
        total = total
            .checked_add(component)
            .ok_or_else(|| format!("invalid duration {:?}: out of range", input))?;
        rest = after_unit;
    }

    if negative {
        return Ok(Duration::ZERO);
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| format!("invalid duration {:?}: out of range", input))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Splits a leading `digits[.digits]` off `s`. At least one digit is required.
fn split_number(s: &str) -> Option<(&str, &str, &str)> {
    let whole_len = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (whole, rest) = s.split_at(whole_len);

    let (fraction, rest) = match rest.strip_prefix('.') {
        Some(after_dot) => {
            let frac_len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            after_dot.split_at(frac_len)
        }
        None => ("", rest),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    Some((whole, fraction, rest))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "h" => Some(UNITS[0].1),
        "m" => Some(UNITS[1].1),
        "s" => Some(UNITS[2].1),
        "ms" => Some(UNITS[3].1),
        // U+00B5 micro sign and U+03BC greek small letter mu
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(UNITS[4].1),
        "ns" => Some(UNITS[5].1),
        _ => None,
    }
}

fn component_nanos(whole: &str, fraction: &str, size: u128) -> Option<u128> {
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().ok()?
    };
    let mut nanos = whole_value.checked_mul(size)?;

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let numerator: u128 = fraction.parse().ok()?;
        let scale = 10u128.pow(fraction.len() as u32);
        nanos = nanos.checked_add(numerator * size / scale)?;
    }
    Some(nanos)
}
