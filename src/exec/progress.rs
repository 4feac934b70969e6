// src/exec/progress.rs

//! Best-effort completion percentage from a single line of tool output.
//!
//! Render tools print progress in many shapes (`42%`, `Frame 12/300`,
//! `progress=57`). [`extract`] tries those forms in a fixed order and returns
//! the first hit. It keeps no state between lines and the value is only ever
//! used for display.

/// Extract a completion percentage (`0..=100`) from one output line.
///
/// Rules, first match wins:
/// 1. digits directly before the first `%`, if they form a value in `0..=100`;
/// 2. a whitespace-separated `a/b` token (brackets count as whitespace) with
///    `b > 0`, rounded and clamped;
/// 3. digits after `progress:` or `progress=` (any case), clamped.
pub fn extract(line: &str) -> Option<u8> {
    percent_before_sign(line)
        .or_else(|| fraction_token(line))
        .or_else(|| progress_key(line))
}

fn percent_before_sign(line: &str) -> Option<u8> {
    let bytes = line.as_bytes();
    let pct = line.find('%')?;

    let mut start = pct;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }

    let value: u64 = line[start..pct].parse().ok()?;
    if value <= 100 { Some(value as u8) } else { None }
}

fn fraction_token(line: &str) -> Option<u8> {
    let normalized: String = line
        .chars()
        .map(|c| if matches!(c, '(' | ')' | '[' | ']') { ' ' } else { c })
        .collect();

    normalized.split_whitespace().find_map(|token| {
        let (a, b) = token.split_once('/')?;
        if b.contains('/') {
            return None;
        }
        match (parse_unsigned(a)?, parse_unsigned(b)?) {
            (_, Unsigned::Fits(0)) => None,
            // A numerator past u64 is at least any u64 denominator.
            (Unsigned::TooLarge, _) => Some(100),
            (Unsigned::Fits(_), Unsigned::TooLarge) => Some(0),
            (Unsigned::Fits(a), Unsigned::Fits(b)) => {
                // round(a * 100 / b) without floating point; u128 keeps it exact.
                let (a, b) = (a as u128, b as u128);
                let pct = (a * 200 + b) / (2 * b);
                Some(pct.min(100) as u8)
            }
        }
    })
}

fn progress_key(line: &str) -> Option<u8> {
    let lower = line.to_ascii_lowercase();

    for key in ["progress:", "progress="] {
        let Some(idx) = lower.find(key) else {
            continue;
        };
        let tail = lower[idx + key.len()..].trim_start();
        let digits: &str = match tail.find(|c: char| !c.is_ascii_digit()) {
            Some(end) => &tail[..end],
            None => tail,
        };
        if digits.is_empty() {
            continue;
        }
        // Anything too large for u64 is certainly above 100.
        let value = digits.parse::<u64>().unwrap_or(u64::MAX);
        return Some(value.min(100) as u8);
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unsigned {
    Fits(u64),
    TooLarge,
}

/// A run of ASCII digits; `None` for anything else.
fn parse_unsigned(s: &str) -> Option<Unsigned> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // All digits, so the only way to fail is overflow.
    Some(s.parse().map_or(Unsigned::TooLarge, Unsigned::Fits))
}
