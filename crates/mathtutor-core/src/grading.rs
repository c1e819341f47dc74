//! Answer grading.
//!
//! User input is read the way a lenient float parser reads it (longest
//! numeric prefix, garbage becomes zero), rounded half-up to an integer, and
//! compared for exact equality with the stored answer. There is no tolerance
//! window: the rounding step is the only slack.

/// Parse a user-entered answer. Unparsable input yields `0.0`.
pub fn parse_user_answer(input: &str) -> f64 {
    match numeric_prefix(input.trim_start()) {
        Some(value) if value != 0.0 && !value.is_nan() => value,
        _ => 0.0,
    }
}

/// Longest prefix of `s` that reads as a decimal float.
fn numeric_prefix(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    if s[pos..].starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &s[int_start..pos];

    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        let frac_start = pos + 1;
        let mut end = frac_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        frac_digits = &s[frac_start..end];
        pos = end;
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    // The exponent only counts when at least one digit follows the marker.
    let mut exponent = "";
    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let mut end = pos + 1;
        if end < bytes.len() && matches!(bytes[end], b'+' | b'-') {
            end += 1;
        }
        let digits_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > digits_start {
            exponent = &s[pos + 1..end];
        }
    }

    let normalized = format!(
        "{}{}.{}e{}",
        if negative { "-" } else { "" },
        if int_digits.is_empty() { "0" } else { int_digits },
        if frac_digits.is_empty() { "0" } else { frac_digits },
        if exponent.is_empty() { "0" } else { exponent },
    );
    normalized.parse().ok()
}

/// Round to the nearest integer, halves toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// A stored correct answer is usable only when it is a finite number.
pub fn resolve_correct_answer(stored: f64) -> Option<f64> {
    stored.is_finite().then_some(stored)
}

/// Whether `user_answer`, rounded, matches `correct_answer` exactly.
pub fn grade(user_answer: f64, correct_answer: f64) -> bool {
    correct_answer.is_finite() && round_half_up(user_answer) == correct_answer
}
