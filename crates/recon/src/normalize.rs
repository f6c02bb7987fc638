//! Identifier normalization.
//!
//! Spreadsheet exports disagree on how a code is stored: the same SUPC can be
//! a numeric cell (`205167.0`), a text cell (`"205167"`) or text with stray
//! whitespace. Everything funnels through [`normalize`] so set membership is
//! plain string equality.

use crate::catalog::IdentifierFormat;
use crate::model::{Identifier, RawValue};

/// Normalize one cell. Returns `None` for blank cells.
pub fn normalize(value: &RawValue, format: IdentifierFormat) -> Option<Identifier> {
    let text = match value {
        RawValue::Empty => return None,
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match format {
                IdentifierFormat::Text => trimmed.to_string(),
                IdentifierFormat::Numeric => integral_text(trimmed).unwrap_or_else(|| trimmed.to_string()),
                IdentifierFormat::ZeroPadded { width } => pad_digits(trimmed, width),
            }
        }
        RawValue::Float(n) => {
            let s = format_number(*n);
            match format {
                IdentifierFormat::ZeroPadded { width } => pad_digits(&s, width),
                _ => s,
            }
        }
        RawValue::Int(n) => {
            let s = n.to_string();
            match format {
                IdentifierFormat::ZeroPadded { width } => pad_digits(&s, width),
                _ => s,
            }
        }
        RawValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
    };
    Some(Identifier::new(text))
}

/// Normalize a free-text value with the default rules (trim only).
pub fn identifier(text: &str) -> Option<Identifier> {
    normalize(&RawValue::Text(text.to_string()), IdentifierFormat::Text)
}

/// Format a float without decimal artifacts: integers print without `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// "205167.0" -> "205167". Anything that is not an integral number is left
/// to the caller.
fn integral_text(s: &str) -> Option<String> {
    let n: f64 = s.parse().ok()?;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        None
    }
}

/// Left-pad an all-digit code to `width` digits. Longer codes and codes with
/// other characters pass through unchanged.
fn pad_digits(s: &str, width: u8) -> String {
    let width = usize::from(width);
    if !s.is_empty() && s.len() < width && s.bytes().all(|b| b.is_ascii_digit()) {
        format!("{s:0>width$}")
    } else {
        s.to_string()
    }
}
