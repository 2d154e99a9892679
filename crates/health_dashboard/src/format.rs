//! Amount formatting for display records.
//!
//! Step counts are shown as the raw double's default string form while
//! calorie totals go through a rounded, grouped decimal style. The two paths
//! are intentionally different and must stay that way for display parity.

use serde::Serialize;

/// Locale-dependent pieces of decimal formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NumberLocale {
    tag: String,
    grouping_separator: String,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::for_tag("en_US")
    }
}

impl NumberLocale {
    pub fn new(tag: impl Into<String>, grouping_separator: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            grouping_separator: grouping_separator.into(),
        }
    }

    /// Resolve a POSIX or BCP 47 style tag (`de_DE.UTF-8`, `fr-FR`, `en`).
    pub fn for_tag(tag: &str) -> Self {
        let normalized = tag
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .replace('-', "_");
        let mut parts = normalized.split('_');
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts.next().unwrap_or_default().to_ascii_uppercase();

        let separator = match (language.as_str(), region.as_str()) {
            ("de", "CH") => "\u{2019}",
            ("de" | "es" | "it" | "nl" | "pt" | "da" | "id", _) => ".",
            ("fr", _) => "\u{202f}",
            _ => ",",
        };
        let tag = if region.is_empty() {
            language
        } else {
            format!("{language}_{region}")
        };
        Self::new(tag, separator)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn grouping_separator(&self) -> &str {
        &self.grouping_separator
    }

    /// Decimal style with zero fraction digits: ties round to even and the
    /// integer part is grouped in threes.
    pub fn format_rounded(&self, value: f64) -> String {
        if value.is_nan() {
            return "NaN".into();
        }
        if value.is_infinite() {
            return if value > 0.0 { "∞" } else { "-∞" }.into();
        }
        let rounded = value.round_ties_even();
        if rounded == 0.0 {
            return "0".into();
        }
        let digits = format!("{:.0}", rounded.abs());
        let grouped = group_thousands(&digits, &self.grouping_separator);
        if rounded < 0.0 {
            format!("-{grouped}")
        } else {
            grouped
        }
    }
}

fn group_thousands(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Default string form of a double: always carries a fractional part and
/// switches to exponent notation (`1e+16`, `1e-05`) at the extremes.
pub fn format_raw_double(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.into();
    }
    let debug = format!("{value:?}");
    match debug.split_once('e') {
        None => debug,
        Some((mantissa, exponent)) => {
            let (sign, magnitude) = match exponent.strip_prefix('-') {
                Some(m) => ('-', m),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{magnitude:0>2}")
        }
    }
}
