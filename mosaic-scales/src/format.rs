//! Number formatting for legend labels.
//!
//! Supports the subset of the d3/Python format mini-language used by legend formats:
//!
//! ```text
//! [sign][$][,][.precision][type]
//! ```
//!
//! `sign` is one of `-` (default), `+`, ` ` or `(`; `type` is one of `f`, `d`, `%`, `e`, `r`
//! or `s`. Without a type the shortest round-trip representation is used.
use crate::error::MosaicScaleError;
use lazy_static::lazy_static;
use regex::Regex;

const PREFIXES: [&str; 17] = [
    "y", "z", "a", "f", "p", "n", "µ", "m", "", "k", "M", "G", "T", "P", "E", "Z", "Y",
];

lazy_static! {
    static ref FORMAT_RE: Regex =
        Regex::new(r"^([+\-( ])?(\$)?(,)?(?:\.(\d+))?([%dfers])?$").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    sign: char,
    currency: bool,
    grouping: bool,
    precision: Option<usize>,
    format_type: Option<char>,
}

impl NumberFormat {
    pub fn parse(pattern: &str) -> Result<Self, MosaicScaleError> {
        let caps = FORMAT_RE
            .captures(pattern)
            .ok_or_else(|| MosaicScaleError::InvalidNumberFormat(pattern.to_string()))?;

        let precision = caps
            .get(4)
            .map(|m| m.as_str().parse::<usize>())
            .transpose()
            .map_err(|_| MosaicScaleError::InvalidNumberFormat(pattern.to_string()))?;

        Ok(Self {
            sign: caps
                .get(1)
                .and_then(|m| m.as_str().chars().next())
                .unwrap_or('-'),
            currency: caps.get(2).is_some(),
            grouping: caps.get(3).is_some(),
            precision,
            format_type: caps.get(5).and_then(|m| m.as_str().chars().next()),
        })
    }

    pub fn format(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let negative = value < 0.0;
        let magnitude = value.abs();
        let precision = self.precision.unwrap_or(6);

        let (mut digits, suffix) = match self.format_type {
            Some('f') => (format!("{magnitude:.precision$}"), String::new()),
            Some('d') => (format!("{:.0}", magnitude.round()), String::new()),
            Some('%') => (
                format!("{:.precision$}", magnitude * 100.0),
                "%".to_string(),
            ),
            Some('e') => (format!("{magnitude:.precision$e}"), String::new()),
            Some('r') => (format_significant(magnitude, precision.max(1)), String::new()),
            Some('s') => {
                let (scaled, prefix) = si_prefix(magnitude);
                (
                    format_significant(scaled, precision.max(1)),
                    prefix.to_string(),
                )
            }
            _ => (magnitude.to_string(), String::new()),
        };

        if self.grouping {
            digits = group_thousands(&digits);
        }

        let body = format!(
            "{}{}{}",
            if self.currency { "$" } else { "" },
            digits,
            suffix
        );

        let is_zero = digits.chars().all(|c| !c.is_ascii_digit() || c == '0');
        match (negative && !is_zero, self.sign) {
            (true, '(') => format!("({body})"),
            (true, _) => format!("-{body}"),
            (false, '+') => format!("+{body}"),
            (false, ' ') => format!(" {body}"),
            (false, _) => body,
        }
    }
}

/// Round to `digits` significant digits and render without exponent
fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return format!("{:.prec$}", 0.0, prec = digits.saturating_sub(1));
    }
    let exponent = value.log10().floor() as i32;
    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    let factor = 10f64.powi(digits as i32 - 1 - exponent);
    let rounded = (value * factor).round() / factor;
    format!("{rounded:.decimals$}")
}

fn si_prefix(value: f64) -> (f64, &'static str) {
    if value == 0.0 {
        return (0.0, "");
    }
    let exponent = ((value.log10() / 3.0).floor() as i32).clamp(-8, 8);
    let scaled = value / 10f64.powi(exponent * 3);
    (scaled, PREFIXES[(exponent + 8) as usize])
}

fn group_thousands(digits: &str) -> String {
    let (int_part, rest) = match digits.find(|c: char| c == '.' || c == 'e') {
        Some(idx) => digits.split_at(idx),
        None => (digits, ""),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(rest);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(",.2f", 1234.567, "1,234.57")]
    #[case(",.1f", -1234567.0, "-1,234,567.0")]
    #[case(".1%", 0.123, "12.3%")]
    #[case(",.1%", 12.5, "1,250.0%")]
    #[case(".3s", 1500.0, "1.50k")]
    #[case(".1s", 0.004, "4m")]
    #[case(".4r", 3.14159, "3.142")]
    #[case("+,", 1234.0, "+1,234")]
    #[case("$,.2f", 1234.5, "$1,234.50")]
    #[case("(.1f", -2.0, "(2.0)")]
    #[case("d", 2.7, "3")]
    #[case("", 0.5, "0.5")]
    fn test_number_format(#[case] pattern: &str, #[case] value: f64, #[case] expected: &str) {
        let format = NumberFormat::parse(pattern).unwrap();
        assert_eq!(format.format(value), expected);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            NumberFormat::parse("abc"),
            Err(MosaicScaleError::InvalidNumberFormat(_))
        ));
    }

    #[test]
    fn test_negative_zero_has_no_sign() {
        let format = NumberFormat::parse(".1f").unwrap();
        assert_eq!(format.format(-0.01), "0.0");
    }
}
