use std::sync::LazyLock;

use regex::Regex;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Read a relevance score out of free-form model output.
///
/// Takes the first run of ASCII digits and clamps it to `0..=100`.
/// Text without digits scores zero.
pub fn parse_score(text: &str) -> f64 {
    DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|n| n.clamp(MIN_SCORE, MAX_SCORE))
        .unwrap_or(MIN_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number() {
        assert_eq!(parse_score("87"), 87.0);
        assert_eq!(parse_score(" 42\n"), 42.0);
    }

    #[test]
    fn first_number_wins() {
        assert_eq!(parse_score("Score: 75/100"), 75.0);
    }

    #[test]
    fn decimals_keep_integer_part() {
        assert_eq!(parse_score("88.5"), 88.0);
    }

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(parse_score("250"), 100.0);
        assert_eq!(parse_score("99999999999999999999999"), 100.0);
    }

    #[test]
    fn no_digits_is_zero() {
        assert_eq!(parse_score("не знаю"), 0.0);
        assert_eq!(parse_score(""), 0.0);
        assert_eq!(parse_score("-"), 0.0);
    }

    #[test]
    fn ignores_non_ascii_digits() {
        assert_eq!(parse_score("٣ then 7"), 7.0);
    }
}
