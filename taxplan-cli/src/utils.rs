use rust_decimal::Decimal;
use taxplan_core::calculations::common::round_half_up;
use thiserror::Error;

/// Error returned when a command-line amount cannot be parsed.
#[derive(Debug, Error)]
pub enum ParseAmountError {
    #[error("amount must not be empty")]
    Empty,

    #[error("invalid amount '{input}': {source}")]
    Invalid {
        input: String,
        #[source]
        source: rust_decimal::Error,
    },
}

/// Trims whitespace and removes commas, so both `1,500,000` and the lakh
/// grouping `15,00,000` are accepted.
fn normalize_amount_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Parses an amount given on the command line.
pub fn parse_amount(s: &str) -> Result<Decimal, ParseAmountError> {
    let normalized = normalize_amount_input(s);
    if normalized.is_empty() {
        return Err(ParseAmountError::Empty);
    }
    normalized.parse().map_err(|e| ParseAmountError::Invalid {
        input: s.to_string(),
        source: e,
    })
}

/// Two-decimal presentation form, rounded half-up.
pub fn money(d: Decimal) -> String {
    format!("{:.2}", round_half_up(d))
}

/// Percentage with one decimal place, e.g. `33.3%`.
pub fn percent(d: Decimal) -> String {
    format!("{:.1}%", d.round_dp(1))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_amount_accepts_thousands_separators() {
        assert_eq!(parse_amount("1,500,000").unwrap(), dec!(1500000));
        assert_eq!(parse_amount("15,00,000").unwrap(), dec!(1500000));
    }

    #[test]
    fn parse_amount_trims_whitespace() {
        assert_eq!(parse_amount("  46800.50 ").unwrap(), dec!(46800.50));
    }

    #[test]
    fn parse_amount_rejects_empty_input() {
        assert!(matches!(parse_amount("   "), Err(ParseAmountError::Empty)));
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        let err = parse_amount("ten lakh").unwrap_err();

        assert!(err.to_string().starts_with("invalid amount 'ten lakh'"));
    }

    #[test]
    fn parse_amount_keeps_sign_for_validation_downstream() {
        assert_eq!(parse_amount("-500").unwrap(), dec!(-500));
    }

    #[test]
    fn money_rounds_half_up_to_two_places() {
        assert_eq!(money(dec!(1234.565)), "1234.57");
        assert_eq!(money(dec!(90000)), "90000.00");
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(percent(dec!(33.3333)), "33.3%");
        assert_eq!(percent(dec!(100)), "100.0%");
    }
}
