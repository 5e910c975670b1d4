//! Human-readable cadence strings: `"500"` (milliseconds), `"2s"`,
//! `"1 minute"`, `"1.5 hours"`, or a bare unit like `"second"`.

use thiserror::Error;
use web_time::Duration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CadenceError {
    #[error("empty cadence")]
    Empty,
    #[error("invalid amount in cadence `{0}`")]
    InvalidAmount(String),
    #[error("unknown cadence unit `{0}`")]
    UnknownUnit(String),
    #[error("cadence `{0}` is not positive")]
    NotPositive(String),
}

pub fn parse_cadence(input: &str) -> Result<Duration, CadenceError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CadenceError::Empty);
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (amount, unit) = trimmed.split_at(split);

    let amount: f64 = if amount.is_empty() {
        1.0
    } else {
        amount
            .parse()
            .map_err(|_| CadenceError::InvalidAmount(trimmed.to_string()))?
    };

    let unit_ms = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60_000.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3_600_000.0,
        "d" | "day" | "days" => 86_400_000.0,
        other => return Err(CadenceError::UnknownUnit(other.to_string())),
    };

    let ms = amount * unit_ms;
    if !(ms > 0.0) || !ms.is_finite() {
        return Err(CadenceError::NotPositive(trimmed.to_string()));
    }
    Ok(Duration::from_secs_f64(ms / 1_000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_amounts_and_units() {
        assert_eq!(parse_cadence("500"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_cadence("250 ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_cadence("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_cadence("1 minute"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_cadence("5 minutes"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_cadence("1.5 hours"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_cadence("1 day"), Ok(Duration::from_secs(86_400)));
    }

    #[test]
    fn bare_unit_means_one() {
        assert_eq!(parse_cadence("second"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_cadence("minute"), Ok(Duration::from_secs(60)));
    }

    #[test]
    fn rejects_junk() {
        assert_eq!(parse_cadence(""), Err(CadenceError::Empty));
        assert_eq!(parse_cadence("   "), Err(CadenceError::Empty));
        assert_eq!(
            parse_cadence("1.2.3 s"),
            Err(CadenceError::InvalidAmount("1.2.3 s".into()))
        );
        assert_eq!(
            parse_cadence("5 fortnights"),
            Err(CadenceError::UnknownUnit("fortnights".into()))
        );
        assert_eq!(
            parse_cadence("0 s"),
            Err(CadenceError::NotPositive("0 s".into()))
        );
        assert!(matches!(
            parse_cadence("-5 s"),
            Err(CadenceError::UnknownUnit(_))
        ));
    }
}
