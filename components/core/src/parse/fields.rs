//! Field Parsers (C2): strict string→typed-value decoders for every ORC-20 instruction field.
//!
//! Every field arrives as a JSON string inside `content.params`. Each parser here takes the
//! `params` object and a field name and returns a typed value or a `ParseError` describing
//! exactly which field and why, matching spec §4.2's "strict conversion" rule: no silent
//! coercion, no sign prefixes, no trailing garbage.

use bigdecimal::BigDecimal;
use serde_json::Map;
use serde_json::Value;
use std::str::FromStr;

use super::error::ParseError;
use crate::arithmetic;

pub const MAX_DEC: i32 = 18;

fn get_str<'a>(params: &'a Map<String, Value>, field: &str) -> Result<&'a str, ParseError> {
    match params.get(field) {
        None => Err(ParseError::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ParseError::Malformed {
            field: field.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn get_str_opt<'a>(params: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, ParseError> {
    match params.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ParseError::Malformed {
            field: field.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

/// Rejects any key in `params` that isn't in `allowed` (spec §4.2: "unknown keys ... are a parse
/// error").
pub fn reject_unknown_keys(params: &Map<String, Value>, allowed: &[&str]) -> Result<(), ParseError> {
    for key in params.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ParseError::UnknownField(key.clone()));
        }
    }
    Ok(())
}

/// `tick`: non-empty, UTF-8, lowercased, ≤255 bytes after lowercasing.
pub fn parse_tick(params: &Map<String, Value>, field: &str) -> Result<String, ParseError> {
    let raw = get_str(params, field)?;
    let tick = raw.to_lowercase();
    if tick.is_empty() {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if tick.len() > 255 {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "must be at most 255 bytes".to_string(),
        });
    }
    Ok(tick)
}

/// `tid`/`oid`: integer string → i64.
pub fn parse_id(params: &Map<String, Value>, field: &str) -> Result<i64, ParseError> {
    let raw = get_str(params, field)?;
    raw.parse::<i64>().map_err(|_| ParseError::Malformed {
        field: field.to_string(),
        reason: "expected an integer string".to_string(),
    })
}

/// `dec`: optional integer string in `[0,18]`, default 18.
pub fn parse_dec(params: &Map<String, Value>, field: &str) -> Result<i32, ParseError> {
    match get_str_opt(params, field)? {
        None => Ok(MAX_DEC),
        Some(raw) => {
            let dec = raw.parse::<i32>().map_err(|_| ParseError::Malformed {
                field: field.to_string(),
                reason: "expected an integer string".to_string(),
            })?;
            if !(0..=MAX_DEC).contains(&dec) {
                return Err(ParseError::OutOfRange {
                    field: field.to_string(),
                    reason: format!("must be within [0,{MAX_DEC}]"),
                });
            }
            Ok(dec)
        }
    }
}

/// `ug`/`mp`: optional lowercased `"true"|"false"`, default false.
pub fn parse_bool_flag(params: &Map<String, Value>, field: &str) -> Result<bool, ParseError> {
    match get_str_opt(params, field)? {
        None => Ok(false),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ParseError::Malformed {
                field: field.to_string(),
                reason: "expected \"true\" or \"false\"".to_string(),
            }),
        },
    }
}

/// `dl`: integer string, must be strictly greater than `timestamp`.
pub fn parse_deadline(params: &Map<String, Value>, field: &str, timestamp: i64) -> Result<i64, ParseError> {
    let raw = get_str(params, field)?;
    let dl = raw.parse::<i64>().map_err(|_| ParseError::Malformed {
        field: field.to_string(),
        reason: "expected an integer string".to_string(),
    })?;
    if dl <= timestamp {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "must be strictly greater than the event timestamp".to_string(),
        });
    }
    Ok(dl)
}

/// Decimal-string → `BigDecimal`, with no sign prefix and no more than `dec` fractional digits.
fn parse_raw_decimal(raw: &str, field: &str, dec: i32) -> Result<BigDecimal, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if raw.starts_with('+') || raw.starts_with('-') {
        return Err(ParseError::Malformed {
            field: field.to_string(),
            reason: "sign prefixes are not allowed".to_string(),
        });
    }
    if !raw.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ParseError::Malformed {
            field: field.to_string(),
            reason: "expected a plain decimal string".to_string(),
        });
    }
    let fractional_digits = match raw.split_once('.') {
        Some((_, frac)) => frac.len() as i32,
        None => 0,
    };
    if fractional_digits > dec {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: format!("at most {dec} fractional digits allowed"),
        });
    }
    BigDecimal::from_str(raw).map_err(|_| ParseError::Malformed {
        field: field.to_string(),
        reason: "expected a decimal string".to_string(),
    })
}

/// `amt`/`supply`/`max`/`lim`/`mba`/`er`-family: decimal string parsed at 38-digit precision,
/// checked against `[0, upper]` (where `upper` is typically `lim` or `max`, the caller's choice),
/// rejecting zero unless `be_zero`, and always rejecting spec's reserved upper bound even if
/// `upper` would otherwise allow it.
pub fn parse_amount(
    params: &Map<String, Value>,
    field: &str,
    dec: i32,
    upper: Option<&BigDecimal>,
    be_zero: bool,
) -> Result<BigDecimal, ParseError> {
    let raw = get_str(params, field)?;
    let value = parse_raw_decimal(raw, field, dec)?;
    if value >= arithmetic::max_amt() {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "meets or exceeds the reserved maximum amount".to_string(),
        });
    }
    if arithmetic::is_zero(&value) && !be_zero {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "must not be zero".to_string(),
        });
    }
    if value < arithmetic::zero(dec) {
        return Err(ParseError::OutOfRange {
            field: field.to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    if let Some(upper) = upper {
        if &value > upper {
            return Err(ParseError::OutOfRange {
                field: field.to_string(),
                reason: "exceeds the allowed upper bound".to_string(),
            });
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("100" => true; "plain integer")]
    #[test_case("1.50" => true; "trailing zero fraction")]
    #[test_case("" => false; "empty string")]
    #[test_case("+5" => false; "leading plus sign")]
    #[test_case("-5" => false; "leading minus sign")]
    #[test_case("5e10" => false; "scientific notation")]
    #[test_case("1.234" => false; "too many fractional digits for dec=2")]
    fn parse_raw_decimal_accepts_only_plain_unsigned_decimals(raw: &str) -> bool {
        parse_raw_decimal(raw, "amt", 2).is_ok()
    }

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_parse_tick_lowercases_and_bounds() {
        let p = params(json!({"tick": "FOO"}));
        assert_eq!(parse_tick(&p, "tick").unwrap(), "foo");

        let p = params(json!({"tick": ""}));
        assert!(parse_tick(&p, "tick").is_err());

        let long = "a".repeat(256);
        let p = params(json!({"tick": long}));
        assert!(parse_tick(&p, "tick").is_err());
    }

    #[test]
    fn test_parse_dec_default_and_bounds() {
        let p = params(json!({}));
        assert_eq!(parse_dec(&p, "dec").unwrap(), 18);

        let p = params(json!({"dec": "19"}));
        assert!(parse_dec(&p, "dec").is_err());

        let p = params(json!({"dec": "0"}));
        assert_eq!(parse_dec(&p, "dec").unwrap(), 0);
    }

    #[test]
    fn test_parse_bool_flag() {
        let p = params(json!({"ug": "TRUE"}));
        assert!(parse_bool_flag(&p, "ug").unwrap());
        let p = params(json!({}));
        assert!(!parse_bool_flag(&p, "ug").unwrap());
        let p = params(json!({"ug": "yes"}));
        assert!(parse_bool_flag(&p, "ug").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_sign_and_zero() {
        let p = params(json!({"amt": "-5"}));
        assert!(parse_amount(&p, "amt", 18, None, false).is_err());

        let p = params(json!({"amt": "0"}));
        assert!(parse_amount(&p, "amt", 18, None, false).is_err());
        assert!(parse_amount(&p, "amt", 18, None, true).is_ok());
    }

    #[test]
    fn test_parse_amount_respects_upper_and_fraction_limit() {
        let lim = BigDecimal::from_str("10").unwrap();
        let p = params(json!({"amt": "11"}));
        assert!(parse_amount(&p, "amt", 0, Some(&lim), false).is_err());

        let p = params(json!({"amt": "1.5"}));
        assert!(parse_amount(&p, "amt", 0, None, false).is_err());
    }

    #[test]
    fn test_parse_amount_rejects_reserved_upper_bound() {
        let huge = "18446744073709551615.999999999999999999";
        let p = params(json!({"amt": huge}));
        assert!(parse_amount(&p, "amt", 18, None, false).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let p = params(json!({"tick": "foo", "bogus": "1"}));
        assert!(reject_unknown_keys(&p, &["tick"]).is_err());
        assert!(reject_unknown_keys(&p, &["tick", "bogus"]).is_ok());
    }

    #[test]
    fn test_parse_deadline_must_exceed_timestamp() {
        let p = params(json!({"dl": "100"}));
        assert!(parse_deadline(&p, "dl", 100).is_err());
        assert!(parse_deadline(&p, "dl", 99).is_ok());
    }
}
