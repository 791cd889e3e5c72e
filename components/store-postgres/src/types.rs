//! A `ToSql`/`FromSql` wrapper around [`bigdecimal::BigDecimal`] that speaks Postgres' binary
//! `NUMERIC` wire format directly, the way `chainhook-postgres::types::PgNumericU64` wraps `u64`
//! for the `brc20` meta-protocol tables. We need our own wrapper (rather than a community crate's
//! `rust_decimal` binding) because every ledger quantity in this store is `NUMERIC(38,18)`, which
//! exceeds `rust_decimal`'s 96-bit mantissa; `bigdecimal` has no arbitrary size limit.

use std::error::Error;

use bigdecimal::BigDecimal;
use bytes::{BufMut, BytesMut};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const DIGIT_GROUP: i64 = 4;

/// Wraps a `BigDecimal` so it can be bound into/read out of a `NUMERIC` column.
#[derive(Clone, Debug, PartialEq)]
pub struct PgNumeric(pub BigDecimal);

impl From<BigDecimal> for PgNumeric {
    fn from(value: BigDecimal) -> Self {
        PgNumeric(value)
    }
}

impl From<PgNumeric> for BigDecimal {
    fn from(value: PgNumeric) -> Self {
        value.0
    }
}

struct NumericParts {
    sign: u16,
    weight: i16,
    dscale: u16,
    digits: Vec<i16>,
}

fn decimal_to_parts(value: &BigDecimal) -> NumericParts {
    let (int_val, exponent) = value.as_bigint_and_exponent();
    // value == int_val * 10^(-exponent); exponent is the number of digits after the point.
    let (sign, int_val) = match int_val.sign() {
        Sign::Minus => (NUMERIC_NEG, -int_val),
        _ => (NUMERIC_POS, int_val),
    };
    let dscale = exponent.max(0) as u16;

    if int_val.is_zero() {
        return NumericParts {
            sign: NUMERIC_POS,
            weight: 0,
            dscale,
            digits: vec![],
        };
    }

    let mut digit_str = int_val.to_str_radix(10);
    // `point_pos` counts decimal digits to the left of the point in `digit_str`.
    let mut point_pos = digit_str.len() as i64 - exponent;

    let left_pad = ((DIGIT_GROUP - point_pos.rem_euclid(DIGIT_GROUP)) % DIGIT_GROUP) as usize;
    if left_pad > 0 {
        digit_str = format!("{}{}", "0".repeat(left_pad), digit_str);
        point_pos += left_pad as i64;
    }
    let frac_len = digit_str.len() as i64 - point_pos;
    let right_pad = ((DIGIT_GROUP - frac_len.rem_euclid(DIGIT_GROUP)) % DIGIT_GROUP) as usize;
    if right_pad > 0 {
        digit_str.push_str(&"0".repeat(right_pad));
    }

    let weight = (point_pos / DIGIT_GROUP) as i16 - 1;
    let mut digits: Vec<i16> = digit_str
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap().parse::<i16>().unwrap())
        .collect();

    // Trim trailing all-zero groups; dscale (display scale) is unaffected.
    while digits.last() == Some(&0) {
        digits.pop();
    }

    NumericParts {
        sign,
        weight,
        dscale,
        digits,
    }
}

fn parts_to_decimal(weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Result<BigDecimal, String> {
    if sign == NUMERIC_NAN {
        return Err("NaN numeric value is not representable as a BigDecimal".to_string());
    }
    if digits.is_empty() {
        return Ok(BigDecimal::new(BigInt::from(0), dscale as i64));
    }

    let mut digit_str = String::new();
    for d in digits {
        digit_str.push_str(&format!("{:04}", d));
    }
    let unscaled: BigInt = digit_str.parse().map_err(|e| format!("malformed numeric digits: {e}"))?;
    let unscaled = if sign == NUMERIC_NEG { -unscaled } else { unscaled };

    // The group at `weight` ends `((weight + 1) * 4)` decimal digits after the string start; the
    // implied exponent (digits after the point) is the total digit count minus that.
    let exponent = digit_str.len() as i64 - (weight as i64 + 1) * DIGIT_GROUP;
    let value = BigDecimal::new(unscaled, exponent);
    // Re-quantize to the wire dscale so trailing-zero trimming above doesn't change round-trips.
    Ok(value.with_scale(dscale as i64))
}

impl ToSql for PgNumeric {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        assert_within_ledger_precision(&self.0)?;
        let parts = decimal_to_parts(&self.0);
        out.put_u16(parts.digits.len() as u16);
        out.put_i16(parts.weight);
        out.put_u16(parts.sign);
        out.put_u16(parts.dscale);
        for d in &parts.digits {
            out.put_i16(*d);
        }
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::NUMERIC)
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        if raw.len() < 8 {
            return Err("invalid numeric wire format: too short".into());
        }
        let ndigits = u16::from_be_bytes([raw[0], raw[1]]) as usize;
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = u16::from_be_bytes([raw[6], raw[7]]);
        let mut digits = Vec::with_capacity(ndigits);
        let mut cursor = 8usize;
        for _ in 0..ndigits {
            if cursor + 2 > raw.len() {
                return Err("invalid numeric wire format: truncated digits".into());
            }
            digits.push(i16::from_be_bytes([raw[cursor], raw[cursor + 1]]));
            cursor += 2;
        }
        let value = parts_to_decimal(weight, sign, dscale, &digits)?;
        Ok(PgNumeric(value))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(*ty, Type::NUMERIC)
    }
}

/// Convenience conversion used when a column might legitimately be unbounded (e.g. unseen
/// `max_uint64`-scale balances); clamps nothing, just documents the precision ceiling.
pub fn assert_within_ledger_precision(value: &BigDecimal) -> Result<(), String> {
    let (digits, _) = value.as_bigint_and_exponent();
    if digits.to_string().trim_start_matches('-').len() > 38 {
        return Err("value exceeds 38-digit ledger precision".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use test_case::test_case;

    #[test_case("0" => true; "zero")]
    #[test_case("12345678901234567890123456789012345678" => true; "exactly 38 digits")]
    #[test_case("123456789012345678901234567890123456789" => false; "39 digits")]
    #[test_case("-12345678901234567890123456789012345678" => true; "negative at the limit")]
    fn assert_within_ledger_precision_enforces_38_digits(raw: &str) -> bool {
        let value = BigDecimal::from_str(raw).unwrap();
        assert_within_ledger_precision(&value).is_ok()
    }

    fn roundtrip(s: &str) {
        let value = BigDecimal::from_str(s).unwrap();
        let parts = decimal_to_parts(&value);
        let back = parts_to_decimal(parts.weight, parts.sign, parts.dscale, &parts.digits).unwrap();
        assert_eq!(value, back, "roundtrip mismatch for {s}");
    }

    #[test]
    fn test_numeric_roundtrip_basic_values() {
        roundtrip("0");
        roundtrip("0.00");
        roundtrip("10");
        roundtrip("100.5");
        roundtrip("0.001");
        roundtrip("0.0000005");
        roundtrip("12345.6789");
        roundtrip("18446744073709551615.999999999999999999");
        roundtrip("-42.5");
    }
}
