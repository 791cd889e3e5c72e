//! Fixed-point arithmetic (C1): exact decimal add/sub/mul/div truncating to `dec` fractional
//! places, backed by an arbitrary-precision decimal so no binary float ever touches the ledger.

use bigdecimal::{BigDecimal, Signed, Zero};

/// Maximum balance: `2^64 - 1` in the integer part, 18 fractional nines.
pub fn max_amt() -> BigDecimal {
    "18446744073709551615.999999999999999999".parse().unwrap()
}

/// Zero at a given fractional-digit precision (`0`, `0.0`, `0.00`, ...).
pub fn zero(dec: i32) -> BigDecimal {
    BigDecimal::new(bigdecimal::num_bigint::BigInt::from(0), dec as i64)
}

/// Truncates (rounds toward zero) `value` to `dec` fractional digits. `BigDecimal::with_scale`
/// truncates for a decrease in scale and zero-pads for an increase, matching
/// `Decimal.quantize(..., rounding=ROUND_DOWN)`.
pub fn truncate(value: &BigDecimal, dec: i32) -> BigDecimal {
    if value.is_negative() {
        // Round-toward-zero for negatives truncates the magnitude, not the value; our ledger
        // never carries negative amounts, but this keeps the operator total.
        -(-value).with_scale(dec as i64)
    } else {
        value.with_scale(dec as i64)
    }
}

pub fn add(a: &BigDecimal, b: &BigDecimal, dec: i32) -> BigDecimal {
    truncate(&(a + b), dec)
}

/// Subtracts `b` from `a`. Callers must ensure `a >= b`; this never clamps at zero so an
/// underflow is loud (a negative result) rather than silently absorbed.
pub fn sub(a: &BigDecimal, b: &BigDecimal, dec: i32) -> BigDecimal {
    truncate(&(a - b), dec)
}

pub fn mul(a: &BigDecimal, b: &BigDecimal, dec: i32) -> BigDecimal {
    truncate(&(a * b), dec)
}

/// Truncating division. `b` must be non-zero; callers validate this upstream (e.g. an OTC's `er`
/// is always validated positive before being used as a divisor).
pub fn div(a: &BigDecimal, b: &BigDecimal, dec: i32) -> Result<BigDecimal, String> {
    if b.is_zero() {
        return Err("division by zero".to_string());
    }
    // Compute at extra precision before truncating so the final `with_scale` quantization is
    // exact rather than inheriting `bigdecimal`'s default division precision.
    let extended = a.with_scale((dec as i64) + 40) / b;
    Ok(truncate(&extended, dec))
}

pub fn is_zero(value: &BigDecimal) -> bool {
    value.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_add_sub_agree() {
        let a = d("10.333333333333333333");
        let b = d("5.666666666666666667");
        let sum = add(&a, &b, 18);
        let back = sub(&sum, &b, 18);
        assert_eq!(back, truncate(&a, 18));
    }

    #[test]
    fn test_mul_div_roundtrip_truncates() {
        let x = d("7");
        let e = d("2");
        let product = mul(&x, &e, 0);
        assert_eq!(product, d("14"));
        let quotient = div(&product, &e, 0).unwrap();
        assert_eq!(quotient, truncate(&x, 0));
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        // 10 / 3 = 3.333... truncated to 0 decimals is 3, not rounded to 3.33.
        let result = div(&d("10"), &d("3"), 0).unwrap();
        assert_eq!(result, d("3"));
    }

    #[test]
    fn test_div_by_zero_rejected() {
        assert!(div(&d("1"), &d("0"), 2).is_err());
    }

    #[test]
    fn test_zero_at_any_precision() {
        assert!(is_zero(&zero(0)));
        assert!(is_zero(&zero(18)));
    }

    #[test]
    fn test_truncate_drops_excess_fractional_digits() {
        assert_eq!(truncate(&d("1.9999"), 2), d("1.99"));
    }
}
