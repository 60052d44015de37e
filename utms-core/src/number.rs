//! Arbitrary precision numbers using dashu
//!
//! Every timestamp, unit length and conversion result is a `Number`.
//! Built on dashu-float's DBig (decimal floating point) with a fixed working
//! precision, so a Planck time (~5e-44 s) and a Galaxial Era (~3e127 s) carry
//! the same number of significant digits.

use dashu_float::DBig;
use dashu_float::ops::{SquareRoot, Abs};
use dashu_int::IBig;
use dashu_int::ops::BitTest;
use serde::{Deserialize, Serialize, Serializer, Deserializer};
use thiserror::Error;

/// Error type for number operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),
}

/// Working precision for calculations (significant decimal digits)
pub const WORK_PRECISION: usize = 50;

/// Arbitrary precision decimal number
///
/// All operations return Results or new Numbers - never panic.
#[derive(Debug, Clone)]
pub struct Number {
    inner: DBig,
}

/// A number split into rounded significant digits and a power of ten.
///
/// `digits = "34722"`, `exponent = 3` reads as `3.4722e3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scientific {
    pub negative: bool,
    pub digits: String,
    pub exponent: i64,
}

impl Scientific {
    /// Mantissa with a decimal point after the first digit ("3.4722")
    pub fn mantissa(&self) -> String {
        let sign = if self.negative { "-" } else { "" };
        if self.digits.len() <= 1 {
            format!("{}{}", sign, self.digits)
        } else {
            format!("{}{}.{}", sign, &self.digits[..1], &self.digits[1..])
        }
    }
}

impl std::fmt::Display for Scientific {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}e{}", self.mantissa(), self.exponent)
    }
}

impl Number {
    // ========== Construction ==========

    /// Ensure a DBig has adequate precision for calculations
    fn with_work_precision(val: DBig) -> DBig {
        val.with_precision(WORK_PRECISION).value()
    }

    fn from_dbig(val: DBig) -> Self {
        Self { inner: Self::with_work_precision(val) }
    }

    /// Create from string representation
    /// Supports: "123", "3.14", "1/3", "1.5e10", "-42", "5.391247e-44"
    ///
    /// Decimal and scientific literals are parsed digit by digit into
    /// `significand * 10^exponent`, so no binary float is ever involved.
    pub fn from_str(s: &str) -> Result<Self, NumberError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NumberError::ParseError(s.to_string()));
        }

        // Handle rational format "a/b"
        if s.contains('/') {
            let parts: Vec<&str> = s.split('/').collect();
            if parts.len() != 2 {
                return Err(NumberError::ParseError(s.to_string()));
            }
            let num = Self::from_str(parts[0])?;
            let den = Self::from_str(parts[1])?;
            return num.checked_div(&den);
        }

        let lower = s.to_lowercase();
        let (mantissa, exp) = match lower.split_once('e') {
            Some((m, e)) => {
                let exp: isize = e.trim_start_matches('+').parse()
                    .map_err(|_| NumberError::ParseError(s.to_string()))?;
                (m, exp)
            }
            None => (lower.as_str(), 0),
        };

        let (negative, unsigned) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };

        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(NumberError::ParseError(s.to_string()));
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(NumberError::ParseError(s.to_string()));
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mut significand: IBig = digits.parse()
            .map_err(|_| NumberError::ParseError(s.to_string()))?;
        if negative {
            significand = -significand;
        }
        let exponent = isize::try_from(frac_part.len()).ok()
            .and_then(|shift| exp.checked_sub(shift))
            .ok_or_else(|| NumberError::ParseError(s.to_string()))?;

        Ok(Self::from_dbig(DBig::from_parts(significand, exponent)))
    }

    /// Create from i64 with working precision
    pub fn from_i64(n: i64) -> Self {
        Self::from_dbig(DBig::from(n))
    }

    /// Create from ratio (exact division)
    pub fn from_ratio(num: i64, den: i64) -> Self {
        if den == 0 {
            return Self::zero();
        }
        let n = Self::with_work_precision(DBig::from(num));
        let d = Self::with_work_precision(DBig::from(den));
        Self { inner: n / d }
    }

    /// Create from f64 (display or test input only; may lose precision)
    pub fn from_f64(f: f64) -> Self {
        if f.is_nan() || f.is_infinite() {
            return Self::zero();
        }
        Self::from_str(&format!("{:e}", f)).unwrap_or_else(|_| Self::zero())
    }

    /// `10^exp`, exact for any exponent
    pub fn pow10(exp: i64) -> Self {
        Self::from_dbig(DBig::from_parts(IBig::from(1), exp as isize))
    }

    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    pub fn one() -> Self {
        Self::from_i64(1)
    }

    // ========== Predicates ==========

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.inner == DBig::ZERO
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.inner < DBig::ZERO
    }

    /// Check if strictly positive
    pub fn is_positive(&self) -> bool {
        self.inner > DBig::ZERO
    }

    /// Check if value is an integer
    pub fn is_integer(&self) -> bool {
        let floor_val = self.inner.clone().floor();
        self.inner == floor_val
    }

    /// `|self - other| <= epsilon * max(1, |self|, |other|)`
    pub fn approx_eq(&self, other: &Self, epsilon: &Self) -> bool {
        let scale = self.abs().max(other.abs()).max(Self::one());
        self.sub(other).abs() <= epsilon.mul(&scale)
    }

    // ========== Basic Arithmetic ==========

    /// Addition
    pub fn add(&self, other: &Self) -> Self {
        Self { inner: &self.inner + &other.inner }
    }

    /// Subtraction
    pub fn sub(&self, other: &Self) -> Self {
        Self { inner: &self.inner - &other.inner }
    }

    /// Multiplication
    pub fn mul(&self, other: &Self) -> Self {
        Self { inner: &self.inner * &other.inner }
    }

    /// Negation
    pub fn neg(&self) -> Self {
        Self { inner: -&self.inner }
    }

    /// Safe division (returns Result, never panics)
    pub fn checked_div(&self, other: &Self) -> Result<Self, NumberError> {
        if other.is_zero() {
            Err(NumberError::DivisionByZero)
        } else {
            Ok(Self { inner: &self.inner / &other.inner })
        }
    }

    /// Floored quotient: `floor(self / other)`
    pub fn div_floor(&self, other: &Self) -> Result<Self, NumberError> {
        Ok(self.checked_div(other)?.floor())
    }

    /// Floored modulo: `self - other * floor(self / other)`
    ///
    /// Takes the sign of `other`, so pre-epoch timestamps still land in
    /// `[0, other)` for a positive period.
    pub fn rem_floor(&self, other: &Self) -> Result<Self, NumberError> {
        let q = self.div_floor(other)?;
        Ok(self.sub(&other.mul(&q)))
    }

    /// Integer power (exact)
    pub fn pow(&self, exp: i32) -> Self {
        if exp == 0 {
            return Self::one();
        }

        let mut result = Self::one();
        for _ in 0..exp.unsigned_abs() {
            result = result.mul(self);
        }

        if exp < 0 {
            Self::one().checked_div(&result).unwrap_or_else(|_| Self::zero())
        } else {
            result
        }
    }

    /// Square root
    pub fn sqrt(&self, precision: u32) -> Result<Self, NumberError> {
        if self.is_negative() {
            return Err(NumberError::DomainError(
                "square root of negative number".to_string()
            ));
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }

        let val = self.inner.clone().with_precision(precision as usize).value();
        Ok(Self::from_dbig(val.sqrt()))
    }

    // ========== Other Operations ==========

    /// Absolute value
    pub fn abs(&self) -> Self {
        Self { inner: Abs::abs(self.inner.clone()) }
    }

    /// Floor - largest integer <= x
    pub fn floor(&self) -> Self {
        Self { inner: self.inner.clone().floor() }
    }

    /// Ceiling - smallest integer >= x
    pub fn ceil(&self) -> Self {
        Self { inner: self.inner.clone().ceil() }
    }

    /// Try to convert to i64
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }

        // DBig stores as significand * 10^exponent
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let sig_i64: i64 = significand.try_into().ok()?;

        if exponent == 0 {
            Some(sig_i64)
        } else if exponent > 0 && exponent <= 18 {
            sig_i64.checked_mul(10_i64.checked_pow(exponent as u32)?)
        } else if exponent < 0 && exponent >= -18 {
            let divisor = 10_i64.checked_pow((-exponent) as u32)?;
            if sig_i64 % divisor == 0 {
                Some(sig_i64 / divisor)
            } else {
                None
            }
        } else {
            None
        }
    }

    /// Convert to f64 (may lose precision)
    pub fn to_f64(&self) -> Option<f64> {
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();

        let sig_f64: f64 = if significand.bit_len() <= 53 {
            let value: i64 = significand.try_into().ok()?;
            value as f64
        } else {
            // Significand too large - shift right to fit in 53 bits
            let extra_bits = significand.bit_len() - 53;
            let shifted = &significand >> extra_bits;
            let shifted_i64: i64 = shifted.try_into().ok()?;
            shifted_i64 as f64 * 2_f64.powi(extra_bits as i32)
        };

        let result = if exponent == 0 {
            sig_f64
        } else if exponent > 0 && exponent <= 308 {
            sig_f64 * 10_f64.powi(exponent as i32)
        } else if exponent < 0 && exponent >= -308 {
            sig_f64 / 10_f64.powi((-exponent) as i32)
        } else {
            return None;
        };

        if result.is_finite() {
            Some(result)
        } else {
            None
        }
    }

    /// Base-10 logarithm as f64, valid for any positive magnitude
    pub fn log10(&self) -> Option<f64> {
        if !self.is_positive() {
            return None;
        }
        let sci = self.to_scientific(17)?;
        let mantissa: f64 = sci.mantissa().parse().ok()?;
        Some(mantissa.log10() + sci.exponent as f64)
    }

    // ========== Decimal digits ==========

    /// Sign, decimal digits of the significand (no trailing zeros) and the
    /// power of ten they are scaled by.
    fn parts(&self) -> (bool, String, i64) {
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let negative = significand < IBig::ZERO;
        let text = significand.to_string();
        let digits = text.trim_start_matches('-');
        let trimmed = digits.trim_end_matches('0');
        let exponent = exponent as i64 + (digits.len() - trimmed.len()) as i64;
        (negative, trimmed.to_string(), exponent)
    }

    /// Power of ten of the leading significant digit; `None` for zero
    pub fn magnitude(&self) -> Option<i64> {
        if self.is_zero() {
            return None;
        }
        let (_, digits, exponent) = self.parts();
        Some(exponent + digits.len() as i64 - 1)
    }

    /// Round to `sig` significant digits; `None` for zero
    pub fn to_scientific(&self, sig: usize) -> Option<Scientific> {
        if self.is_zero() {
            return None;
        }
        let (negative, digits, exponent) = self.parts();
        let lead = exponent + digits.len() as i64 - 1;
        let (rounded, carry) = round_digits(&digits, sig.max(1));
        Some(Scientific {
            negative,
            digits: rounded,
            exponent: if carry { lead + 1 } else { lead },
        })
    }

    /// Fixed-point rendering with exactly `places` decimals (half away from zero)
    pub fn to_fixed(&self, places: usize) -> String {
        let zero = || {
            if places == 0 {
                "0".to_string()
            } else {
                format!("0.{}", "0".repeat(places))
            }
        };
        if self.is_zero() {
            return zero();
        }

        let (negative, digits, exponent) = self.parts();
        // round(|value| * 10^places) as a digit string
        let shift = exponent + places as i64;
        let keep = digits.len() as i64 + shift;
        let scaled = if shift >= 0 {
            format!("{}{}", digits, "0".repeat(shift as usize))
        } else if keep > 0 {
            let (mut rounded, carry) = round_digits(&digits, keep as usize);
            if carry {
                rounded.push('0');
            }
            rounded
        } else if keep == 0 && digits.as_bytes()[0] >= b'5' {
            "1".to_string()
        } else {
            return zero();
        };

        let padded = if scaled.len() <= places {
            format!("{}{}", "0".repeat(places + 1 - scaled.len()), scaled)
        } else {
            scaled
        };
        let split = padded.len() - places;
        let int_part = padded[..split].trim_start_matches('0');
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        let frac_part = &padded[split..];

        let all_zero = int_part == "0" && frac_part.chars().all(|c| c == '0');
        let sign = if negative && !all_zero { "-" } else { "" };
        if places == 0 {
            format!("{}{}", sign, int_part)
        } else {
            format!("{}{}.{}", sign, int_part, frac_part)
        }
    }

    /// Render with N significant figures: plain within 1e-3..1e5, scientific outside
    pub fn as_sigfigs(&self, sigfigs: u32) -> String {
        let sci = match self.to_scientific(sigfigs.max(1) as usize) {
            Some(sci) => sci,
            None => return "0".to_string(),
        };
        if sci.exponent >= -3 && sci.exponent <= 4 {
            let places = (sigfigs as i64 - sci.exponent - 1).max(0) as usize;
            self.to_fixed(places)
        } else {
            sci.to_string()
        }
    }

    /// Exact decimal string without exponent notation
    pub fn to_plain_string(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let (negative, digits, exponent) = self.parts();
        let sign = if negative { "-" } else { "" };
        if exponent >= 0 {
            return format!("{}{}{}", sign, digits, "0".repeat(exponent as usize));
        }
        let frac_len = (-exponent) as usize;
        if digits.len() > frac_len {
            let split = digits.len() - frac_len;
            format!("{}{}.{}", sign, &digits[..split], &digits[split..])
        } else {
            format!("{}0.{}{}", sign, "0".repeat(frac_len - digits.len()), digits)
        }
    }

    /// Lossless `significand e exponent` form used for serialization
    fn to_repr_string(&self) -> String {
        let (negative, digits, exponent) = self.parts();
        if self.is_zero() {
            return "0".to_string();
        }
        let sign = if negative { "-" } else { "" };
        if exponent == 0 {
            format!("{}{}", sign, digits)
        } else {
            format!("{}{}e{}", sign, digits, exponent)
        }
    }
}

/// Keep the first `keep` digits, rounding half away from zero.
/// Returns the kept digits (always `keep` long) and whether rounding carried
/// into a new leading digit.
fn round_digits(digits: &str, keep: usize) -> (String, bool) {
    let bytes = digits.as_bytes();
    if bytes.len() <= keep {
        let mut s = digits.to_string();
        s.push_str(&"0".repeat(keep - bytes.len()));
        return (s, false);
    }

    let mut kept: Vec<u8> = bytes[..keep].to_vec();
    let mut carry = false;
    if bytes[keep] >= b'5' {
        carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, b'1');
            kept.truncate(keep);
        }
    }
    (kept.into_iter().map(char::from).collect(), carry)
}

// ========== Trait Implementations ==========

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.magnitude() {
            Some(m) if !(-6..=20).contains(&m) => match self.to_scientific(WORK_PRECISION) {
                Some(sci) => {
                    let digits = sci.digits.trim_end_matches('0');
                    let trimmed = Scientific { digits: digits.to_string(), ..sci };
                    write!(f, "{}", trimmed)
                }
                None => write!(f, "0"),
            },
            _ => write!(f, "{}", self.to_plain_string()),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_repr_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawNumber::deserialize(deserializer)? {
            RawNumber::Text(s) => Self::from_str(&s).map_err(serde::de::Error::custom),
            RawNumber::Int(n) => Ok(Self::from_i64(n)),
            RawNumber::Float(f) => Ok(Self::from_f64(f)),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner.partial_cmp(&other.inner).unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Number {
        Number::from_str(s).unwrap()
    }

    #[test]
    fn test_from_str_forms() {
        assert_eq!(n("123").to_i64(), Some(123));
        assert_eq!(n("1.5e2").to_i64(), Some(150));
        assert_eq!(n("-42").to_i64(), Some(-42));
        assert_eq!(n("602214076e15"), n("602214076000000000000000"));
        assert!(!n("1/3").is_integer());
        assert!(Number::from_str("abc").is_err());
        assert!(Number::from_str("1.2.3").is_err());
        assert!(Number::from_str("").is_err());
    }

    #[test]
    fn test_extreme_exponent_rejected() {
        let err = Number::from_str("0.1e-9223372036854775808").unwrap_err();
        assert!(matches!(err, NumberError::ParseError(_)));
        assert!(Number::from_str("1e99999999999999999999").is_err());
    }

    #[test]
    fn test_tiny_and_huge_keep_digits() {
        let planck = n("5.391247e-44");
        assert_eq!(planck.magnitude(), Some(-44));
        let era = n("3.15576e127");
        assert_eq!(era.magnitude(), Some(127));
        let product = planck.mul(&era);
        assert_eq!(product.magnitude(), Some(84));
    }

    #[test]
    fn test_div_floor_negative() {
        let day = Number::from_i64(86400);
        let q = Number::from_i64(-1).div_floor(&day).unwrap();
        assert_eq!(q, Number::from_i64(-1));
        let r = Number::from_i64(-1).rem_floor(&day).unwrap();
        assert_eq!(r, Number::from_i64(86399));
    }

    #[test]
    fn test_rem_floor_fractional() {
        let r = n("90000.5").rem_floor(&Number::from_i64(86400)).unwrap();
        assert_eq!(r, n("3600.5"));
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(Number::one().checked_div(&Number::zero()), Err(NumberError::DivisionByZero));
        assert!(Number::one().rem_floor(&Number::zero()).is_err());
    }

    #[test]
    fn test_to_scientific_rounding() {
        let v = n("3472.2222222");
        let sci = v.to_scientific(5).unwrap();
        assert_eq!(sci.digits, "34722");
        assert_eq!(sci.exponent, 3);
        assert_eq!(sci.to_string(), "3.4722e3");

        let carry = n("9.99996").to_scientific(5).unwrap();
        assert_eq!(carry.to_string(), "1.0000e1");
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(n("3472.222222").to_fixed(5), "3472.22222");
        assert_eq!(n("2.5").to_fixed(0), "3");
        assert_eq!(n("-0.0004").to_fixed(3), "0.000");
        assert_eq!(n("-1.25").to_fixed(1), "-1.3");
        assert_eq!(n("0.0005").to_fixed(3), "0.001");
        assert_eq!(n("999.9996").to_fixed(3), "1000.000");
        assert_eq!(Number::from_i64(18000).to_fixed(0), "18000");
    }

    #[test]
    fn test_as_sigfigs() {
        assert_eq!(n("123.456").as_sigfigs(4), "123.5");
        assert!(n("602214076e15").as_sigfigs(4).starts_with("6.022e23"));
        assert_eq!(n("6.62607e-34").as_sigfigs(4), "6.626e-34");
    }

    #[test]
    fn test_plain_string_and_display() {
        assert_eq!(n("0.00125").to_plain_string(), "0.00125");
        assert_eq!(n("1.25e3").to_plain_string(), "1250");
        assert_eq!(n("1e-30").to_string(), "1e-30");
        assert_eq!(n("86400").to_string(), "86400");
    }

    #[test]
    fn test_serde_lossless() {
        let v = n("5.391247e-44");
        let json = serde_json::to_string(&v).unwrap();
        let back: Number = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);

        let from_int: Number = serde_json::from_str("60").unwrap();
        assert_eq!(from_int, Number::from_i64(60));
    }

    #[test]
    fn test_approx_eq() {
        let eps = n("1e-30");
        let third = Number::one().checked_div(&Number::from_i64(3)).unwrap();
        let back = third.mul(&Number::from_i64(3));
        assert!(back.approx_eq(&Number::one(), &eps));
        assert!(!n("1.001").approx_eq(&Number::one(), &eps));
    }

    #[test]
    fn test_log10() {
        let v = n("1e-44");
        let l = v.log10().unwrap();
        assert!((l + 44.0).abs() < 1e-9);
        assert!(Number::zero().log10().is_none());
    }

    #[test]
    fn test_sqrt() {
        let r = Number::from_i64(4).sqrt(50).unwrap();
        assert_eq!(r.to_i64(), Some(2));
        assert!(Number::from_i64(-4).sqrt(50).is_err());
    }

    #[test]
    fn test_pow10() {
        assert_eq!(Number::pow10(3), Number::from_i64(1000));
        assert_eq!(Number::pow10(-2), n("0.01"));
    }
}
