//! Exact decimal quantities with SI and binary suffixes.
//!
//! A [`Quantity`] is a fixed-point decimal held as an `i128` count of
//! nanos (10^-9 units) plus the display format it was parsed in. All
//! arithmetic is integer arithmetic on the nano scale, so comparison and
//! subtraction are exact regardless of the suffix the value arrived with
//! (`1Ki` and `1024` compare equal).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const NANO: i128 = 1_000_000_000;

/// Decimal SI suffixes, largest first, as (power of ten, suffix).
const DECIMAL_SUFFIXES: &[(u32, &str)] = &[
    (18, "E"),
    (15, "P"),
    (12, "T"),
    (9, "G"),
    (6, "M"),
    (3, "k"),
];

/// Binary suffixes, largest first, as (power of two, suffix).
const BINARY_SUFFIXES: &[(u32, &str)] = &[
    (60, "Ei"),
    (50, "Pi"),
    (40, "Ti"),
    (30, "Gi"),
    (20, "Mi"),
    (10, "Ki"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    #[error("malformed quantity {0:?}")]
    Malformed(String),

    #[error("quantity {0:?} out of range")]
    Overflow(String),

    #[error("quantity subtraction underflow")]
    Underflow,

    #[error("block size must be positive")]
    NonPositiveBlockSize,
}

/// The display format a quantity was parsed in.
///
/// The format never affects comparison or arithmetic; it only controls
/// how the value is rendered back to a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Binary suffixes: Ki, Mi, Gi, Ti, Pi, Ei.
    BinarySi,
    /// Decimal SI suffixes: n, u, m, (none), k, M, G, T, P, E.
    DecimalSi,
    /// Scientific notation: `123e6`.
    DecimalExponent,
}

/// An exact decimal quantity such as `7127m`, `8Gi`, or `12`.
#[derive(Debug, Clone, Copy)]
pub struct Quantity {
    nanos: i128,
    format: Format,
}

impl Quantity {
    /// A quantity from a whole number of units, rendered in decimal SI.
    pub fn from_int(value: i64) -> Self {
        Quantity {
            nanos: value as i128 * NANO,
            format: Format::DecimalSi,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.nanos == 0
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Add `other`, keeping `self`'s display format.
    pub fn checked_add(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        let nanos = self
            .nanos
            .checked_add(other.nanos)
            .ok_or_else(|| QuantityError::Overflow(self.to_string()))?;
        Ok(Quantity {
            nanos,
            format: self.format,
        })
    }

    /// Subtract `other`, keeping `self`'s display format. The allocation
    /// engine only ever subtracts a value it has already verified to fit,
    /// so a negative result indicates a caller bug and is an error.
    pub fn checked_sub(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        let nanos = self
            .nanos
            .checked_sub(other.nanos)
            .ok_or(QuantityError::Underflow)?;
        if nanos < 0 {
            return Err(QuantityError::Underflow);
        }
        Ok(Quantity {
            nanos,
            format: self.format,
        })
    }

    /// Round up to the next integral multiple of `size`.
    pub fn round_up_to_block(&self, size: &Quantity) -> Result<Quantity, QuantityError> {
        if size.nanos <= 0 {
            return Err(QuantityError::NonPositiveBlockSize);
        }
        let rem = self.nanos.rem_euclid(size.nanos);
        let nanos = if rem > 0 {
            self.nanos
                .checked_add(size.nanos - rem)
                .ok_or_else(|| QuantityError::Overflow(self.to_string()))?
        } else {
            self.nanos
        };
        Ok(Quantity {
            nanos,
            format: self.format,
        })
    }

    /// Round down to the previous integral multiple of `size`.
    pub fn round_down_to_block(&self, size: &Quantity) -> Result<Quantity, QuantityError> {
        if size.nanos <= 0 {
            return Err(QuantityError::NonPositiveBlockSize);
        }
        Ok(Quantity {
            nanos: self.nanos - self.nanos.rem_euclid(size.nanos),
            format: self.format,
        })
    }

    /// True when the value is an integral multiple of `size`.
    pub fn is_multiple_of(&self, size: &Quantity) -> bool {
        size.nanos > 0 && self.nanos.rem_euclid(size.nanos) == 0
    }
}

// Equality and ordering are value-only; `1Ki == 1024` even though the
// two render differently.
impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.nanos == other.nanos
    }
}

impl Eq for Quantity {}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.nanos.cmp(&other.nanos)
    }
}

fn pow10(exp: u32) -> Result<i128, QuantityError> {
    10i128
        .checked_pow(exp)
        .ok_or_else(|| QuantityError::Overflow(format!("1e{exp}")))
}

fn ceil_div(num: i128, den: i128) -> i128 {
    (num + den - 1) / den
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || QuantityError::Malformed(s.to_string());
        let overflow = || QuantityError::Overflow(s.to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        // Split the decimal mantissa from the suffix.
        let mut digits = String::new();
        let mut frac_len = 0u32;
        let mut seen_point = false;
        let mut idx = 0;
        for (i, c) in rest.char_indices() {
            match c {
                '0'..='9' => {
                    digits.push(c);
                    if seen_point {
                        frac_len += 1;
                    }
                }
                '.' if !seen_point => seen_point = true,
                _ => break,
            }
            idx = i + c.len_utf8();
        }
        if digits.is_empty() {
            return Err(malformed());
        }
        // i128 holds any 38-digit number; longer mantissas cannot be exact.
        if digits.len() > 38 {
            return Err(overflow());
        }
        let mantissa: i128 = digits.parse().map_err(|_| malformed())?;
        let suffix = &rest[idx..];

        enum Scale {
            Pow10(i32),
            Pow2(u32),
        }

        let (format, scale) = match suffix {
            "" => (Format::DecimalSi, Scale::Pow10(0)),
            "n" => (Format::DecimalSi, Scale::Pow10(-9)),
            "u" => (Format::DecimalSi, Scale::Pow10(-6)),
            "m" => (Format::DecimalSi, Scale::Pow10(-3)),
            "k" => (Format::DecimalSi, Scale::Pow10(3)),
            "M" => (Format::DecimalSi, Scale::Pow10(6)),
            "G" => (Format::DecimalSi, Scale::Pow10(9)),
            "T" => (Format::DecimalSi, Scale::Pow10(12)),
            "P" => (Format::DecimalSi, Scale::Pow10(15)),
            "E" => (Format::DecimalSi, Scale::Pow10(18)),
            "Ki" => (Format::BinarySi, Scale::Pow2(10)),
            "Mi" => (Format::BinarySi, Scale::Pow2(20)),
            "Gi" => (Format::BinarySi, Scale::Pow2(30)),
            "Ti" => (Format::BinarySi, Scale::Pow2(40)),
            "Pi" => (Format::BinarySi, Scale::Pow2(50)),
            "Ei" => (Format::BinarySi, Scale::Pow2(60)),
            _ => {
                let exp = suffix
                    .strip_prefix('e')
                    .or_else(|| suffix.strip_prefix('E'))
                    .and_then(|e| e.parse::<i32>().ok())
                    .ok_or_else(malformed)?;
                if exp.unsigned_abs() > 30 {
                    return Err(overflow());
                }
                (Format::DecimalExponent, Scale::Pow10(exp))
            }
        };

        // mantissa carries an implicit 10^-frac_len; shift onto the nano
        // scale, rounding up when the value is finer than a nano.
        let nanos = match scale {
            Scale::Pow10(p) => {
                let exp = 9 + p - frac_len as i32;
                if exp >= 0 {
                    mantissa
                        .checked_mul(pow10(exp as u32)?)
                        .ok_or_else(overflow)?
                } else {
                    ceil_div(mantissa, pow10((-exp) as u32)?)
                }
            }
            Scale::Pow2(b) => {
                let num = mantissa
                    .checked_mul(1i128 << b)
                    .and_then(|v| v.checked_mul(NANO))
                    .ok_or_else(overflow)?;
                ceil_div(num, pow10(frac_len)?)
            }
        };

        Ok(Quantity {
            nanos: if negative { -nanos } else { nanos },
            format,
        })
    }
}

fn format_decimal(n: u128) -> String {
    let nano = NANO as u128;
    if n % nano == 0 {
        let whole = n / nano;
        for &(pow, suffix) in DECIMAL_SUFFIXES {
            let unit = 10u128.pow(pow);
            if whole % unit == 0 {
                return format!("{}{}", whole / unit, suffix);
            }
        }
        whole.to_string()
    } else if n % 1_000_000 == 0 {
        format!("{}m", n / 1_000_000)
    } else if n % 1_000 == 0 {
        format!("{}u", n / 1_000)
    } else {
        format!("{n}n")
    }
}

fn format_binary(n: u128) -> String {
    let nano = NANO as u128;
    for &(shift, suffix) in BINARY_SUFFIXES {
        let unit = (1u128 << shift) * nano;
        if n % unit == 0 {
            return format!("{}{}", n / unit, suffix);
        }
    }
    // Whole values of at least 1Ki keep a plain integer rendering; small
    // or fractional values fall back to decimal suffixes.
    if n % nano == 0 {
        let whole = n / nano;
        if whole >= 1024 {
            return whole.to_string();
        }
    }
    format_decimal(n)
}

fn format_exponent(n: u128) -> String {
    let mut exp = 18i32;
    while exp > -9 {
        let unit = 10u128.pow((exp + 9) as u32);
        if n % unit == 0 {
            break;
        }
        exp -= 3;
    }
    let mantissa = n / 10u128.pow((exp + 9) as u32);
    if exp == 0 {
        mantissa.to_string()
    } else {
        format!("{mantissa}e{exp}")
    }
}

impl fmt::Display for Quantity {
    /// Canonical rendering in the quantity's own format: the largest
    /// suffix that leaves an integral mantissa.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            return f.write_str("0");
        }
        let n = self.nanos.unsigned_abs();
        let body = match self.format {
            Format::BinarySi => format_binary(n),
            Format::DecimalSi => format_decimal(n),
            Format::DecimalExponent => format_exponent(n),
        };
        if self.nanos < 0 {
            write!(f, "-{body}")
        } else {
            f.write_str(&body)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl de::Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a quantity string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
                v.parse().map_err(de::Error::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
                Ok(Quantity::from_int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
                i64::try_from(v)
                    .map(Quantity::from_int)
                    .map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}
