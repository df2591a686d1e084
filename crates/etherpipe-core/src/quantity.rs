//! Arbitrary-precision quantity codec.
//!
//! The daemon encodes every numeric result as a `0x`-prefixed hex string of
//! unbounded width. [`Quantity`] parses those strings into a [`BigUint`] and
//! renders them back as plain decimal, as `0x` hex, or as a wei amount scaled
//! down to ether with a fixed 18-digit fraction.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use thiserror::Error;

/// Number of fractional digits between wei and ether.
pub const WEI_DECIMALS: usize = 18;

/// One ether expressed in wei, as a float multiplier.
const WEI_PER_ETHER: f64 = 1_000_000_000_000_000_000.0;

/// Errors from quantity parsing and conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid base-{radix} digits in {input:?}")]
    InvalidDigits { input: String, radix: u32 },
    #[error("unsupported radix {0}")]
    UnsupportedRadix(u32),
    #[error("quantity {0} does not fit in 64 bits")]
    Overflow(String),
    #[error("cannot represent {0} as an unsigned integer")]
    NotRepresentable(f64),
}

/// An unsigned integer of arbitrary width.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(BigUint);

impl Quantity {
    /// Zero.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Parses a hex string, with or without a `0x`/`0X` prefix.
    pub fn from_hex(input: &str) -> Result<Self, QuantityError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        Self::from_str_radix(digits, 16)
    }

    /// Parses bare digits in the given radix.
    ///
    /// Signs, separators and whitespace are rejected rather than skipped, so
    /// a malformed daemon reply surfaces as an error instead of a silent zero.
    pub fn from_str_radix(digits: &str, radix: u32) -> Result<Self, QuantityError> {
        if !(2..=36).contains(&radix) {
            return Err(QuantityError::UnsupportedRadix(radix));
        }
        if digits.is_empty() {
            return Err(QuantityError::Empty);
        }
        if !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(QuantityError::InvalidDigits {
                input: digits.to_string(),
                radix,
            });
        }
        BigUint::parse_bytes(digits.as_bytes(), radix)
            .map(Self)
            .ok_or_else(|| QuantityError::InvalidDigits {
                input: digits.to_string(),
                radix,
            })
    }

    /// Converts a non-negative float, truncating any fractional part.
    pub fn from_f64(value: f64) -> Result<Self, QuantityError> {
        if !value.is_finite() || value < 0.0 {
            return Err(QuantityError::NotRepresentable(value));
        }
        BigUint::from_f64(value.trunc())
            .map(Self)
            .ok_or(QuantityError::NotRepresentable(value))
    }

    /// Converts an ether amount into an exact number of wei.
    pub fn from_ether(ether: f64) -> Result<Self, QuantityError> {
        Self::from_f64(ether * WEI_PER_ETHER)
    }

    /// Narrows to `u64`, failing instead of wrapping when the value is wider.
    pub fn to_u64(&self) -> Result<u64, QuantityError> {
        self.0
            .to_u64()
            .ok_or_else(|| QuantityError::Overflow(self.to_hex_string()))
    }

    /// Plain base-10 rendering.
    pub fn to_decimal_string(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// Lowercase hex with a `0x` prefix, as the daemon expects quantities.
    pub fn to_hex_string(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Renders the value with a decimal point `decimals` digits from the end.
    ///
    /// The integer part is never empty: values below one unit are left-padded
    /// so that `5` with 18 decimals renders as `0.000000000000000005`.
    pub fn to_units_string(&self, decimals: usize) -> String {
        let digits = self.to_decimal_string();
        if decimals == 0 {
            return digits;
        }
        let padded = if digits.len() <= decimals {
            format!("{digits:0>width$}", width = decimals + 1)
        } else {
            digits
        };
        let split = padded.len() - decimals;
        format!("{}.{}", &padded[..split], &padded[split..])
    }

    /// Wei rendered as ether.
    pub fn to_ether_string(&self) -> String {
        self.to_units_string(WEI_DECIMALS)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Quantity {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
