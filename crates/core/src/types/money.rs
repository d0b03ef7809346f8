//! Integer money in Vietnamese dong.
//!
//! The marketplace prices everything in whole dong, so amounts are plain
//! integers. Arithmetic that could overflow is exposed only in checked form.

use core::fmt;
use core::iter::Sum;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors produced by money arithmetic and parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The result does not fit in the amount type.
    #[error("amount overflow")]
    Overflow,
    /// The input is not a whole number of dong.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
}

/// An amount of Vietnamese dong (no minor unit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Vnd(i64);

/// Some backend documents store prices as floats (`1500000.0`); they are
/// rounded to whole dong on the way in.
impl<'de> Deserialize<'de> for Vnd {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Whole(i64),
            Fractional(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Whole(amount) => Ok(Self(amount)),
            Raw::Fractional(amount) if amount.is_finite() => {
                #[allow(clippy::cast_possible_truncation)] // rounded, saturating cast
                Ok(Self(amount.round() as i64))
            }
            Raw::Fractional(_) => Err(serde::de::Error::custom("amount is not finite")),
        }
    }
}

impl Vnd {
    /// Zero dong.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// The raw amount.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the sum does not fit.
    pub const fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        match self.0.checked_add(other.0) {
            Some(sum) => Ok(Self(sum)),
            None => Err(MoneyError::Overflow),
        }
    }

    /// Multiply by a count (line price times quantity).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the product does not fit.
    pub fn checked_mul(self, count: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(i64::from(count))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Parse a form input such as `"150000"` or `" 150000 "`.
    ///
    /// Only whole numbers are accepted; thousands separators are not.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] for empty or non-integer input.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        trimmed
            .parse::<i64>()
            .map(Self)
            .map_err(|_| MoneyError::Invalid(trimmed.to_string()))
    }

    /// Sum an iterator of amounts with overflow detection.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the running total overflows.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount))
    }
}

impl From<i64> for Vnd {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl Sum for Vnd {
    /// Saturating sum, for display-only totals.
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |total, amount| Self(total.0.saturating_add(amount.0)))
    }
}

/// Formats like the `vi-VN` locale: dot thousands separators, trailing `₫`.
impl fmt::Display for Vnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{grouped} ₫")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Vnd::new(0).to_string(), "0 ₫");
        assert_eq!(Vnd::new(999).to_string(), "999 ₫");
        assert_eq!(Vnd::new(1_000).to_string(), "1.000 ₫");
        assert_eq!(Vnd::new(1_234_567).to_string(), "1.234.567 ₫");
        assert_eq!(Vnd::new(-100_000).to_string(), "-100.000 ₫");
    }

    #[test]
    fn test_checked_mul_overflow() {
        assert_eq!(Vnd::new(250).checked_mul(4), Ok(Vnd::new(1_000)));
        assert_eq!(Vnd::new(i64::MAX).checked_mul(2), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_checked_sum() {
        let total = Vnd::checked_sum([Vnd::new(100), Vnd::new(250)]).unwrap();
        assert_eq!(total, Vnd::new(350));
        assert_eq!(
            Vnd::checked_sum([Vnd::new(i64::MAX), Vnd::new(1)]),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(Vnd::parse(" 150000 ").unwrap(), Vnd::new(150_000));
        assert!(matches!(Vnd::parse(""), Err(MoneyError::Invalid(_))));
        assert!(matches!(Vnd::parse("12.5"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Vnd::parse("abc"), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_serde_is_bare_integer() {
        assert_eq!(serde_json::to_string(&Vnd::new(4200)).unwrap(), "4200");
        let parsed: Vnd = serde_json::from_str("4200").unwrap();
        assert_eq!(parsed, Vnd::new(4200));
        let parsed: Vnd = serde_json::from_str("1500000.0").unwrap();
        assert_eq!(parsed, Vnd::new(1_500_000));
    }
}
