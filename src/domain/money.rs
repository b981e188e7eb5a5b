use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Fixed-point monetary amount, normalized to 4 decimal places.
///
/// Amounts entering the ledger are validated positive at the call site;
/// `Money` itself is signed so that balance arithmetic can pass through
/// intermediate differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(Decimal);

impl Money {
    pub const TARGET_DECIMALS: u32 = 4;

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Normalizes to 4 decimal places, rounding excess scale half-to-even.
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(
            Self::TARGET_DECIMALS,
            RoundingStrategy::MidpointNearestEven,
        ))
    }

    /// Parses a decimal string. Returns `None` for anything malformed; a
    /// bad amount must never silently read as zero.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        Decimal::from_str(s).ok().map(Self::from_decimal)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Fixed scale so report rows always carry four decimals.
        let mut d = self.0;
        d.rescale(Self::TARGET_DECIMALS);
        write!(f, "{}", d)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Money::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid Money format: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::Money;

    #[test]
    fn bankers_round_half_even() {
        let v = Money::parse("1.23445").unwrap(); // -> 1.2344
        assert_eq!(format!("{}", v), "1.2344");
        let v = Money::parse("1.23455").unwrap(); // -> 1.2346
        assert_eq!(format!("{}", v), "1.2346");
        let v = Money::parse("-1.23445").unwrap();
        assert_eq!(format!("{}", v), "-1.2344");
        let v = Money::parse("-1.23455").unwrap();
        assert_eq!(format!("{}", v), "-1.2346");
    }

    #[test]
    fn display_pads_to_four_decimals() {
        assert_eq!(format!("{}", Money::parse("30").unwrap()), "30.0000");
        assert_eq!(format!("{}", Money::zero()), "0.0000");
        assert_eq!(format!("{}", Money::parse("100.0003").unwrap()), "100.0003");
    }

    #[test]
    fn malformed_amounts_do_not_parse() {
        assert!(Money::parse("").is_none());
        assert!(Money::parse("12.3.4").is_none());
        assert!(Money::parse("NaN").is_none());
        assert!(Money::parse("12,50").is_none());
    }
}
