use std::{fmt, str::FromStr};

use rust_decimal::{prelude::ToPrimitive, Decimal};

/// Number of decimals of the minor unit.
pub const DECIMALS: u32 = 2;

const MINOR_PER_UNIT: u64 = 100;

/// A non-negative amount of money in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from minor units.
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Create from whole units.
    pub fn from_units(units: u64) -> crate::Result<Self> {
        units
            .checked_mul(MINOR_PER_UNIT)
            .map(Self)
            .ok_or(crate::Error::Overflow)
    }

    /// Get the amount in minor units.
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Returns whether the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Convert to a signed amount.
    pub fn to_signed(&self) -> crate::Result<SignedAmount> {
        i64::try_from(self.0)
            .map(SignedAmount)
            .map_err(|_| crate::Error::Overflow)
    }

    /// Convert to the negated signed amount.
    pub fn to_opposite_signed(&self) -> crate::Result<SignedAmount> {
        let signed = self.to_signed()?;
        signed.checked_neg().ok_or(crate::Error::Overflow)
    }

    /// Convert to a decimal in whole units.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), DECIMALS)
    }

    /// Convert from a decimal in whole units.
    ///
    /// Returns an error if the value is negative or has more than two decimals.
    pub fn from_decimal(value: Decimal) -> crate::Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(crate::Error::InvalidAmount(value.to_string()));
        }
        if value.normalize().scale() > DECIMALS {
            return Err(crate::Error::InvalidAmount(value.to_string()));
        }
        let minor = value
            .checked_mul(Decimal::from(MINOR_PER_UNIT))
            .and_then(|minor| minor.to_u64())
            .ok_or_else(|| crate::Error::InvalidAmount(value.to_string()))?;
        Ok(Self(minor))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Amount {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| crate::Error::InvalidAmount(s.to_string()))?;
        Self::from_decimal(value)
    }
}

/// A signed amount of money in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SignedAmount(i64);

impl SignedAmount {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Get the amount in minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked negation.
    pub fn checked_neg(&self) -> Option<Self> {
        self.0.checked_neg().map(Self)
    }

    /// Convert to a decimal in whole units.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), DECIMALS)
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// A factor in basis points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Factor(u32);

impl Factor {
    /// Basis points of one.
    pub const ONE_IN_BPS: u32 = 10_000;

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from basis points.
    pub fn from_bps(bps: u32) -> crate::Result<Self> {
        if bps > Self::ONE_IN_BPS {
            return Err(crate::Error::InvalidArgument("factor must not exceed one"));
        }
        Ok(Self(bps))
    }

    pub(crate) const fn from_bps_unchecked(bps: u32) -> Self {
        Self(bps)
    }

    /// Get the factor in basis points.
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Apply the factor to the given amount, rounding down.
    pub fn apply(&self, amount: &Amount) -> Option<Amount> {
        let value = u128::from(amount.0).checked_mul(u128::from(self.0))?;
        let value = value.checked_div(u128::from(Self::ONE_IN_BPS))?;
        u64::try_from(value).ok().map(Amount)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", Decimal::new(i64::from(self.0), 2))
    }
}
