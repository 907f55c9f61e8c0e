use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

pub const POINT_DECIMALS: u32 = 6;
pub const POINT_BASE_UNIT: u64 = 1_000_000; // 10^6

/// Fixed-point quantity used for both swap volume and reward points.
/// Stored as micro-units; unsigned, so it is non-negative by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn from_value(value: f64) -> Self {
        Self((value * POINT_BASE_UNIT as f64) as u64)
    }

    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_value(&self) -> f64 {
        self.0 as f64 / POINT_BASE_UNIT as f64
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Proportional share of a pool: `pool * self / total`, computed in
    /// u128 so the intermediate product cannot overflow. Floors toward
    /// zero; the sum of shares over a set never exceeds the pool.
    pub fn proportional_share(&self, pool: Self, total: Self) -> Option<Self> {
        if total.is_zero() {
            return None;
        }
        let share = (pool.0 as u128) * (self.0 as u128) / (total.0 as u128);
        u64::try_from(share).ok().map(Self)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc.saturating_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let amount = Amount::from_value(1000.0);
        assert_eq!(amount.to_base_units(), 1000 * POINT_BASE_UNIT);
        assert_eq!(amount.to_value(), 1000.0);
        assert_eq!(Amount::from_base_units(1), Amount::from_value(0.000001));
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::from_value(10.0);
        let b = Amount::from_value(3.0);

        assert_eq!(a.checked_add(b), Some(Amount::from_value(13.0)));
        assert_eq!(a.checked_sub(b), Some(Amount::from_value(7.0)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::from_base_units(u64::MAX).checked_add(a), None);
    }

    #[test]
    fn test_proportional_share_exact() {
        let pool = Amount::from_value(10000.0);
        let total = Amount::from_value(40.0);

        let small = Amount::from_value(10.0);
        let large = Amount::from_value(20.0);

        assert_eq!(
            small.proportional_share(pool, total),
            Some(Amount::from_value(2500.0))
        );
        assert_eq!(
            large.proportional_share(pool, total),
            Some(Amount::from_value(5000.0))
        );
    }

    #[test]
    fn test_proportional_share_zero_total() {
        let pool = Amount::from_value(10000.0);
        assert_eq!(pool.proportional_share(pool, Amount::ZERO), None);
    }

    #[test]
    fn test_proportional_share_sum_never_exceeds_pool() {
        let pool = Amount::from_value(10000.0);
        let parts = [
            Amount::from_value(1.0),
            Amount::from_value(1.0),
            Amount::from_value(1.0),
        ];
        let total: Amount = parts.iter().copied().sum();

        let granted: Amount = parts
            .iter()
            .filter_map(|p| p.proportional_share(pool, total))
            .sum();
        assert!(granted <= pool);
        // 10000 / 3 floors; the shortfall is under one micro-unit per part
        assert!(pool.saturating_sub(granted).to_base_units() < parts.len() as u64);
    }
}
