use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize};

/// Fixed-point scale used by the contract (18 decimals).
pub const FIXED_POINT_SCALE: u64 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Quantity: opaque unsigned integer carried as a decimal string
// ---------------------------------------------------------------------------

/// An unsigned on-chain integer (amount or identifier) kept as its decimal
/// string so no precision is lost. Accepts JSON strings or JSON integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(String);

impl Quantity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value, if it fits in 256 bits.
    pub fn to_u256(&self) -> Option<U256> {
        U256::from_str_radix(&self.0, 10).ok()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidQuantity(pub String);

impl fmt::Display for InvalidQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a decimal integer, got {:?}", self.0)
    }
}

impl std::error::Error for InvalidQuantity {}

impl FromStr for Quantity {
    type Err = InvalidQuantity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidQuantity(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<U256> for Quantity {
    fn from(value: U256) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(Self::from(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Price: 18-decimal fixed point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(U256);

impl Price {
    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// A whole-number price (`units` × 10^18).
    pub fn from_units(units: u64) -> Self {
        Self(U256::from(units) * U256::from(FIXED_POINT_SCALE))
    }

    pub fn raw(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = U256::from(FIXED_POINT_SCALE);
        let whole = self.0 / scale;
        // Remainder is below 10^18 so it fits in the low limb.
        let frac = (self.0 % scale).as_limbs()[0];
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_accepts_strings_and_integers() {
        let from_text: Quantity = serde_json::from_value(serde_json::json!("123456789012345678901234567890")).unwrap();
        let from_number: Quantity = serde_json::from_value(serde_json::json!(42)).unwrap();
        assert_eq!(from_text.as_str(), "123456789012345678901234567890");
        assert_eq!(from_number, Quantity::from(42));
    }

    #[test]
    fn quantity_rejects_non_decimal_text() {
        assert!(serde_json::from_value::<Quantity>(serde_json::json!("1.5")).is_err());
        assert!(serde_json::from_value::<Quantity>(serde_json::json!("0x10")).is_err());
        assert!(serde_json::from_value::<Quantity>(serde_json::json!("")).is_err());
    }

    #[test]
    fn quantity_converts_to_u256() {
        let q: Quantity = "1000000000000000000000".parse().unwrap();
        assert_eq!(q.to_u256(), Some(U256::from(1000u64) * U256::from(FIXED_POINT_SCALE)));
    }

    #[test]
    fn price_displays_as_fixed_point() {
        assert_eq!(Price::from_units(3).to_string(), "3");
        let one_and_half = Price::from_raw(U256::from(1_500_000_000_000_000_000u64));
        assert_eq!(one_and_half.to_string(), "1.5");
    }
}
