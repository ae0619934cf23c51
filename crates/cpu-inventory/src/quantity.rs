// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Capacity quantities attached to allocatable units.
//!
//! A [`Quantity`] is a byte-like amount written the way cluster manifests
//! write them. Binary suffixes (`Ki`, `Mi`, `Gi`, `Ti`) are powers of 1024,
//! decimal suffixes (`k`, `M`, `G`, `T`) are powers of 1000, and a plain
//! integer is taken as-is.

use crate::InventoryError;
use std::fmt;

const KI: u64 = 1024;
const MI: u64 = KI * 1024;
const GI: u64 = MI * 1024;
const TI: u64 = GI * 1024;

/// A non-negative capacity amount, stored in base units.
///
/// # Examples
/// ```
/// use cpu_inventory::Quantity;
///
/// let q = Quantity::parse("80Gi").unwrap();
/// assert_eq!(q.value(), 80 * 1024 * 1024 * 1024);
/// assert_eq!(q.to_string(), "80Gi");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    value: u64,
}

impl Quantity {
    /// Creates a quantity from a raw base-unit value.
    pub fn from_value(value: u64) -> Self {
        Self { value }
    }

    /// Creates a quantity from gibibytes.
    pub fn from_gi(gi: u64) -> Self {
        Self { value: gi * GI }
    }

    /// Returns the value in base units.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Parses a quantity string such as `"80Gi"`, `"512Mi"`, `"4k"` or
    /// `"1000"`. Suffixes are case-sensitive, as in cluster manifests.
    pub fn parse(s: &str) -> Result<Self, InventoryError> {
        let s = s.trim();
        let invalid = |detail: &str| InventoryError::InvalidQuantity {
            input: s.to_string(),
            detail: detail.to_string(),
        };
        if s.is_empty() {
            return Err(invalid("empty string"));
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (num_str, suffix) = s.split_at(split);
        if num_str.is_empty() {
            return Err(invalid("expected a number followed by an optional suffix"));
        }

        let multiplier = match suffix {
            "" => 1,
            "Ki" => KI,
            "Mi" => MI,
            "Gi" => GI,
            "Ti" => TI,
            "k" => 1_000,
            "M" => 1_000_000,
            "G" => 1_000_000_000,
            "T" => 1_000_000_000_000,
            _ => return Err(invalid(&format!("unknown suffix '{suffix}'"))),
        };

        let value: u64 = num_str.parse().map_err(|_| invalid("number out of range"))?;
        let value = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("quantity overflow"))?;

        Ok(Self { value })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.value;
        if v == 0 {
            return write!(f, "0");
        }
        for (unit, suffix) in [(TI, "Ti"), (GI, "Gi"), (MI, "Mi"), (KI, "Ki")] {
            if v % unit == 0 {
                return write!(f, "{}{suffix}", v / unit);
            }
        }
        write!(f, "{v}")
    }
}

impl TryFrom<String> for Quantity {
    type Error = InventoryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self {
        q.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_suffixes() {
        assert_eq!(Quantity::parse("1Ki").unwrap().value(), 1024);
        assert_eq!(Quantity::parse("512Mi").unwrap().value(), 512 * MI);
        assert_eq!(Quantity::parse("80Gi").unwrap().value(), 80 * GI);
        assert_eq!(Quantity::parse("2Ti").unwrap().value(), 2 * TI);
    }

    #[test]
    fn test_parse_decimal_suffixes() {
        assert_eq!(Quantity::parse("4k").unwrap().value(), 4_000);
        assert_eq!(Quantity::parse("3M").unwrap().value(), 3_000_000);
        assert_eq!(Quantity::parse("1G").unwrap().value(), 1_000_000_000);
    }

    #[test]
    fn test_parse_plain_and_whitespace() {
        assert_eq!(Quantity::parse("1000").unwrap().value(), 1000);
        assert_eq!(Quantity::parse("  16Gi ").unwrap(), Quantity::from_gi(16));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Quantity::parse("").is_err());
        assert!(Quantity::parse("Gi").is_err());
        assert!(Quantity::parse("12XB").is_err());
        assert!(Quantity::parse("1.5Gi").is_err());
        assert!(Quantity::parse("99999999999Ti").is_err());
    }

    #[test]
    fn test_display_canonical() {
        assert_eq!(Quantity::from_gi(80).to_string(), "80Gi");
        assert_eq!(Quantity::from_value(2048).to_string(), "2Ki");
        assert_eq!(Quantity::from_value(1000).to_string(), "1000");
        assert_eq!(Quantity::from_value(0).to_string(), "0");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Quantity::from_gi(80)).unwrap();
        assert_eq!(json, r#""80Gi""#);
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Quantity::from_gi(80));
        assert!(serde_json::from_str::<Quantity>(r#""lots""#).is_err());
    }
}
