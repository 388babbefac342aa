//! Amount type for monetary values.
//!
//! Amounts are stored and exchanged as plain decimals (`1200.00`) but users type them in many
//! shapes: with a `R$` prefix, with Brazilian separators (`1.200,00`) or as a JSON number. This
//! module normalizes all of those into a `Decimal`.
//!
//! A comma or a `R$` prefix means Brazilian separators: dots group thousands and the comma marks
//! the decimals. Otherwise the dot is the decimal point. Input that fits neither reading, such as
//! `1,200.50`, is rejected, and so is a bare `1.200`, which could be either.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Represents a monetary amount in reais.
///
/// `Display` and `Serialize` write the plain decimal value so that it can be stored and parsed
/// back without loss. Use `Amount::brl` for a human-readable rendering.
///
/// # Examples
///
/// ```
/// # use pillar_ledger::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("R$ 1.234,50").unwrap();
/// let b = Amount::from_str("1234.50").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.brl(), "R$ 1.234,50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Splits the amount into `parts` equal shares.
    ///
    /// No remainder is redistributed: `100 / 3` yields three shares of `33.333…` carried at full
    /// `Decimal` precision. Returns `None` when `parts` is zero.
    pub fn split(&self, parts: u32) -> Option<Amount> {
        if parts == 0 {
            return None;
        }
        self.0.checked_div(Decimal::from(parts)).map(Amount)
    }

    /// Formats the amount as Brazilian currency, e.g. `R$ 1.234,56` or `-R$ 12,00`.
    pub fn brl(&self) -> String {
        let rounded = self.0.round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let us = format_num::format_num!(",.2", rounded.abs().to_f64().unwrap_or_default());
        // Swap the separators: "1,234.56" -> "1.234,56"
        let swapped: String = us
            .chars()
            .map(|c| match c {
                ',' => '.',
                '.' => ',',
                other => other,
            })
            .collect();
        format!("{sign}R$ {swapped}")
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    reason: Reason,
}

enum Reason {
    Separators,
    Ambiguous,
    Decimal(rust_decimal::Error),
}

impl AmountError {
    fn new(input: &str, reason: Reason) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AmountError({:?}: {})", self.input, self.reason)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid amount '{}': {}", self.input, self.reason)
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Separators => f.write_str("misplaced thousands or decimal separator"),
            Reason::Ambiguous => f.write_str(
                "dots could be thousands or decimals, write 1.200,00 or 1200.00 instead",
            ),
            Reason::Decimal(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.reason {
            Reason::Decimal(e) => Some(e),
            _ => None,
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let (brazilian, rest) = match rest.strip_prefix("R$") {
            Some(rest) => (true, rest.trim()),
            None => (rest.contains(','), rest),
        };

        let normalized = if brazilian {
            normalize_brazilian(rest).map_err(|reason| AmountError::new(s, reason))?
        } else if is_dot_grouped(rest) {
            return Err(AmountError::new(s, Reason::Ambiguous));
        } else {
            rest.to_string()
        };

        let value = Decimal::from_str(&normalized)
            .map_err(|e| AmountError::new(s, Reason::Decimal(e)))?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

/// `1.234.567,89` -> `1234567.89`. Dots may only appear as thousands groups before the comma.
fn normalize_brazilian(s: &str) -> Result<String, Reason> {
    let (int, frac) = match s.split_once(',') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    if frac.is_some_and(|f| f.contains([',', '.'])) {
        return Err(Reason::Separators);
    }
    if int.contains('.') && !is_dot_grouped(int) {
        return Err(Reason::Separators);
    }
    let int = int.replace('.', "");
    Ok(match frac {
        Some(frac) => format!("{int}.{frac}"),
        None => int,
    })
}

/// True for `1.200`, `12.345.678`: a leading group of one to three digits not starting with
/// zero, followed by one or more dot-separated groups of exactly three digits.
fn is_dot_grouped(s: &str) -> bool {
    let mut groups = s.split('.');
    let first_ok = groups.next().is_some_and(|g| {
        (1..=3).contains(&g.len())
            && !g.starts_with('0')
            && g.bytes().all(|b| b.is_ascii_digit())
    });
    let mut rest = groups.peekable();
    first_ok
        && rest.peek().is_some()
        && rest.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a string holding a monetary amount")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        // Go through the shortest string form so that 0.1 stays 0.1. A JSON number never has
        // thousands separators, so skip the separator rules.
        Decimal::from_str(&v.to_string())
            .map(Amount)
            .map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}
