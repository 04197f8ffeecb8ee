//! Fixed-point monetary values stored as an integer count of cents.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use validator::ValidationError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Monetary value in cents. Arithmetic and comparisons operate on the
/// integer count; floats only appear at construction and formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Builds a value from major units, rounding to the nearest cent,
    /// ties away from zero.
    pub fn new(amount: f64) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
        }
    }

    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Multiplies by a scalar factor, rounding to the nearest cent,
    /// ties away from zero.
    pub fn multiply(&self, factor: f64) -> Self {
        Self {
            cents: (self.cents as f64 * factor).round() as i64,
        }
    }

    /// Divides by a scalar divisor, rounding to the nearest cent.
    /// A zero divisor yields the zero value.
    pub fn divide(&self, divisor: f64) -> Self {
        if divisor == 0.0 {
            return Self { cents: 0 };
        }

        Self {
            cents: (self.cents as f64 / divisor).round() as i64,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    pub fn abs(&self) -> Self {
        Self {
            cents: self.cents.abs(),
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money {
            cents: self.cents + other.cents,
        }
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money {
            cents: self.cents - other.cents,
        }
    }
}

impl fmt::Display for Money {
    /// Canonical form is `{major}.{minor:02}` with the sign emitted once,
    /// even when the integer part is zero.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyError::InvalidAmount("empty string".to_string()));
        }

        match s.parse::<f64>() {
            Ok(amount) => Ok(Money::new(amount)),
            Err(_) => Err(MoneyError::InvalidAmount(s.to_string())),
        }
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a decimal string or number")
    }

    fn visit_str<E>(self, v: &str) -> Result<Money, E>
    where
        E: de::Error,
    {
        v.parse().map_err(|e: MoneyError| E::custom(e))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::new(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::new(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::new(v as f64))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Money, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> sqlx::encode::IsNull {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.cents, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let cents = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Money::from_cents(cents))
    }
}

pub fn validate_positive(value: &Money) -> Result<(), ValidationError> {
    match value.is_positive() {
        true => Ok(()),
        false => Err(ValidationError::new("value_must_be_positive")),
    }
}
