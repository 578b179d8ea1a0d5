//! Fixed-point currency type for the points economy.
//!
//! Balances are stored as an integer count of hundredths of a point, so
//! amounts like the 0.10 chat award never accumulate float error. On the
//! wire (JSON) a `Points` value reads and writes as a plain decimal number,
//! which keeps payloads compatible with clients that treat points as a
//! float.

use std::fmt;
use std::ops::Neg;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};

/// A points amount in hundredths (1.00 point == 100).
///
/// Arithmetic is checked: callers decide how to surface overflow instead of
/// panicking inside ledger math.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Points(i64);

impl Points {
    pub const ZERO: Points = Points(0);

    /// Hundredths per whole point.
    pub const SCALE: i64 = 100;

    /// Builds a value from raw hundredths, e.g. `from_hundredths(10)` is 0.10.
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Points(hundredths)
    }

    /// Builds a value from whole points, e.g. `from_whole(10)` is 10.00.
    pub const fn from_whole(points: i64) -> Self {
        Points(points * Self::SCALE)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Points) -> Option<Points> {
        self.0.checked_add(other.0).map(Points)
    }

    pub fn checked_sub(self, other: Points) -> Option<Points> {
        self.0.checked_sub(other.0).map(Points)
    }

    /// Scales the amount by an integer count, e.g. a ticket price times a
    /// ticket count.
    pub fn checked_mul(self, count: i64) -> Option<Points> {
        self.0.checked_mul(count).map(Points)
    }

    /// The decimal representation used on the wire.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl Neg for Points {
    type Output = Points;

    fn neg(self) -> Points {
        Points(-self.0)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

// ============================================================================
// Serde implementations (JSON number with two decimal places of meaning)
// ============================================================================

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Points {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(D::Error::custom("points amount must be a finite number"));
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
            return Err(D::Error::custom("points amount out of range"));
        }
        Ok(Points(scaled as i64))
    }
}

// ============================================================================
// SQLx implementations (stored as BIGINT)
// ============================================================================

impl Type<Postgres> for Points {
    fn type_info() -> PgTypeInfo {
        <i64 as Type<Postgres>>::type_info()
    }
}

impl Encode<'_, Postgres> for Points {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as Encode<'_, Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> Decode<'r, Postgres> for Points {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i64 as Decode<'r, Postgres>>::decode(value)?;
        Ok(Points(raw))
    }
}
