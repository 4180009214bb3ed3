//! Checked field types shared by every envelope kind
//!
//! Each type here refuses to hold a value the schema would reject, so an
//! envelope assembled in-process carries the same guarantees as one that
//! passed validation at the wire boundary.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::ContractError;

/// Contract version carried in every envelope.
///
/// Only `"1.0"` exists. Any other literal fails to deserialize instead of
/// being parsed on a best-effort basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    #[default]
    #[serde(rename = "1.0")]
    V1_0,
}

impl Version {
    pub const CURRENT: Version = Version::V1_0;

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1_0 => "1.0",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string with at least one character
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, ContractError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ContractError::InvalidValue(
                "string must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = ContractError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NonEmptyString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Completion ratio in `[0, 1]`, both ends inclusive. NaN is rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Fraction(f64);

impl Fraction {
    pub const ZERO: Fraction = Fraction(0.0);
    pub const ONE: Fraction = Fraction(1.0);

    pub fn new(value: f64) -> Result<Self, ContractError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ContractError::InvalidValue(format!(
                "progress {} is outside [0, 1]",
                value
            )))
        }
    }

    /// `done / total`, clamped to one. A zero total counts as complete.
    pub fn from_ratio(done: u64, total: u64) -> Self {
        if total == 0 || done >= total {
            return Self::ONE;
        }
        Self(done as f64 / total as f64)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Fraction {
    type Error = ContractError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Fraction> for f64 {
    fn from(value: Fraction) -> Self {
        value.0
    }
}

/// Zero-based step counter.
///
/// Held as a JSON number so that every non-negative integral value the
/// schema accepts survives a round trip, including `1.0` and integers past
/// `u64::MAX` such as `1e20`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Number", into = "Number")]
pub struct StepIndex(Number);

impl StepIndex {
    pub fn new(value: u64) -> Self {
        Self(Number::from(value))
    }

    /// The step as `u64`, when it fits
    pub fn get(&self) -> Option<u64> {
        if let Some(value) = self.0.as_u64() {
            return Some(value);
        }
        self.0
            .as_f64()
            .filter(|value| *value < u64::MAX as f64)
            .map(|value| value as u64)
    }

    pub fn as_number(&self) -> &Number {
        &self.0
    }
}

impl From<u64> for StepIndex {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl TryFrom<Number> for StepIndex {
    type Error = ContractError;

    fn try_from(value: Number) -> Result<Self, Self::Error> {
        if value.is_u64() {
            return Ok(Self(value));
        }
        match value.as_f64() {
            Some(float) if float >= 0.0 && float.fract() == 0.0 => Ok(Self(value)),
            _ => Err(ContractError::InvalidValue(format!(
                "step {} is not a non-negative integer",
                value
            ))),
        }
    }
}

impl From<StepIndex> for Number {
    fn from(value: StepIndex) -> Self {
        value.0
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RFC 3339 instant with a four-digit year.
///
/// chrono can hold years outside `0..=9999`, which have no RFC 3339 form.
/// The original offset is kept so a parsed timestamp serializes back as it
/// was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    pub fn new(value: DateTime<FixedOffset>) -> Result<Self, ContractError> {
        if !(0..=9999).contains(&value.year()) {
            return Err(ContractError::InvalidValue(format!(
                "year {} has no RFC 3339 form",
                value.year()
            )));
        }
        if value.offset().local_minus_utc() % 60 != 0 {
            return Err(ContractError::InvalidValue(
                "offset must be whole minutes".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn now() -> Self {
        Self(Utc::now().into())
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl TryFrom<DateTime<Utc>> for Timestamp {
    type Error = ContractError;

    fn try_from(value: DateTime<Utc>) -> Result<Self, Self::Error> {
        Self::new(value.into())
    }
}

impl TryFrom<DateTime<FixedOffset>> for Timestamp {
    type Error = ContractError;

    fn try_from(value: DateTime<FixedOffset>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Timestamp {
    type Err = ContractError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(value)
            .map_err(|e| ContractError::InvalidValue(format!("timestamp '{}': {}", value, e)))?;
        Self::new(parsed)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// Deserialize an optional field that, when present, must hold a value.
///
/// Plain `Option<T>` would accept an explicit `null`, which the schema
/// rejects for every optional field.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
