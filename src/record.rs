//! crt.sh search records.
//!
//! crt.sh answers `output=json` queries with a JSON array of log entries,
//! most recent first. Dates are naive UTC strings either with or without
//! fractional seconds (`2023-01-01T00:00:00.5` / `2023-01-01T00:00:00`), and
//! may be `null`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ExporterError;

const FRACTIONAL_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const WHOLE_SECONDS_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";
const NULL_MARKER: &str = "null";

/// A crt.sh result record
///
/// `null` or missing text and number fields decode to their empty value, so
/// one incomplete entry does not spoil the rest of the response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuer_ca_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issuer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub common_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name_value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default)]
    pub entry_timestamp: Timestamp,
    #[serde(default)]
    pub not_before: Timestamp,
    #[serde(default)]
    pub not_after: Timestamp,
    #[serde(default, deserialize_with = "null_as_default")]
    pub serial_number: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Record {
    /// Decodes a crt.sh JSON response, preserving upstream order.
    ///
    /// The whole buffer is rejected if it is not an array of objects or a
    /// field holds a value of the wrong type.
    pub fn decode_all(body: &[u8]) -> Result<Vec<Record>, ExporterError> {
        let records: Vec<Record> = serde_json::from_slice(body)?;
        Ok(records)
    }

    /// First entry of `name_value`, which lists the SANs one per line.
    pub fn primary_name(&self) -> &str {
        self.name_value.lines().next().unwrap_or("").trim()
    }
}

/// A crt.sh date that may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Option<DateTime<Utc>>);

impl Timestamp {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Timestamp(Some(instant))
    }

    pub fn absent() -> Self {
        Timestamp(None)
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Unix seconds; an absent timestamp is `0`.
    pub fn unix(&self) -> i64 {
        self.0.map(|t| t.timestamp()).unwrap_or(0)
    }

    /// Unix seconds rendered as a base-10 label value.
    pub fn label(&self) -> String {
        self.unix().to_string()
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_matches('"');
        if s == NULL_MARKER {
            return Ok(Timestamp::absent());
        }

        let naive = NaiveDateTime::parse_from_str(s, FRACTIONAL_LAYOUT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, WHOLE_SECONDS_LAYOUT))?;
        Ok(Timestamp::new(naive.and_utc()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{}", t.format(FRACTIONAL_LAYOUT)),
            None => write!(f, "{}", NULL_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => s.parse().map_err(serde::de::Error::custom),
            None => Ok(Timestamp::absent()),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Some(_) => serializer.serialize_str(&self.to_string()),
            None => serializer.serialize_none(),
        }
    }
}
