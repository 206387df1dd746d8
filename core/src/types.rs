//! Typed property bags and shared value types used across the pipeline.

use std::any::Any;
use std::fmt::{self, Debug, Display, Formatter};
use std::marker::PhantomData;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;

use crate::transport::Uri;
use crate::{Ref, SerdeError, Timestamp};

/// A typed key into a [`TypedProperties`] bag.
///
/// The key binds a string name to a value type at compile time, so reads
/// through a `PropertyKey` recover the value's type without downcasting at
/// the call site.
pub struct PropertyKey<T> {
    key: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    #[must_use]
    pub const fn new(key: &'static str) -> Self {
        PropertyKey {
            key,
            _value: PhantomData,
        }
    }

    /// The string key used to access the value.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }
}

impl<T> Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKey({})", self.key)
    }
}

/// An order-preserving, string-keyed bag of heterogeneous values.
///
/// The same bag backs per-call context and protocol/signer property
/// plumbing. Values are stored behind shared references, so cloning the bag
/// is cheap and clones observe the same values; this is what lets
/// event-stream contexts share per-call state with the pipeline.
#[derive(Clone, Default)]
pub struct TypedProperties {
    entries: IndexMap<&'static str, Ref<dyn Any + Send + Sync>>,
}

impl TypedProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by typed key.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &PropertyKey<T>) -> Option<&T> {
        self.entries.get(key.key)?.downcast_ref::<T>()
    }

    /// Get a shared handle to a value by typed key.
    #[must_use]
    pub fn get_ref<T: Any + Send + Sync>(&self, key: &PropertyKey<T>) -> Option<Ref<T>> {
        self.entries.get(key.key)?.clone().downcast::<T>().ok()
    }

    /// Insert a value, replacing any previous value for the key.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: &PropertyKey<T>, value: T) {
        self.entries.insert(key.key(), Ref::new(value));
    }

    /// Insert an already-shared value, replacing any previous value.
    pub fn insert_ref<T: Any + Send + Sync>(&mut self, key: &PropertyKey<T>, value: Ref<T>) {
        self.entries.insert(key.key(), value);
    }

    pub fn remove<T>(&mut self, key: &PropertyKey<T>) {
        self.entries.shift_remove(key.key);
    }

    #[must_use]
    pub fn contains<T>(&self, key: &PropertyKey<T>) -> bool {
        self.entries.contains_key(key.key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl Debug for TypedProperties {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// Static endpoint override read from the per-call context.
pub const ENDPOINT_URI: PropertyKey<Uri> = PropertyKey::new("endpoint_uri");

/// Per-attempt counter maintained by the pipeline driver.
pub const RETRY_ATTEMPTS: PropertyKey<u32> = PropertyKey::new("retry_attempts");

/// API key consumed by the api-key auth scheme.
pub const API_KEY: PropertyKey<String> = PropertyKey::new("api_key");

/// Smithy-defined timestamp formats with serialization and deserialization
/// helpers.
///
/// See [Smithy's docs](https://smithy.io/2.0/spec/protocol-traits.html#smithy-api-timestampformat-trait)
/// for more details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// RFC3339 section 5.6 datetime with optional millisecond precision but
    /// no UTC offset.
    DateTime,
    /// An HTTP date as defined by the IMF-fixdate production in RFC 9110
    /// section 5.6.7.
    HttpDate,
    /// Also known as Unix time, with optional millisecond precision.
    EpochSeconds,
}

impl Display for TimestampFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimestampFormat::DateTime => "date-time",
            TimestampFormat::HttpDate => "http-date",
            TimestampFormat::EpochSeconds => "epoch-seconds",
        };
        write!(f, "{name}")
    }
}

impl TimestampFormat {
    /// Serialize a timestamp into this format's string form.
    ///
    /// `EpochSeconds` renders a decimal number; fractional seconds are
    /// omitted when zero for both `EpochSeconds` and `DateTime`.
    #[must_use]
    pub fn serialize(&self, value: &Timestamp) -> String {
        match self {
            TimestampFormat::DateTime => {
                if value.timestamp_subsec_millis() == 0 {
                    value.to_rfc3339_opts(SecondsFormat::Secs, true)
                } else {
                    value.to_rfc3339_opts(SecondsFormat::Millis, true)
                }
            }
            TimestampFormat::HttpDate => value.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            TimestampFormat::EpochSeconds => {
                let millis = value.timestamp_subsec_millis();
                if millis == 0 {
                    value.timestamp().to_string()
                } else {
                    format!("{}.{millis:03}", value.timestamp())
                }
            }
        }
    }

    /// Deserialize a timestamp from a string in this format.
    pub fn deserialize(&self, value: &str) -> Result<Timestamp, SerdeError> {
        match self {
            TimestampFormat::DateTime => DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| SerdeError::expectation(format!("invalid date-time timestamp: {e}"))),
            TimestampFormat::HttpDate => DateTime::parse_from_rfc2822(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| SerdeError::expectation(format!("invalid http-date timestamp: {e}"))),
            TimestampFormat::EpochSeconds => {
                let seconds: f64 = value.parse().map_err(|e| {
                    SerdeError::expectation(format!("invalid epoch-seconds timestamp: {e}"))
                })?;
                self.deserialize_epoch_seconds(seconds)
            }
        }
    }

    /// Deserialize a timestamp from a numeric epoch-seconds value.
    pub fn deserialize_epoch_seconds(&self, seconds: f64) -> Result<Timestamp, SerdeError> {
        let millis = (seconds * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| SerdeError::expectation("epoch-seconds timestamp out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_time() -> Timestamp {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    #[test]
    fn typed_property_roundtrip() {
        const NAME: PropertyKey<String> = PropertyKey::new("name");
        let mut properties = TypedProperties::new();
        properties.insert(&NAME, "smithy".to_string());
        assert_eq!(properties.get(&NAME), Some(&"smithy".to_string()));
        properties.remove(&NAME);
        assert!(properties.get(&NAME).is_none());
    }

    #[test]
    fn clones_share_values() {
        const COUNT: PropertyKey<u32> = PropertyKey::new("count");
        let mut properties = TypedProperties::new();
        properties.insert(&COUNT, 7u32);
        let cloned = properties.clone();
        assert_eq!(cloned.get(&COUNT), Some(&7));
    }

    #[test]
    fn preserves_insertion_order() {
        const A: PropertyKey<u32> = PropertyKey::new("a");
        const B: PropertyKey<u32> = PropertyKey::new("b");
        const C: PropertyKey<u32> = PropertyKey::new("c");
        let mut properties = TypedProperties::new();
        properties.insert(&B, 1);
        properties.insert(&A, 2);
        properties.insert(&C, 3);
        let keys: Vec<&str> = properties.keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn date_time_format() {
        assert_eq!(
            TimestampFormat::DateTime.serialize(&example_time()),
            "2015-08-30T12:36:00Z"
        );
        let parsed = TimestampFormat::DateTime
            .deserialize("2015-08-30T12:36:00Z")
            .unwrap();
        assert_eq!(parsed, example_time());
    }

    #[test]
    fn http_date_format() {
        assert_eq!(
            TimestampFormat::HttpDate.serialize(&example_time()),
            "Sun, 30 Aug 2015 12:36:00 GMT"
        );
        let parsed = TimestampFormat::HttpDate
            .deserialize("Sun, 30 Aug 2015 12:36:00 GMT")
            .unwrap();
        assert_eq!(parsed, example_time());
    }

    #[test]
    fn epoch_seconds_format() {
        assert_eq!(
            TimestampFormat::EpochSeconds.serialize(&example_time()),
            "1440938160"
        );
        let parsed = TimestampFormat::EpochSeconds
            .deserialize("1440938160")
            .unwrap();
        assert_eq!(parsed, example_time());
    }
}
